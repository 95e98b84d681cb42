use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::roster::{Person, Roster};
use crate::schedule::{daily_usage, AssignmentTable, Capacity, Location, PersonSummary};
use crate::textfile::day_label;

const NAME_WIDTH: usize = 20;

/// One-letter code of a location in the console grid.
pub fn location_code(location: Location) -> char {
    match location {
        Location::Primary => 'P',
        Location::Secondary => 'S',
        Location::Remote => 'R',
        Location::Absent => '-',
    }
}

/// Cuts or pads a display name to the width of the name column.
pub fn format_person_name(name: &str) -> String {
    let short: String = name.chars().take(NAME_WIDTH).collect();
    format!("{:<width$}", short, width = NAME_WIDTH)
}

/// One grid row: the name, then a code per day. Missing cells show `?`.
pub fn format_row(person: &Person, days: &[NaiveDate], table: &AssignmentTable) -> String {
    let mut row = format_person_name(&person.name);
    for day in days {
        let code = table.get(*day, &person.id).map(location_code).unwrap_or('?');
        row.push_str(&format!("  {}", code));
    }
    row
}

fn over_capacity(capacity: Capacity, occupancy: usize) -> bool {
    match capacity {
        Capacity::Limited(max) => occupancy > max as usize,
        Capacity::Unbounded => false,
    }
}

/// Prints the month as a grid, one row per active person.
pub fn print_schedule(
    title: &str,
    roster: &Roster,
    days: &[NaiveDate],
    table: &AssignmentTable,
    all_hands: &BTreeSet<NaiveDate>,
) {
    println!("\n=== {} ===", title);

    let mut header = format_person_name("");
    for day in days {
        header.push_str(&format!("{:>3}", day.day()));
    }
    println!("{}", header);

    // Mark all-hands columns under the day numbers
    if !all_hands.is_empty() {
        let mut marks = format_person_name("");
        for day in days {
            marks.push_str(if all_hands.contains(day) { "  *" } else { "   " });
        }
        println!("{}", marks.trim_end());
    }

    for person in roster.active_people() {
        println!("{}", format_row(person, days, table));
    }

    println!(
        "\nP = {}, S = {}, R = {}, - = {}{}",
        roster.labels.primary,
        roster.labels.secondary,
        roster.labels.remote,
        roster.labels.absent,
        if all_hands.is_empty() { "" } else { ", * = all-hands day" }
    );
}

/// Prints how many people are at each location on every day.
pub fn print_daily_usage(roster: &Roster, days: &[NaiveDate], table: &AssignmentTable) {
    println!("\n=== Daily usage ===");
    println!(
        "{:<10} {:>8} {:>8} {:>8} {:>8}",
        "Day",
        roster.labels.primary,
        roster.labels.secondary,
        roster.labels.remote,
        roster.labels.absent
    );

    for (day, usage) in daily_usage(table, days) {
        let mut line = format!(
            "{:<10} {:>8} {:>8} {:>8} {:>8}",
            day_label(day),
            usage.primary,
            usage.secondary,
            usage.remote,
            usage.absent
        );
        if over_capacity(roster.sites.capacity(Location::Primary), usage.primary)
            || over_capacity(roster.sites.capacity(Location::Secondary), usage.secondary)
        {
            line.push_str("  ⚠️  over capacity");
        }
        println!("{}", line);
    }
}

/// Prints actual against target days for every person.
pub fn print_summary(roster: &Roster, summaries: &[PersonSummary]) {
    println!("\n=== Targets vs actual (actual/target) ===");
    println!(
        "{} {:>6} {:>8} {:>8} {:>8} {:>6}",
        format_person_name("Person"),
        "Avail",
        roster.labels.primary,
        roster.labels.secondary,
        roster.labels.remote,
        roster.labels.absent
    );

    for summary in summaries {
        let cell = |location: Location| {
            format!("{}/{}", summary.actual.get(location), summary.targets.get(location))
        };
        println!(
            "{} {:>6} {:>8} {:>8} {:>8} {:>6}",
            format_person_name(&summary.name),
            summary.targets.availability,
            cell(Location::Primary),
            cell(Location::Secondary),
            cell(Location::Remote),
            summary.actual.absent
        );
    }
}
