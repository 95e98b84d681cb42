use std::collections::BTreeSet;
use std::io;

use chrono::NaiveDate;
use csv::WriterBuilder;

use crate::roster::Roster;
use crate::schedule::{AssignmentTable, Location};

/// First cell of the header row.
pub const HEADER_CELL: &str = "Person";

/// Heading of the optional trailing section listing all-hands dates.
pub const ALL_HANDS_HEADING: &str = "All-hands days";

/// How absences are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportVariant {
    /// Absences are written with the remote label.
    #[default]
    Standard,
    /// Absences get their own label.
    WithAbsence,
}

/// Column label of a business day, e.g. "Mon 04/11".
pub fn day_label(day: NaiveDate) -> String {
    day.format("%a %d/%m").to_string()
}

/// Full text form of a date, e.g. "Tuesday 5 November 2024".
pub fn full_date(day: NaiveDate) -> String {
    day.format("%A %-d %B %Y").to_string()
}

fn cell_label(roster: &Roster, location: Location, variant: ExportVariant) -> &str {
    match (location, variant) {
        (Location::Absent, ExportVariant::Standard) => roster.labels.label(Location::Remote),
        (location, _) => roster.labels.label(location),
    }
}

/// Writes the table as text: a header row, one row per active person, and
/// the all-hands dates at the end when there are any.
///
/// # Arguments
/// * `roster` - Supplies the people (in roster order) and the location labels
/// * `business_days` - Column order
/// * `table` - The assignments to write
/// * `all_hands` - Dates for the trailing section
/// * `variant` - Whether absences keep their own label
pub fn export_text(
    roster: &Roster,
    business_days: &[NaiveDate],
    table: &AssignmentTable,
    all_hands: &BTreeSet<NaiveDate>,
    variant: ExportVariant,
) -> Result<String, csv::Error> {
    let mut wtr = WriterBuilder::new().flexible(true).from_writer(Vec::new());

    let mut header = vec![HEADER_CELL.to_string()];
    header.extend(business_days.iter().map(|d| day_label(*d)));
    wtr.write_record(&header)?;

    for person in roster.active_people() {
        let mut row = vec![person.name.clone()];
        for day in business_days {
            // Cells missing from the table (never the case after generation) stay empty
            let label = table
                .get(*day, &person.id)
                .map(|location| cell_label(roster, location, variant))
                .unwrap_or("");
            row.push(label.to_string());
        }
        wtr.write_record(&row)?;
    }

    if !all_hands.is_empty() {
        wtr.write_record([""])?;
        wtr.write_record([ALL_HANDS_HEADING])?;
        for day in all_hands {
            wtr.write_record([full_date(*day)])?;
        }
    }

    wtr.flush()?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
}
