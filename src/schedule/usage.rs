//! Read-only occupancy tallies over an assignment table.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::targets::Targets;
use super::types::{AssignmentTable, Location};
use crate::roster::Roster;

/// Number of people per location tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub primary: usize,
    pub secondary: usize,
    pub remote: usize,
    pub absent: usize,
}

impl Usage {
    pub fn get(&self, location: Location) -> usize {
        match location {
            Location::Primary => self.primary,
            Location::Secondary => self.secondary,
            Location::Remote => self.remote,
            Location::Absent => self.absent,
        }
    }

    pub fn total(&self) -> usize {
        self.primary + self.secondary + self.remote + self.absent
    }

    fn count(&mut self, location: Location) {
        match location {
            Location::Primary => self.primary += 1,
            Location::Secondary => self.secondary += 1,
            Location::Remote => self.remote += 1,
            Location::Absent => self.absent += 1,
        }
    }
}

impl<'a> FromIterator<&'a Location> for Usage {
    fn from_iter<I: IntoIterator<Item = &'a Location>>(iter: I) -> Self {
        let mut usage = Usage::default();
        for location in iter {
            usage.count(*location);
        }
        usage
    }
}

/// Occupancy of each location on `day`. Empty for unknown days.
pub fn usage_for_day(table: &AssignmentTable, day: NaiveDate) -> Usage {
    table
        .day(day)
        .map(|row| row.values().collect())
        .unwrap_or_default()
}

/// Days spent at each location by one person over the whole table.
pub fn usage_for_person(table: &AssignmentTable, person_id: &str) -> Usage {
    table
        .days()
        .filter_map(|(_, row)| row.get(person_id))
        .collect()
}

/// One [`Usage`] per day, in the order of `days`.
pub fn daily_usage(table: &AssignmentTable, days: &[NaiveDate]) -> Vec<(NaiveDate, Usage)> {
    days.iter()
        .map(|day| (*day, usage_for_day(table, *day)))
        .collect()
}

/// Targets against actual days for one person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub id: String,
    pub name: String,
    pub targets: Targets,
    pub actual: Usage,
}

/// Fairness summary for every active person, in roster order.
pub fn summarize(
    roster: &Roster,
    table: &AssignmentTable,
    targets: &BTreeMap<String, Targets>,
) -> Vec<PersonSummary> {
    roster
        .active_people()
        .map(|person| PersonSummary {
            id: person.id.clone(),
            name: person.name.clone(),
            targets: targets.get(&person.id).copied().unwrap_or_default(),
            actual: usage_for_person(table, &person.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{Person, Shares, Sites};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
    }

    fn table() -> AssignmentTable {
        let mut table = AssignmentTable::new();
        table.set(date(4), "a", Location::Primary);
        table.set(date(4), "b", Location::Primary);
        table.set(date(4), "c", Location::Absent);
        table.set(date(5), "a", Location::Remote);
        table.set(date(5), "b", Location::Secondary);
        table.set(date(5), "c", Location::Secondary);
        table
    }

    #[test]
    fn counts_every_tag_for_a_day() {
        let usage = usage_for_day(&table(), date(4));
        assert_eq!(usage.get(Location::Primary), 2);
        assert_eq!(usage.get(Location::Absent), 1);
        assert_eq!(usage.get(Location::Secondary), 0);
        assert_eq!(usage.total(), 3);
    }

    #[test]
    fn unknown_day_is_empty() {
        assert_eq!(usage_for_day(&table(), date(6)), Usage::default());
    }

    #[test]
    fn person_usage_spans_the_month() {
        let usage = usage_for_person(&table(), "c");
        assert_eq!(usage.absent, 1);
        assert_eq!(usage.secondary, 1);
        assert_eq!(usage.total(), 2);
    }

    #[test]
    fn daily_usage_follows_day_order() {
        let usage = daily_usage(&table(), &[date(5), date(4)]);
        assert_eq!(usage[0].0, date(5));
        assert_eq!(usage[0].1.secondary, 2);
        assert_eq!(usage[1].1.primary, 2);
    }

    #[test]
    fn summary_lists_active_people_in_roster_order() {
        let roster = Roster::new(
            Sites::default(),
            vec![
                Person::new("b", "Bea", Shares::new(50, 50, 0)),
                Person::new("a", "Al", Shares::new(50, 50, 0)),
                Person::new("c", "Cy", Shares::new(50, 50, 0)).inactive(),
            ],
        );
        let summary = summarize(&roster, &table(), &BTreeMap::new());
        let ids: Vec<&str> = summary.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(summary[0].actual.primary, 1);
        assert_eq!(summary[0].actual.secondary, 1);
    }
}
