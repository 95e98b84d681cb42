//! Override phases: absences, fixed-weekday pins and all-hands days.
//!
//! Each phase builds its own [`Overlay`]. [`Resolution::merge`] then combines
//! them by [`Phase`] order, first writer wins:
//!
//! absence > all-hands > pins > greedy fill
//!
//! so precedence never depends on the order the phases were computed in.
//! An all-hands day therefore settles every active person: absent or at the
//! primary site.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::calendar::{in_month, is_business_day};
use super::types::{AssignmentTable, Location, Overlay, Phase};
use crate::error::RequestError;
use crate::roster::Roster;

/// Month-specific overrides supplied with each generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    /// Days on which every active, non-absent person is at the primary site.
    #[serde(default)]
    pub all_hands: BTreeSet<NaiveDate>,
    /// Per-person absence days.
    #[serde(default)]
    pub absences: BTreeMap<String, BTreeSet<NaiveDate>>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_all_hands(mut self, day: NaiveDate) -> Self {
        self.all_hands.insert(day);
        self
    }

    pub fn with_absence(mut self, person_id: &str, day: NaiveDate) -> Self {
        self.absences
            .entry(person_id.to_string())
            .or_default()
            .insert(day);
        self
    }

    pub fn is_absent(&self, person_id: &str, day: NaiveDate) -> bool {
        self.absences
            .get(person_id)
            .is_some_and(|days| days.contains(&day))
    }

    /// Number of `person_id`'s absence days that are business days in `days`.
    pub fn absence_count(&self, person_id: &str, days: &[NaiveDate]) -> usize {
        match self.absences.get(person_id) {
            Some(absent) => days.iter().filter(|d| absent.contains(d)).count(),
            None => 0,
        }
    }

    /// Checks the overrides fit the month starting at `month` and the roster.
    pub fn validate(&self, roster: &Roster, month: NaiveDate) -> Result<(), RequestError> {
        let max = roster.sites.max_all_hands;
        if self.all_hands.len() > max {
            return Err(RequestError::TooManyAllHands {
                found: self.all_hands.len(),
                max,
            });
        }

        let month_anchor = month.with_day(1).unwrap_or(month);
        let outside = |date: &&NaiveDate| !in_month(**date, month);

        if let Some(date) = self.all_hands.iter().find(outside) {
            return Err(RequestError::OutsideMonth {
                date: *date,
                month: month_anchor,
            });
        }

        for (person_id, days) in &self.absences {
            if roster.find(person_id).is_none() {
                return Err(RequestError::UnknownPerson(person_id.clone()));
            }
            if let Some(date) = days.iter().find(outside) {
                return Err(RequestError::OutsideMonth {
                    date: *date,
                    month: month_anchor,
                });
            }
        }
        Ok(())
    }
}

/// Absence phase: the absence marker on every listed business day.
pub fn absence_overlay(days: &[NaiveDate], roster: &Roster, overrides: &Overrides) -> Overlay {
    let mut overlay = Overlay::new(Phase::Absence);
    for person in roster.active_people() {
        for &day in days {
            if overrides.is_absent(&person.id, day) {
                overlay.insert(day, &person.id, Location::Absent);
            }
        }
    }
    overlay
}

/// Pin phase: fixed-weekday rules.
pub fn pin_overlay(days: &[NaiveDate], roster: &Roster) -> Overlay {
    let mut overlay = Overlay::new(Phase::Pin);
    for person in roster.active_people() {
        for &day in days {
            if let Some(location) = person.pinned_location(day.weekday()) {
                overlay.insert(day, &person.id, location);
            }
        }
    }
    overlay
}

/// All-hands phase: everybody active at the primary site.
///
/// Weekend dates are ignored.
pub fn all_hands_overlay(days: &[NaiveDate], roster: &Roster, overrides: &Overrides) -> Overlay {
    let mut overlay = Overlay::new(Phase::AllHands);
    for &day in overrides
        .all_hands
        .iter()
        .filter(|d| is_business_day(**d) && days.contains(d))
    {
        for person in roster.active_people() {
            overlay.insert(day, &person.id, Location::Primary);
        }
    }
    overlay
}

/// Partial table produced by the override phases, with the phase behind each cell.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    cells: BTreeMap<NaiveDate, BTreeMap<String, (Location, Phase)>>,
}

impl Resolution {
    /// Merges overlays by phase precedence. Earlier phases are never overwritten.
    pub fn merge(mut overlays: Vec<Overlay>) -> Self {
        overlays.sort_by_key(|o| o.phase);

        let mut cells: BTreeMap<NaiveDate, BTreeMap<String, (Location, Phase)>> = BTreeMap::new();
        for overlay in overlays {
            for ((day, person_id), location) in overlay.cells {
                cells
                    .entry(day)
                    .or_default()
                    .entry(person_id)
                    .or_insert((location, overlay.phase));
            }
        }
        Self { cells }
    }

    pub fn get(&self, day: NaiveDate, person_id: &str) -> Option<(Location, Phase)> {
        self.cells.get(&day).and_then(|row| row.get(person_id)).copied()
    }

    /// Cells that ended up owned by `phase`.
    pub fn cells_from(&self, phase: Phase) -> impl Iterator<Item = (NaiveDate, &str, Location)> {
        self.cells.iter().flat_map(move |(day, row)| {
            row.iter()
                .filter(move |(_, (_, p))| *p == phase)
                .map(move |(person_id, (location, _))| (*day, person_id.as_str(), *location))
        })
    }

    /// Whether every person in `person_ids` already has a cell on `day`.
    pub fn is_day_settled<'a>(
        &self,
        day: NaiveDate,
        mut person_ids: impl Iterator<Item = &'a str>,
    ) -> bool {
        match self.cells.get(&day) {
            Some(row) => person_ids.all(|id| row.contains_key(id)),
            None => false,
        }
    }

    /// Copies the resolved cells into a fresh table.
    pub fn to_table(&self) -> AssignmentTable {
        let mut table = AssignmentTable::new();
        for (day, row) in &self.cells {
            for (person_id, (location, _)) in row {
                table.set(*day, person_id, *location);
            }
        }
        table
    }
}

/// Runs the three override phases and merges them.
pub fn resolve(days: &[NaiveDate], roster: &Roster, overrides: &Overrides) -> Resolution {
    Resolution::merge(vec![
        all_hands_overlay(days, roster, overrides),
        pin_overlay(days, roster),
        absence_overlay(days, roster, overrides),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{Person, PersonRule, Shares, Sites};
    use crate::schedule::calendar::business_days;
    use chrono::Weekday;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
    }

    fn roster() -> Roster {
        Roster::new(
            Sites::default(),
            vec![
                Person::new("ann", "Ann", Shares::new(40, 30, 30)),
                Person::new("ben", "Ben", Shares::new(40, 30, 30)).with_rule(
                    PersonRule::FixedWeekday {
                        weekdays: vec![Weekday::Tue],
                        location: Location::Remote,
                    },
                ),
                Person::new("cat", "Cat", Shares::new(40, 30, 30)).inactive(),
            ],
        )
    }

    #[test]
    fn absence_beats_pins_and_all_hands() {
        let days = business_days(date(1));
        // Tuesday 5th
        let overrides = Overrides::new()
            .with_all_hands(date(5))
            .with_absence("ben", date(5))
            .with_absence("ann", date(12));

        let resolution = resolve(&days, &roster(), &overrides);

        assert_eq!(resolution.get(date(5), "ben"), Some((Location::Absent, Phase::Absence)));
        assert_eq!(resolution.get(date(5), "ann"), Some((Location::Primary, Phase::AllHands)));
        // pin on a plain Tuesday, absence on ann's
        assert_eq!(resolution.get(date(12), "ben"), Some((Location::Remote, Phase::Pin)));
        assert_eq!(resolution.get(date(12), "ann"), Some((Location::Absent, Phase::Absence)));
        assert_eq!(resolution.get(date(13), "ann"), None);
    }

    #[test]
    fn all_hands_beats_pins() {
        let days = business_days(date(1));
        let overrides = Overrides::new().with_all_hands(date(19));
        let resolution = resolve(&days, &roster(), &overrides);

        // ben is pinned remote on Tuesdays
        assert_eq!(resolution.get(date(19), "ben"), Some((Location::Primary, Phase::AllHands)));
        assert_eq!(resolution.get(date(26), "ben"), Some((Location::Remote, Phase::Pin)));
        assert!(resolution.is_day_settled(date(19), ["ann", "ben"].into_iter()));
        assert!(!resolution.is_day_settled(date(20), ["ann", "ben"].into_iter()));
    }

    #[test]
    fn merge_order_does_not_depend_on_input_order() {
        let days = business_days(date(1));
        let roster = roster();
        let overrides = Overrides::new()
            .with_all_hands(date(5))
            .with_absence("ann", date(5));

        let forward = Resolution::merge(vec![
            absence_overlay(&days, &roster, &overrides),
            pin_overlay(&days, &roster),
            all_hands_overlay(&days, &roster, &overrides),
        ]);
        let backward = resolve(&days, &roster, &overrides);

        assert_eq!(forward.to_table(), backward.to_table());
        assert_eq!(forward.get(date(5), "ann"), Some((Location::Absent, Phase::Absence)));
    }

    #[test]
    fn inactive_people_get_no_cells() {
        let days = business_days(date(1));
        let overrides = Overrides::new()
            .with_all_hands(date(5))
            .with_absence("cat", date(6));
        let resolution = resolve(&days, &roster(), &overrides);

        assert_eq!(resolution.get(date(5), "cat"), None);
        assert_eq!(resolution.get(date(6), "cat"), None);
    }

    #[test]
    fn weekend_all_hands_is_ignored() {
        let days = business_days(date(1));
        let overrides = Overrides::new().with_all_hands(date(9));
        let resolution = resolve(&days, &roster(), &overrides);
        assert_eq!(resolution.cells_from(Phase::AllHands).count(), 0);
    }

    #[test]
    fn validate_rejects_bad_requests() {
        let roster = roster();
        let month = date(1);

        let too_many = Overrides::new()
            .with_all_hands(date(4))
            .with_all_hands(date(5))
            .with_all_hands(date(6));
        assert_eq!(
            too_many.validate(&roster, month),
            Err(RequestError::TooManyAllHands { found: 3, max: 2 })
        );

        let outside = Overrides::new().with_all_hands(NaiveDate::from_ymd_opt(2024, 12, 2).unwrap());
        assert!(matches!(
            outside.validate(&roster, month),
            Err(RequestError::OutsideMonth { .. })
        ));

        let stranger = Overrides::new().with_absence("zed", date(4));
        assert_eq!(
            stranger.validate(&roster, month),
            Err(RequestError::UnknownPerson("zed".to_string()))
        );

        let fine = Overrides::new()
            .with_all_hands(date(5))
            .with_absence("ann", date(6));
        assert_eq!(fine.validate(&roster, month), Ok(()));
    }

    #[test]
    fn absence_count_only_counts_business_days() {
        let days = business_days(date(1));
        let overrides = Overrides::new()
            .with_absence("ann", date(4))
            .with_absence("ann", date(9)) // Saturday
            .with_absence("ann", date(11));
        assert_eq!(overrides.absence_count("ann", &days), 2);
        assert_eq!(overrides.absence_count("ben", &days), 0);
    }
}
