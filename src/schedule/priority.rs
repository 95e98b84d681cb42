use std::collections::BTreeMap;

use chrono::{IsoWeek, NaiveDate};

use super::calendar::week_of;
use super::overrides::Resolution;
use super::targets::Targets;
use super::types::{Location, Phase};
use crate::roster::Person;

/// Day counts per location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Counts {
    primary: i32,
    secondary: i32,
    remote: i32,
    absent: i32,
}

impl Counts {
    fn get(&self, location: Location) -> i32 {
        match location {
            Location::Primary => self.primary,
            Location::Secondary => self.secondary,
            Location::Remote => self.remote,
            Location::Absent => self.absent,
        }
    }

    fn add(&mut self, location: Location, delta: i32) {
        let slot = match location {
            Location::Primary => &mut self.primary,
            Location::Secondary => &mut self.secondary,
            Location::Remote => &mut self.remote,
            Location::Absent => &mut self.absent,
        };
        *slot += delta;
    }
}

/// Running deficit counters of one generation run.
///
/// Tracks days so far per person and location, for the whole month and per
/// week. Lives only as long as the run.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    month: BTreeMap<String, Counts>,
    weekly: BTreeMap<(String, IsoWeek), Counts>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters seeded with every cell fixed by the override phases.
    pub fn seeded(resolution: &Resolution) -> Self {
        let mut tally = Self::new();
        for phase in [Phase::Absence, Phase::AllHands, Phase::Pin] {
            for (day, person_id, location) in resolution.cells_from(phase) {
                tally.record(person_id, day, location);
            }
        }
        tally
    }

    pub fn record(&mut self, person_id: &str, day: NaiveDate, location: Location) {
        self.bump(person_id, day, location, 1);
    }

    /// Rolls back a previous [`record`](Self::record).
    pub fn unrecord(&mut self, person_id: &str, day: NaiveDate, location: Location) {
        self.bump(person_id, day, location, -1);
    }

    fn bump(&mut self, person_id: &str, day: NaiveDate, location: Location, delta: i32) {
        self.month
            .entry(person_id.to_string())
            .or_default()
            .add(location, delta);
        self.weekly
            .entry((person_id.to_string(), week_of(day)))
            .or_default()
            .add(location, delta);
    }

    /// Days so far at `location` this month.
    pub fn actual(&self, person_id: &str, location: Location) -> i32 {
        self.month
            .get(person_id)
            .map(|c| c.get(location))
            .unwrap_or(0)
    }

    /// Days so far at `location` in the week containing `day`.
    pub fn week_count(&self, person_id: &str, day: NaiveDate, location: Location) -> i32 {
        self.weekly
            .get(&(person_id.to_string(), week_of(day)))
            .map(|c| c.get(location))
            .unwrap_or(0)
    }
}

/// Urgency of placing `person` at `location` on `day`.
///
/// `2 * (target - actual) + share / 100`, plus a boost while a weekly
/// minimum is unmet. `None` when a rule makes the location ineligible.
pub fn priority(
    person: &Person,
    targets: &Targets,
    tally: &Tally,
    location: Location,
    day: NaiveDate,
) -> Option<f64> {
    if location == Location::Absent || person.forbids(location) {
        return None;
    }

    let this_week = tally.week_count(&person.id, day, location);
    if let Some(max) = person.weekly_max(location) {
        if this_week >= max as i32 {
            return None;
        }
    }

    let deficit = targets.get(location) - tally.actual(&person.id, location);
    let mut score = 2.0 * f64::from(deficit) + f64::from(person.shares.get(location)) / 100.0;

    if let Some(min) = person.weekly_min(location) {
        let missing = min as i32 - this_week;
        if missing > 0 {
            score += 2.0 * f64::from(missing);
        }
    }
    Some(score)
}

/// Eligible candidates ordered by descending priority for `location`.
///
/// The sort is stable, so equal scores keep roster order.
pub fn rank<'p>(
    candidates: &[&'p Person],
    targets: &BTreeMap<String, Targets>,
    tally: &Tally,
    location: Location,
    day: NaiveDate,
) -> Vec<(&'p Person, f64)> {
    let mut ranked: Vec<(&'p Person, f64)> = candidates
        .iter()
        .filter_map(|person| {
            let person_targets = targets.get(&person.id).copied().unwrap_or_default();
            priority(person, &person_targets, tally, location, day).map(|score| (*person, score))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}
