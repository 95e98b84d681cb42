use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::overrides::Overrides;
use super::types::Location;
use crate::roster::{Roster, Shares};

/// Monthly target day-counts of one person.
///
/// Remote is the residual of the two rounded on-site targets. It is not
/// clamped, so it goes negative when the rounded targets overshoot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Targets {
    pub availability: i32,
    pub primary: i32,
    pub secondary: i32,
    pub remote: i32,
}

impl Targets {
    pub fn get(&self, location: Location) -> i32 {
        match location {
            Location::Primary => self.primary,
            Location::Secondary => self.secondary,
            Location::Remote => self.remote,
            Location::Absent => 0,
        }
    }
}

fn share_of(share: i32, availability: i32) -> i32 {
    (f64::from(share) / 100.0 * f64::from(availability)).round() as i32
}

/// Converts percentage shares into day targets for `availability` days.
pub fn allocate(shares: &Shares, availability: i32) -> Targets {
    let primary = share_of(shares.primary, availability);
    let secondary = share_of(shares.secondary, availability);
    Targets {
        availability,
        primary,
        secondary,
        remote: availability - primary - secondary,
    }
}

/// Targets of every active person, keyed by person id.
///
/// Availability is the number of business days minus the person's absences.
pub fn allocate_targets(
    days: &[NaiveDate],
    roster: &Roster,
    overrides: &Overrides,
) -> BTreeMap<String, Targets> {
    roster
        .active_people()
        .map(|person| {
            let absent = overrides.absence_count(&person.id, days);
            let availability = days.len().saturating_sub(absent) as i32;
            (person.id.clone(), allocate(&person.shares, availability))
        })
        .collect()
}
