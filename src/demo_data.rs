//! Seeded random rosters and overrides for demos and tests.

use chrono::{NaiveDate, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::roster::{Person, PersonRule, Roster, Shares, Sites};
use crate::schedule::{business_days, Location, Overrides};

/// Chance that a person is pinned to the primary site on one weekday.
const PIN_PROBABILITY: f64 = 0.15;
/// Chance that a person never goes to the secondary site.
const NEVER_SECONDARY_PROBABILITY: f64 = 0.1;
/// Chance that a person has some absence days in the month.
const ABSENCE_PROBABILITY: f64 = 0.3;

const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Generates a roster of `count` people with the default sites.
///
/// Shares are multiples of ten summing to 100. The same seed always gives
/// the same roster.
pub fn generate_roster(count: usize, seed: u64) -> Roster {
    let mut rng = StdRng::seed_from_u64(seed);
    let names = generate_names(&mut rng, count);

    let mut people = Vec::with_capacity(count);
    for (i, name) in names.into_iter().enumerate() {
        let mut person = Person::new(format!("p{:02}", i + 1), name, random_shares(&mut rng));

        if rng.gen_bool(PIN_PROBABILITY) {
            if let Some(weekday) = WEEKDAYS.choose(&mut rng) {
                person = person.with_rule(PersonRule::FixedWeekday {
                    weekdays: vec![*weekday],
                    location: Location::Primary,
                });
            }
        }
        if rng.gen_bool(NEVER_SECONDARY_PROBABILITY) {
            person = person.with_rule(PersonRule::Never {
                location: Location::Secondary,
            });
        }
        people.push(person);
    }

    Roster::new(Sites::default(), people)
}

/// Picks one all-hands day and a few absences for the month containing `month`.
pub fn generate_overrides(roster: &Roster, month: NaiveDate, seed: u64) -> Overrides {
    let mut rng = StdRng::seed_from_u64(seed);
    let days = business_days(month);
    let mut overrides = Overrides::new();

    if roster.sites.max_all_hands > 0 {
        if let Some(day) = days.choose(&mut rng) {
            overrides = overrides.with_all_hands(*day);
        }
    }

    for person in roster.active_people() {
        if !rng.gen_bool(ABSENCE_PROBABILITY) {
            continue;
        }
        let count = rng.gen_range(1..=3).min(days.len());
        for day in days.choose_multiple(&mut rng, count) {
            overrides = overrides.with_absence(&person.id, *day);
        }
    }
    overrides
}

fn random_shares(rng: &mut StdRng) -> Shares {
    let primary = rng.gen_range(0..=10) * 10;
    let secondary = rng.gen_range(0..=(100 - primary) / 10) * 10;
    Shares::new(primary, secondary, 100 - primary - secondary)
}

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Chloé", "David", "Emma", "Farid", "Gaëlle", "Hugo", "Inès", "Julien",
];
const LAST_NAMES: &[&str] = &[
    "Bernard", "Dubois", "Durand", "Girard", "Lambert", "Leroy", "Martin", "Moreau", "Petit",
    "Roux",
];

/// Distinct display names; past FIRST × LAST a number is appended.
fn generate_names(rng: &mut StdRng, count: usize) -> Vec<String> {
    let mut pool = Vec::with_capacity(FIRST_NAMES.len() * LAST_NAMES.len());
    for first in FIRST_NAMES {
        for last in LAST_NAMES {
            pool.push(format!("{} {}", first, last));
        }
    }
    pool.shuffle(rng);

    (0..count)
        .map(|i| {
            let name = &pool[i % pool.len()];
            match i / pool.len() {
                0 => name.clone(),
                round => format!("{} {}", name, round + 1),
            }
        })
        .collect()
}
