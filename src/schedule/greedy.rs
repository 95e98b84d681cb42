use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::calendar::business_days;
use super::overrides::{resolve, Overrides, Resolution};
use super::priority::{priority, rank, Tally};
use super::targets::{allocate_targets, Targets};
use super::types::{AssignmentTable, Location};
use crate::roster::{Person, Roster};

/// Output of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub business_days: Vec<NaiveDate>,
    pub table: AssignmentTable,
    pub targets: BTreeMap<String, Targets>,
}

/// Builds the assignment table for the month containing `month`.
///
/// Never fails: every (business day, active person) cell gets a tag.
/// The same inputs always give the same table.
pub fn generate(roster: &Roster, month: NaiveDate, overrides: &Overrides) -> Generation {
    let days = business_days(month);
    let active: Vec<&Person> = roster.active_people().collect();
    info!(
        month = %month.format("%Y-%m"),
        people = active.len(),
        business_days = days.len(),
        all_hands = overrides.all_hands.len(),
        "generating schedule"
    );

    let resolution = resolve(&days, roster, overrides);
    let targets = allocate_targets(&days, roster, overrides);
    let mut tally = Tally::seeded(&resolution);
    let mut table = resolution.to_table();

    let mut greedy_days = 0;
    for &day in &days {
        if resolution.is_day_settled(day, active.iter().map(|p| p.id.as_str())) {
            debug!(%day, "day fully set by overrides");
            continue;
        }
        let mut filler = DayFiller {
            day,
            roster,
            resolution: &resolution,
            targets: &targets,
            tally: &mut tally,
            table: &mut table,
        };
        filler.fill(&active);
        greedy_days += 1;
    }

    info!(cells = table.cell_count(), greedy_days, "schedule generated");
    Generation {
        business_days: days,
        table,
        targets,
    }
}

/// Greedy fill of the open cells of one day.
struct DayFiller<'a> {
    day: NaiveDate,
    roster: &'a Roster,
    resolution: &'a Resolution,
    targets: &'a BTreeMap<String, Targets>,
    tally: &'a mut Tally,
    table: &'a mut AssignmentTable,
}

impl<'a> DayFiller<'a> {
    fn fill(&mut self, active: &[&'a Person]) {
        let mut open: Vec<&Person> = active
            .iter()
            .filter(|p| self.resolution.get(self.day, &p.id).is_none())
            .copied()
            .collect();

        self.fill_primary(&mut open);
        self.route_rest(&open);
        self.correct_secondary();

        debug!(
            day = %self.day,
            primary = self.table.occupancy(self.day, Location::Primary),
            secondary = self.table.occupancy(self.day, Location::Secondary),
            remote = self.table.occupancy(self.day, Location::Remote),
            "day filled"
        );
    }

    /// Primary fill by descending priority, then the floor correction.
    fn fill_primary(&mut self, open: &mut Vec<&Person>) {
        let roster = self.roster;
        let sites = &roster.sites;
        let mut occupancy = self.table.occupancy(self.day, Location::Primary);

        let ranked = rank(open, self.targets, self.tally, Location::Primary, self.day);
        for (person, score) in ranked {
            if score <= 0.0 || !sites.primary_capacity.admits(occupancy) {
                break;
            }
            self.place(person, Location::Primary);
            occupancy += 1;
        }
        open.retain(|p| self.table.get(self.day, &p.id).is_none());

        if occupancy == 0 || occupancy >= sites.primary_floor {
            return;
        }

        // Top up a near-empty site, ignoring the positive-priority gate.
        let ranked = rank(open, self.targets, self.tally, Location::Primary, self.day);
        for (person, _) in ranked {
            if occupancy >= sites.primary_floor || !sites.primary_capacity.admits(occupancy) {
                break;
            }
            debug!(day = %self.day, person = %person.id, "floor correction");
            self.place(person, Location::Primary);
            occupancy += 1;
        }
        open.retain(|p| self.table.get(self.day, &p.id).is_none());
    }

    /// Sends everyone still open to the secondary site or to remote.
    ///
    /// People are visited by descending secondary priority so the seats go
    /// to those furthest behind; people who cannot go there come last.
    fn route_rest(&mut self, open: &[&'a Person]) {
        let capacity = self.roster.sites.secondary_capacity;
        let mut occupancy = self.table.occupancy(self.day, Location::Secondary);

        let mut order: Vec<&Person> = rank(open, self.targets, self.tally, Location::Secondary, self.day)
            .into_iter()
            .map(|(person, _)| person)
            .collect();
        for person in open {
            if !order.iter().any(|p| p.id == person.id) {
                order.push(*person);
            }
        }

        for person in order {
            let targets = self.targets.get(&person.id).copied().unwrap_or_default();
            let secondary = priority(person, &targets, self.tally, Location::Secondary, self.day);
            let remote = priority(person, &targets, self.tally, Location::Remote, self.day);

            let prefers_secondary = match (secondary, remote) {
                (Some(s), Some(r)) => s > r,
                (Some(_), None) => true,
                (None, _) => false,
            };

            if prefers_secondary && capacity.admits(occupancy) {
                self.place(person, Location::Secondary);
                occupancy += 1;
            } else {
                self.place(person, Location::Remote);
            }
        }
    }

    /// Moves greedy-placed people off a secondary site left below its floor.
    ///
    /// All-hands days are settled by the override phases and never get here.
    fn correct_secondary(&mut self) {
        let occupancy = self.table.occupancy(self.day, Location::Secondary);
        if occupancy == 0 || occupancy >= self.roster.sites.secondary_floor {
            return;
        }

        let movable: Vec<String> = self
            .table
            .day(self.day)
            .map(|row| {
                row.iter()
                    .filter(|(id, location)| {
                        **location == Location::Secondary
                            && self.resolution.get(self.day, id).is_none()
                    })
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default();

        for person_id in movable {
            debug!(day = %self.day, person = %person_id, "lone occupant moved to remote");
            self.tally.unrecord(&person_id, self.day, Location::Secondary);
            self.tally.record(&person_id, self.day, Location::Remote);
            self.table.set(self.day, &person_id, Location::Remote);
        }
    }

    fn place(&mut self, person: &Person, location: Location) {
        self.table.set(self.day, &person.id, location);
        self.tally.record(&person.id, self.day, location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{PersonRule, Shares, Sites};
    use crate::schedule::Capacity;
    use chrono::Weekday;

    fn nov(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
    }

    fn sites(primary: u32, secondary: u32) -> Sites {
        Sites {
            primary_capacity: Capacity::Limited(primary),
            secondary_capacity: Capacity::Limited(secondary),
            ..Sites::default()
        }
    }

    fn people(n: usize, shares: Shares) -> Vec<Person> {
        (0..n)
            .map(|i| Person::new(format!("p{i:02}"), format!("Person {i}"), shares))
            .collect()
    }

    #[test]
    fn every_active_cell_gets_exactly_one_tag() {
        let mut roster_people = people(8, Shares::new(40, 30, 30));
        roster_people.push(Person::new("gone", "Gone", Shares::new(100, 0, 0)).inactive());
        let roster = Roster::new(sites(5, 12), roster_people);

        let generation = generate(&roster, nov(1), &Overrides::new());

        assert_eq!(generation.business_days.len(), 21);
        for day in &generation.business_days {
            let row = generation.table.day(*day).unwrap();
            assert_eq!(row.len(), 8);
            assert!(!row.contains_key("gone"));
        }
    }

    #[test]
    fn primary_respects_capacity_and_floor() {
        let roster = Roster::new(sites(5, 12), people(12, Shares::new(50, 25, 25)));
        let generation = generate(&roster, nov(1), &Overrides::new());

        for day in &generation.business_days {
            let primary = generation.table.occupancy(*day, Location::Primary);
            assert!(primary == 0 || (3..=5).contains(&primary), "{day}: {primary}");
            let secondary = generation.table.occupancy(*day, Location::Secondary);
            assert!(secondary != 1, "{day}: lone secondary occupant");
        }
    }

    #[test]
    fn floor_correction_tops_up_a_single_occupant() {
        // only one person wants the primary site
        let mut roster_people = vec![Person::new("keen", "Keen", Shares::new(100, 0, 0))];
        roster_people.extend(people(4, Shares::new(0, 0, 100)));
        let roster = Roster::new(sites(5, 12), roster_people);

        let generation = generate(&roster, nov(1), &Overrides::new());
        let first = generation.business_days[0];

        assert_eq!(generation.table.get(first, "keen"), Some(Location::Primary));
        assert_eq!(generation.table.occupancy(first, Location::Primary), 3);
    }

    #[test]
    fn lone_secondary_occupant_goes_remote() {
        let mut roster_people = vec![Person::new("solo", "Solo", Shares::new(0, 100, 0))];
        roster_people.extend(people(3, Shares::new(0, 0, 100)));
        let roster = Roster::new(sites(5, 12), roster_people);

        let generation = generate(&roster, nov(1), &Overrides::new());
        for day in &generation.business_days {
            assert_eq!(generation.table.get(*day, "solo"), Some(Location::Remote));
        }
    }

    #[test]
    fn two_secondary_candidates_stay_together() {
        let mut roster_people = people(2, Shares::new(0, 100, 0));
        roster_people.extend(people(3, Shares::new(0, 0, 100)).into_iter().map(|mut p| {
            p.id = format!("r{}", p.id);
            p
        }));
        let roster = Roster::new(sites(5, 12), roster_people);

        let generation = generate(&roster, nov(1), &Overrides::new());
        let first = generation.business_days[0];
        assert_eq!(generation.table.occupancy(first, Location::Secondary), 2);
    }

    #[test]
    fn secondary_capacity_is_never_exceeded() {
        let roster = Roster::new(sites(5, 3), people(10, Shares::new(0, 100, 0)));
        let generation = generate(&roster, nov(1), &Overrides::new());
        for day in &generation.business_days {
            assert!(generation.table.occupancy(*day, Location::Secondary) <= 3);
        }
    }

    #[test]
    fn larger_deficit_wins_the_last_primary_slot() {
        // Capacity 3 and floor 3: the fourth candidate is left out.
        let site = Sites {
            primary_capacity: Capacity::Limited(3),
            ..Sites::default()
        };
        let roster = Roster::new(site, people(4, Shares::new(50, 0, 50)));
        // p00 and p03 are identical except p03 has more absences,
        // so a smaller target and a smaller deficit.
        let overrides = Overrides::new()
            .with_absence("p03", nov(25))
            .with_absence("p03", nov(26))
            .with_absence("p03", nov(27));

        let generation = generate(&roster, nov(1), &overrides);
        let first = generation.business_days[0];

        assert_eq!(generation.targets["p00"].primary, 11);
        assert_eq!(generation.targets["p03"].primary, 9);
        assert_eq!(generation.table.get(first, "p03"), Some(Location::Remote));
        for id in ["p00", "p01", "p02"] {
            assert_eq!(generation.table.get(first, id), Some(Location::Primary));
        }
    }

    #[test]
    fn all_hands_day_puts_everyone_on_the_primary_site() {
        let roster = Roster::new(sites(5, 12), people(12, Shares::new(30, 30, 40)));
        let days = business_days(nov(1));
        let third = days[2];
        let overrides = Overrides::new()
            .with_all_hands(third)
            .with_absence("p04", third);

        let generation = generate(&roster, nov(1), &overrides);

        assert_eq!(generation.table.occupancy(third, Location::Primary), 11);
        assert_eq!(generation.table.get(third, "p04"), Some(Location::Absent));
    }

    #[test]
    fn pinned_people_are_not_moved_by_corrections() {
        let pinned = Person::new("pin", "Pin", Shares::new(0, 0, 100)).with_rule(
            PersonRule::FixedWeekday {
                weekdays: vec![Weekday::Mon],
                location: Location::Secondary,
            },
        );
        let mut roster_people = vec![pinned];
        roster_people.extend(people(3, Shares::new(0, 0, 100)));
        let roster = Roster::new(sites(5, 12), roster_people);

        let generation = generate(&roster, nov(1), &Overrides::new());
        assert_eq!(generation.table.get(nov(4), "pin"), Some(Location::Secondary));
        assert_eq!(generation.table.get(nov(5), "pin"), Some(Location::Remote));
    }

    #[test]
    fn all_hands_day_overrides_a_secondary_pin() {
        let pinned = Person::new("pin", "Pin", Shares::new(0, 100, 0)).with_rule(
            PersonRule::FixedWeekday {
                weekdays: vec![Weekday::Tue],
                location: Location::Secondary,
            },
        );
        let mut roster_people = vec![pinned];
        roster_people.extend(people(3, Shares::new(0, 0, 100)));
        let roster = Roster::new(sites(5, 12), roster_people);

        // Tuesday 5th is all-hands, Tuesday 12th is not
        let overrides = Overrides::new().with_all_hands(nov(5));
        let generation = generate(&roster, nov(1), &overrides);

        assert_eq!(generation.table.get(nov(5), "pin"), Some(Location::Primary));
        assert_eq!(generation.table.occupancy(nov(5), Location::Primary), 4);
        assert_eq!(generation.table.occupancy(nov(5), Location::Secondary), 0);
        assert_eq!(generation.table.get(nov(12), "pin"), Some(Location::Secondary));
    }

    #[test]
    fn never_rule_keeps_people_off_a_site() {
        let mut roster_people = people(6, Shares::new(100, 0, 0));
        roster_people[0].rules.push(PersonRule::Never {
            location: Location::Primary,
        });
        let roster = Roster::new(sites(5, 12), roster_people);

        let generation = generate(&roster, nov(1), &Overrides::new());
        for day in &generation.business_days {
            assert_ne!(generation.table.get(*day, "p00"), Some(Location::Primary));
        }
    }

    #[test]
    fn weekly_max_caps_days_per_week() {
        let mut roster_people = people(4, Shares::new(100, 0, 0));
        roster_people[0].rules.push(PersonRule::WeeklyMax {
            location: Location::Primary,
            days: 2,
        });
        let roster = Roster::new(sites(5, 12), roster_people);

        let generation = generate(&roster, nov(1), &Overrides::new());
        // week of Mon 4 - Fri 8 November
        let week_days = (4..=8)
            .filter(|d| generation.table.get(nov(*d), "p00") == Some(Location::Primary))
            .count();
        assert!(week_days <= 2);
    }

    #[test]
    fn regeneration_is_deterministic() {
        let mut roster_people = people(9, Shares::new(45, 35, 20));
        roster_people[3].shares = Shares::new(80, 0, 20);
        let roster = Roster::new(sites(4, 6), roster_people);
        let overrides = Overrides::new()
            .with_all_hands(nov(14))
            .with_absence("p02", nov(6));

        let first = serde_json::to_string(&generate(&roster, nov(1), &overrides)).unwrap();
        let second = serde_json::to_string(&generate(&roster, nov(1), &overrides)).unwrap();
        assert_eq!(first, second);
    }
}
