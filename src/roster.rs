use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RosterError;
use crate::schedule::{Capacity, Location};

/// Preferred share (percent) of available days per location.
///
/// Conventionally sums to 100 but nothing enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Shares {
    #[serde(default)]
    pub primary: i32,
    #[serde(default)]
    pub secondary: i32,
    #[serde(default)]
    pub remote: i32,
}

impl Shares {
    pub fn new(primary: i32, secondary: i32, remote: i32) -> Self {
        Self {
            primary,
            secondary,
            remote,
        }
    }

    pub fn get(&self, location: Location) -> i32 {
        match location {
            Location::Primary => self.primary,
            Location::Secondary => self.secondary,
            Location::Remote => self.remote,
            Location::Absent => 0,
        }
    }
}

/// Declarative per-person rule, evaluated the same way for everybody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersonRule {
    /// At `location` on the given weekdays, unless absent or on an all-hands day.
    FixedWeekday {
        weekdays: Vec<Weekday>,
        location: Location,
    },
    /// Never assigned to `location` by the greedy fill.
    Never { location: Location },
    /// At least `days` days per week at `location`; boosts priority until met.
    WeeklyMin { location: Location, days: u32 },
    /// At most `days` days per week at `location`.
    WeeklyMax { location: Location, days: u32 },
}

impl PersonRule {
    fn location(&self) -> Location {
        match self {
            PersonRule::FixedWeekday { location, .. }
            | PersonRule::Never { location }
            | PersonRule::WeeklyMin { location, .. }
            | PersonRule::WeeklyMax { location, .. } => *location,
        }
    }
}

/// A member of the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub shares: Shares,
    #[serde(default)]
    pub rules: Vec<PersonRule>,
}

fn default_active() -> bool {
    true
}

impl Person {
    pub fn new(id: impl Into<String>, name: impl Into<String>, shares: Shares) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active: true,
            shares,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: PersonRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Location this person is pinned to on `weekday`, first matching rule wins.
    pub fn pinned_location(&self, weekday: Weekday) -> Option<Location> {
        self.rules.iter().find_map(|rule| match rule {
            PersonRule::FixedWeekday { weekdays, location } if weekdays.contains(&weekday) => {
                Some(*location)
            }
            _ => None,
        })
    }

    /// Whether a `never` rule excludes `location`.
    pub fn forbids(&self, location: Location) -> bool {
        self.rules
            .iter()
            .any(|rule| matches!(rule, PersonRule::Never { location: l } if *l == location))
    }

    /// Tightest weekly maximum at `location`, if any.
    pub fn weekly_max(&self, location: Location) -> Option<u32> {
        self.rules
            .iter()
            .filter_map(|rule| match rule {
                PersonRule::WeeklyMax { location: l, days } if *l == location => Some(*days),
                _ => None,
            })
            .min()
    }

    /// Strictest weekly minimum at `location`, if any.
    pub fn weekly_min(&self, location: Location) -> Option<u32> {
        self.rules
            .iter()
            .filter_map(|rule| match rule {
                PersonRule::WeeklyMin { location: l, days } if *l == location => Some(*days),
                _ => None,
            })
            .max()
    }
}

/// Capacities and occupancy floors of the on-site locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sites {
    pub primary_capacity: Capacity,
    pub secondary_capacity: Capacity,
    /// Minimum primary occupancy once anybody is there.
    pub primary_floor: usize,
    /// Minimum secondary occupancy once anybody is there.
    pub secondary_floor: usize,
    pub max_all_hands: usize,
}

impl Default for Sites {
    fn default() -> Self {
        Self {
            primary_capacity: Capacity::Limited(5),
            secondary_capacity: Capacity::Limited(12),
            primary_floor: 3,
            secondary_floor: 2,
            max_all_hands: 2,
        }
    }
}

impl Sites {
    /// Capacity of an on-site location; `Remote` and `Absent` are unbounded.
    pub fn capacity(&self, location: Location) -> Capacity {
        match location {
            Location::Primary => self.primary_capacity,
            Location::Secondary => self.secondary_capacity,
            Location::Remote | Location::Absent => Capacity::Unbounded,
        }
    }
}

/// Human-readable labels used by the text export and import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub primary: String,
    pub secondary: String,
    pub remote: String,
    pub absent: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            primary: "Issy".to_string(),
            secondary: "Annex".to_string(),
            remote: "Remote".to_string(),
            absent: "Absent".to_string(),
        }
    }
}

impl Labels {
    pub fn label(&self, location: Location) -> &str {
        match location {
            Location::Primary => &self.primary,
            Location::Secondary => &self.secondary,
            Location::Remote => &self.remote,
            Location::Absent => &self.absent,
        }
    }

    /// Maps a label back to a location. Anything unrecognised is remote.
    pub fn location_for(&self, label: &str) -> Location {
        let label = label.trim();
        if label.eq_ignore_ascii_case(self.primary.trim()) {
            Location::Primary
        } else if label.eq_ignore_ascii_case(self.secondary.trim()) {
            Location::Secondary
        } else {
            Location::Remote
        }
    }
}

/// The static roster configuration: sites, labels and people in roster order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub sites: Sites,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub people: Vec<Person>,
}

impl Roster {
    pub fn new(sites: Sites, people: Vec<Person>) -> Self {
        Self {
            sites,
            labels: Labels::default(),
            people,
        }
    }

    /// Active people, in roster order.
    pub fn active_people(&self) -> impl Iterator<Item = &Person> {
        self.people.iter().filter(|p| p.active)
    }

    pub fn find(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    /// Finds an active person by display name or id, ignoring case and padding.
    pub fn find_active_by_label(&self, label: &str) -> Option<&Person> {
        let label = label.trim();
        self.active_people().find(|p| {
            p.name.trim().eq_ignore_ascii_case(label) || p.id.eq_ignore_ascii_case(label)
        })
    }

    /// Checks ids are present and unique, rules only name real sites, and
    /// every active name or id identifies a single active person.
    pub fn validate(&self) -> Result<(), RosterError> {
        let mut seen = HashSet::new();
        for person in &self.people {
            if person.id.trim().is_empty() {
                return Err(RosterError::EmptyId {
                    name: person.name.clone(),
                });
            }
            if !seen.insert(person.id.as_str()) {
                return Err(RosterError::DuplicateId(person.id.clone()));
            }
            if person.rules.iter().any(|r| r.location() == Location::Absent) {
                return Err(RosterError::AbsentInRule {
                    person: person.id.clone(),
                });
            }
        }

        // Same matching as find_active_by_label: trimmed, ASCII case-insensitive
        let mut owners: HashMap<String, &str> = HashMap::new();
        for person in self.active_people() {
            for label in [person.name.trim(), person.id.trim()] {
                let key = label.to_ascii_lowercase();
                match owners.get(&key) {
                    Some(owner) if *owner != person.id => {
                        return Err(RosterError::DuplicateName(label.to_string()));
                    }
                    _ => {
                        owners.insert(key, &person.id);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Parses and validates a roster from TOML text.
pub fn parse_roster(text: &str) -> Result<Roster, RosterError> {
    let roster: Roster = toml::from_str(text)?;
    roster.validate()?;
    Ok(roster)
}

/// Loads the roster configuration file.
pub fn load_roster<P: AsRef<Path>>(path: P) -> Result<Roster, RosterError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let roster = parse_roster(&text)?;
    debug!(
        path = %path.as_ref().display(),
        people = roster.people.len(),
        "loaded roster"
    );
    Ok(roster)
}
