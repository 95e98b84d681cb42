use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where a person spends a business day.
///
/// `Primary` and `Secondary` are the two on-site locations with a capacity.
/// `Remote` is unbounded and `Absent` is the absence marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Location {
    Primary,
    Secondary,
    Remote,
    Absent,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Primary => "PRIMARY",
            Location::Secondary => "SECONDARY",
            Location::Remote => "REMOTE",
            Location::Absent => "ABSENT",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PRIMARY" => Ok(Location::Primary),
            "SECONDARY" => Ok(Location::Secondary),
            "REMOTE" => Ok(Location::Remote),
            "ABSENT" => Ok(Location::Absent),
            other => Err(format!("unknown location tag: {other}")),
        }
    }
}

/// Seat limit of an on-site location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CapacityRepr", into = "CapacityRepr")]
pub enum Capacity {
    Limited(u32),
    Unbounded,
}

impl Capacity {
    /// Whether one more person fits next to `occupancy` others.
    pub fn admits(&self, occupancy: usize) -> bool {
        match self {
            Capacity::Limited(max) => occupancy < *max as usize,
            Capacity::Unbounded => true,
        }
    }
}

// Written either as a plain count or as the word "unbounded".
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CapacityRepr {
    Count(u32),
    Word(UnboundedWord),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum UnboundedWord {
    Unbounded,
}

impl From<CapacityRepr> for Capacity {
    fn from(repr: CapacityRepr) -> Self {
        match repr {
            CapacityRepr::Count(n) => Capacity::Limited(n),
            CapacityRepr::Word(UnboundedWord::Unbounded) => Capacity::Unbounded,
        }
    }
}

impl From<Capacity> for CapacityRepr {
    fn from(capacity: Capacity) -> Self {
        match capacity {
            Capacity::Limited(n) => CapacityRepr::Count(n),
            Capacity::Unbounded => CapacityRepr::Word(UnboundedWord::Unbounded),
        }
    }
}

/// The pipeline phase that produced a cell, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Absence,
    AllHands,
    Pin,
    Greedy,
}

/// A partial (day, person) -> location layer produced by one override phase.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub phase: Phase,
    pub cells: BTreeMap<(NaiveDate, String), Location>,
}

impl Overlay {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            cells: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, day: NaiveDate, person_id: &str, location: Location) {
        self.cells.insert((day, person_id.to_string()), location);
    }
}

/// Day-by-person assignment table: ISO date -> person id -> location tag.
///
/// Both levels are ordered maps so that serializing the same table always
/// yields the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentTable {
    days: BTreeMap<NaiveDate, BTreeMap<String, Location>>,
}

impl AssignmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, day: NaiveDate, person_id: &str) -> Option<Location> {
        self.days.get(&day).and_then(|row| row.get(person_id)).copied()
    }

    /// Sets one cell, replacing whatever was there.
    pub fn set(&mut self, day: NaiveDate, person_id: &str, location: Location) {
        self.days
            .entry(day)
            .or_default()
            .insert(person_id.to_string(), location);
    }

    /// All assignments of one day, keyed by person id.
    pub fn day(&self, day: NaiveDate) -> Option<&BTreeMap<String, Location>> {
        self.days.get(&day)
    }

    pub fn days(&self) -> impl Iterator<Item = (&NaiveDate, &BTreeMap<String, Location>)> {
        self.days.iter()
    }

    /// Number of people at `location` on `day`.
    pub fn occupancy(&self, day: NaiveDate, location: Location) -> usize {
        self.days
            .get(&day)
            .map(|row| row.values().filter(|l| **l == location).count())
            .unwrap_or(0)
    }

    /// Total number of (day, person) cells.
    pub fn cell_count(&self) -> usize {
        self.days.values().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
