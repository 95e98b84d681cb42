use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::roster::Roster;
use crate::schedule::calendar::month_start;
use crate::schedule::{
    allocate_targets, business_days, generate, summarize, AssignmentTable, Location, Overrides,
    PersonSummary, Targets,
};
use crate::textfile::{export_text, import_text, ExportVariant};

/// Persisted schedule: month, overrides, business days and the last table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub month: NaiveDate,
    #[serde(default)]
    pub all_hands: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub table: AssignmentTable,
    #[serde(default)]
    pub absences: BTreeMap<String, BTreeSet<NaiveDate>>,
    #[serde(default)]
    pub business_days: Vec<NaiveDate>,
}

impl ScheduleState {
    /// Empty state for the month containing `month`.
    pub fn new(month: NaiveDate) -> Self {
        Self {
            month: month_start(month),
            all_hands: BTreeSet::new(),
            table: AssignmentTable::new(),
            absences: BTreeMap::new(),
            business_days: business_days(month),
        }
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            all_hands: self.all_hands.clone(),
            absences: self.absences.clone(),
        }
    }

    /// Validates and stores a new month and its overrides.
    ///
    /// The table is left alone until the next [`regenerate`](Self::regenerate).
    pub fn set_overrides(
        &mut self,
        roster: &Roster,
        month: NaiveDate,
        overrides: Overrides,
    ) -> Result<(), StoreError> {
        overrides.validate(roster, month)?;
        let month = month_start(month);
        if month != self.month {
            self.table = AssignmentTable::new();
        }
        self.month = month;
        self.business_days = business_days(month);
        self.all_hands = overrides.all_hands;
        self.absences = overrides.absences;
        Ok(())
    }

    /// Recomputes the table from scratch. Manual edits are discarded.
    pub fn regenerate(&mut self, roster: &Roster) -> BTreeMap<String, Targets> {
        let generation = generate(roster, self.month, &self.overrides());
        self.business_days = generation.business_days;
        self.table = generation.table;
        generation.targets
    }

    pub fn targets(&self, roster: &Roster) -> BTreeMap<String, Targets> {
        allocate_targets(&self.business_days, roster, &self.overrides())
    }

    pub fn summary(&self, roster: &Roster) -> Vec<PersonSummary> {
        summarize(roster, &self.table, &self.targets(roster))
    }

    /// Manual edit of a single cell, last write wins.
    pub fn set_cell(
        &mut self,
        roster: &Roster,
        day: NaiveDate,
        person_id: &str,
        location: Location,
    ) -> Result<(), StoreError> {
        if !self.business_days.contains(&day) {
            return Err(StoreError::UnknownDay(day));
        }
        if !roster.find(person_id).is_some_and(|p| p.active) {
            return Err(StoreError::UnknownPerson(person_id.to_string()));
        }
        self.table.set(day, person_id, location);
        Ok(())
    }

    /// Replaces the rows of every person found in `text`.
    ///
    /// Returns the number of people imported. On error nothing changes.
    pub fn apply_import(&mut self, roster: &Roster, text: &str) -> Result<usize, StoreError> {
        let imported = import_text(roster, &self.business_days, text)?;

        let mut people = BTreeSet::new();
        for (day, row) in imported.days() {
            for (person_id, location) in row {
                self.table.set(*day, person_id, *location);
                people.insert(person_id.clone());
            }
        }
        info!(people = people.len(), "applied imported schedule");
        Ok(people.len())
    }

    pub fn export(&self, roster: &Roster, variant: ExportVariant) -> Result<String, StoreError> {
        Ok(export_text(
            roster,
            &self.business_days,
            &self.table,
            &self.all_hands,
            variant,
        )?)
    }
}

/// Keeps the schedule state in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the saved state, or `None` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<ScheduleState>, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no saved state");
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        let state = serde_json::from_str(&text)?;
        debug!(path = %self.path.display(), "loaded state");
        Ok(Some(state))
    }

    /// Writes the state through a temporary file so a crash never leaves half a file.
    pub fn save(&self, state: &ScheduleState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "saved state");
        Ok(())
    }
}
