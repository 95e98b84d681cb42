use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while loading or validating the roster configuration.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read roster file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid roster file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("person id must not be empty (name: {name:?})")]
    EmptyId { name: String },

    #[error("duplicate person id: {0}")]
    DuplicateId(String),

    /// Text import matches rows by name or id, so each must pick one person.
    #[error("name or id {0:?} matches more than one active person")]
    DuplicateName(String),

    /// Rules route people between sites; absences go through the absence set.
    #[error("rule for {person} references the absence marker")]
    AbsentInRule { person: String },
}

/// Errors raised when a generation request does not fit its month or roster.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("too many all-hands dates: {found} (at most {max})")]
    TooManyAllHands { found: usize, max: usize },

    #[error("date {date} is outside the month starting {month}")]
    OutsideMonth { date: NaiveDate, month: NaiveDate },

    #[error("absence given for unknown person: {0}")]
    UnknownPerson(String),
}

/// The one failure kind of a text import. Any of these aborts the whole import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("missing header row (expected first cell \"Person\")")]
    MissingHeader,

    #[error("too few columns: expected {expected}, found {found}")]
    TooFewColumns { expected: usize, found: usize },

    #[error("no row matches a person of the roster")]
    NoPersonMatch,

    #[error("unreadable text: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors raised by the schedule state store and its operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} is not a business day of the scheduled month")]
    UnknownDay(NaiveDate),

    #[error("unknown person: {0}")]
    UnknownPerson(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("text export failed: {0}")]
    Export(#[from] csv::Error),
}
