pub mod types;
pub mod calendar;
pub mod overrides;
pub mod targets;
pub mod priority;
pub mod greedy;
pub mod usage;

pub use types::{AssignmentTable, Capacity, Location, Overlay, Phase};
pub use calendar::{business_days, parse_month};
pub use overrides::{resolve, Overrides, Resolution};
pub use targets::{allocate_targets, Targets};
pub use priority::{priority, Tally};
pub use greedy::{generate, Generation};
pub use usage::{daily_usage, summarize, usage_for_day, usage_for_person, PersonSummary, Usage};
