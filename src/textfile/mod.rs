//! Text export and import of the assignment table.
//!
//! The export is lossy: absences collapse into the remote label
//! (unless [`ExportVariant::WithAbsence`] is used) and preference shares are
//! not written at all. Re-importing recovers primary, secondary and remote
//! assignments only.

pub mod export;
pub mod import;

pub use export::{day_label, export_text, full_date, ExportVariant, ALL_HANDS_HEADING, HEADER_CELL};
pub use import::import_text;
