use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::{debug, warn};

use super::export::{day_label, ALL_HANDS_HEADING, HEADER_CELL};
use crate::error::ImportError;
use crate::roster::Roster;
use crate::schedule::AssignmentTable;

/// Parses text produced by [`export_text`](super::export_text) back into a table.
///
/// Day columns map by position onto `business_days`. Rows are matched to
/// active people by name or id; unmatched rows are skipped. Unknown labels
/// become remote, and absences cannot be recovered.
///
/// The whole text is parsed before anything is returned, so a malformed
/// file never yields a partial table.
pub fn import_text(
    roster: &Roster,
    business_days: &[NaiveDate],
    text: &str,
) -> Result<AssignmentTable, ImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record?,
        None => return Err(ImportError::MissingHeader),
    };
    if header.get(0).map(str::trim) != Some(HEADER_CELL) {
        return Err(ImportError::MissingHeader);
    }

    let expected = business_days.len() + 1;
    if header.len() < expected {
        return Err(ImportError::TooFewColumns {
            expected,
            found: header.len(),
        });
    }
    for (i, day) in business_days.iter().enumerate() {
        let label = header.get(i + 1).unwrap_or("").trim();
        if label != day_label(*day) {
            debug!(column = i + 1, %label, %day, "header label does not match business day");
        }
    }

    let mut table = AssignmentTable::new();
    let mut matched = 0;
    for record in records {
        let record = record?;
        let first = record.get(0).unwrap_or("").trim();

        // End of the person rows: blank separator or the all-hands section
        if record.iter().all(|field| field.trim().is_empty()) || first == ALL_HANDS_HEADING {
            break;
        }
        if record.len() < expected {
            return Err(ImportError::TooFewColumns {
                expected,
                found: record.len(),
            });
        }

        let Some(person) = roster.find_active_by_label(first) else {
            warn!(name = %first, "skipping row with no matching person");
            continue;
        };

        for (i, day) in business_days.iter().enumerate() {
            let label = record.get(i + 1).unwrap_or("");
            table.set(*day, &person.id, roster.labels.location_for(label));
        }
        matched += 1;
    }

    if matched == 0 {
        return Err(ImportError::NoPersonMatch);
    }
    debug!(rows = matched, "imported schedule text");
    Ok(table)
}
