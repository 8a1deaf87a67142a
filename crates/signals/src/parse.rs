//! CSV parsing for device log exports
//!
//! The device emits one reading per line with no header row:
//! `<unix timestamp>,<count>[,<ignored>...]`. Firmware output is not
//! trusted, so every line is parsed on its own and failures are collected
//! instead of aborting the export.

use thiserror::Error;

use crate::models::{Reading, RejectedLine};

/// Why a single log line was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("expected at least 2 fields")]
    TooFewFields,
    #[error("timestamp is not a finite number")]
    BadTimestamp,
    #[error("count is not an integer")]
    BadCount,
}

/// Parse one non-empty log line into a [`Reading`]
///
/// Fields beyond the second are ignored.
pub fn parse_line(line: &str) -> Result<Reading, RowError> {
    let mut fields = line.split(',').map(clean_field);

    let (Some(ts_field), Some(count_field)) = (fields.next(), fields.next()) else {
        return Err(RowError::TooFewFields);
    };

    let timestamp = ts_field
        .parse::<f64>()
        .ok()
        .filter(|ts| ts.is_finite())
        .ok_or(RowError::BadTimestamp)?;
    let count = count_field.parse::<i64>().map_err(|_| RowError::BadCount)?;

    Ok(Reading::new(timestamp, count))
}

/// Parse a whole export, splitting good readings from rejected lines
///
/// Blank lines are skipped without being reported. Line numbers in the
/// rejected list are 1-based positions in `body`.
pub fn parse_body(body: &str) -> (Vec<Reading>, Vec<RejectedLine>) {
    let mut readings = Vec::new();
    let mut rejected = Vec::new();

    for (idx, line) in body.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(reading) => readings.push(reading),
            Err(error) => rejected.push(RejectedLine {
                line_number: idx + 1,
                line: line.to_string(),
                error,
            }),
        }
    }

    (readings, rejected)
}

/// Trim whitespace and one pair of surrounding double quotes
fn clean_field(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(field)
}
