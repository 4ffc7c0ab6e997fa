use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Result, StoreError};

/// Formats accepted for date criteria, tried in order; the first match wins.
/// Date-only formats resolve to midnight.
const DATE_FORMATS: &[(&str, bool)] = &[
    ("%Y%m%d", false),
    ("%Y-%m-%d", false),
    ("%Y-%m-%d %H:%M", true),
    ("%Y%m%d%H%M", true),
    ("%Y-%m-%d %H:%M:%S", true),
    ("%Y%m%d%H%M%S", true),
];

/// Canonical rendering used when a cutoff is sent to a backend as text.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    for (format, has_time) in DATE_FORMATS {
        let parsed = if *has_time {
            NaiveDateTime::parse_from_str(raw, format).ok()
        } else {
            NaiveDate::parse_from_str(raw, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        };
        if let Some(value) = parsed {
            return Ok(value);
        }
    }
    Err(StoreError::UnparseableDate(raw.to_string()))
}

pub fn format_canonical(value: &NaiveDateTime) -> String {
    value.format(CANONICAL_FORMAT).to_string()
}
