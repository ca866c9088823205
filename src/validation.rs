// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Input checks shared by every handler.

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};

/// True when the value is missing, empty, or only whitespace.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Return the trimmed value of a required field.
pub fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::BadRequest(format!("{field} is required."))),
    }
}

/// Reject the request if any of the named fields is blank.
pub fn require_all(fields: &[(&str, Option<&str>)]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| is_blank(*value))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "All fields are required (missing: {}).",
            missing.join(", ")
        )))
    }
}

/// Parse a required RFC3339 timestamp field.
pub fn require_timestamp(value: Option<&str>, field: &str) -> Result<DateTime<Utc>> {
    let raw = require(value, field)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::BadRequest(format!("{field} must be an RFC3339 datetime.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some("   \t")));
        assert!(!is_blank(Some(" x ")));
    }

    #[test]
    fn test_require_trims() {
        assert_eq!(require(Some("  road "), "cycleType").unwrap(), "road");
        assert!(matches!(
            require(Some(" "), "cycleType"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_require_all_names_missing_fields() {
        let err = require_all(&[
            ("endTime", Some("")),
            ("landmark", Some("X")),
            ("cycleType", None),
        ])
        .unwrap_err();

        match err {
            AppError::BadRequest(msg) => {
                assert!(msg.contains("endTime"));
                assert!(msg.contains("cycleType"));
                assert!(!msg.contains("landmark"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_require_timestamp() {
        let ts = require_timestamp(Some("2026-05-01T10:00:00Z"), "availableTill").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-05-01T10:00:00+00:00");

        assert!(require_timestamp(Some("tomorrow"), "availableTill").is_err());
        assert!(require_timestamp(None, "availableTill").is_err());
    }
}
