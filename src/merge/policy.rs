//! Field value → substitution text.

use crate::error::RenderError;
use crate::package::xml::is_xml_char;
use crate::record::FieldValue;

use super::options::{MergeOptions, MissingValuePolicy};

/// Decide the text that replaces the placeholder for `name`.
///
/// `value` is the record's entry for the field (`None` when the record has
/// no such key). Returns `Ok(None)` when the placeholder should stay in the
/// document as written.
pub fn substitution_text(
    name: &str,
    value: Option<&FieldValue>,
    options: &MergeOptions,
) -> Result<Option<String>, RenderError> {
    let value = match value {
        Some(v) if !v.is_absent() => v,
        _ => {
            return Ok(match options.missing {
                MissingValuePolicy::Keep => None,
                MissingValuePolicy::Empty => Some(String::new()),
                MissingValuePolicy::Fallback(ref text) => Some(text.clone()),
            })
        }
    };

    let text = match value {
        FieldValue::Absent => String::new(),
        FieldValue::Text(s) => s.clone(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Float(f) => {
            if !f.is_finite() {
                return Err(RenderError::InvalidValue {
                    field: name.to_string(),
                    reason: format!("non-finite number {}", f),
                });
            }
            f.to_string()
        }
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Date(d) => format_date(name, d.format(&options.date_format))?,
        FieldValue::DateTime(dt) => format_date(name, dt.format(&options.datetime_format))?,
    };

    if let Some(c) = text.chars().find(|&c| !is_xml_char(c)) {
        return Err(RenderError::InvalidValue {
            field: name.to_string(),
            reason: format!("contains character U+{:04X}", c as u32),
        });
    }

    if options.is_address_field(name) {
        return Ok(Some(canonicalize_address(&text)));
    }
    Ok(Some(text))
}

fn format_date(name: &str, formatted: impl std::fmt::Display) -> Result<String, RenderError> {
    use std::fmt::Write;

    let mut out = String::new();
    write!(out, "{}", formatted).map_err(|_| RenderError::InvalidValue {
        field: name.to_string(),
        reason: "date format string is invalid".into(),
    })?;
    Ok(out)
}

/// Collapse a multi-line address into one line: each line trimmed, blank
/// lines dropped, the rest joined with `", "`.
pub fn canonicalize_address(text: &str) -> String {
    text.split(is_line_separator)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `\r\n` splits into an empty piece that the blank-line filter drops.
fn is_line_separator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{000B}' | '\u{2028}' | '\u{2029}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(value: FieldValue) -> Option<String> {
        substitution_text("Field", Some(&value), &MergeOptions::default()).unwrap()
    }

    #[test]
    fn test_scalar_formatting() {
        assert_eq!(text(FieldValue::Integer(42)).as_deref(), Some("42"));
        assert_eq!(text(FieldValue::Float(1.0)).as_deref(), Some("1"));
        assert_eq!(text(FieldValue::Float(2.5)).as_deref(), Some("2.5"));
        assert_eq!(text(FieldValue::Boolean(true)).as_deref(), Some("true"));

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(text(FieldValue::Date(date)).as_deref(), Some("2024-03-01"));
        let datetime = date.and_hms_opt(9, 5, 0).unwrap();
        assert_eq!(
            text(FieldValue::DateTime(datetime)).as_deref(),
            Some("2024-03-01 09:05")
        );
    }

    #[test]
    fn test_missing_policies() {
        let keep = MergeOptions::default();
        assert_eq!(substitution_text("X", None, &keep).unwrap(), None);
        assert_eq!(
            substitution_text("X", Some(&FieldValue::Float(f64::NAN)), &keep).unwrap(),
            None
        );

        let empty = MergeOptions::new().with_missing(MissingValuePolicy::Empty);
        assert_eq!(
            substitution_text("X", Some(&FieldValue::Absent), &empty).unwrap(),
            Some(String::new())
        );

        let fallback = MergeOptions::new().with_fallback("n/a");
        assert_eq!(
            substitution_text("X", None, &fallback).unwrap().as_deref(),
            Some("n/a")
        );
    }

    #[test]
    fn test_invalid_values() {
        let options = MergeOptions::default();
        let err = substitution_text("Name", Some(&FieldValue::from("bad\u{0}")), &options);
        assert!(matches!(err, Err(RenderError::InvalidValue { ref field, .. }) if field == "Name"));

        let err = substitution_text("Amount", Some(&FieldValue::Float(f64::INFINITY)), &options);
        assert!(err.is_err());
    }

    #[test]
    fn test_custom_date_format() {
        let options = MergeOptions::new().with_date_format("%d.%m.%Y");
        let date = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 12, 24).unwrap());
        assert_eq!(
            substitution_text("Date", Some(&date), &options)
                .unwrap()
                .as_deref(),
            Some("24.12.2024")
        );

        let broken = MergeOptions::new().with_date_format("%Q");
        assert!(substitution_text("Date", Some(&date), &broken).is_err());
    }

    #[test]
    fn test_address_canonicalization() {
        let options = MergeOptions::default();
        let value = FieldValue::from("  Line1\n\nLine2 \r\n Riga ");
        assert_eq!(
            substitution_text("Address", Some(&value), &options)
                .unwrap()
                .as_deref(),
            Some("Line1, Line2, Riga")
        );
        assert_eq!(canonicalize_address("Line1\nLine2"), "Line1, Line2");
    }

    #[test]
    fn test_address_lone_carriage_return() {
        assert_eq!(canonicalize_address("Line1\rLine2"), "Line1, Line2");
        assert_eq!(canonicalize_address("Line1\r\rLine2\r"), "Line1, Line2");
        assert_eq!(
            canonicalize_address("Line1\u{000B}Line2\u{2028}Line3"),
            "Line1, Line2, Line3"
        );

        let options = MergeOptions::default();
        let value = FieldValue::from("Line1\rLine2");
        let text = substitution_text("Address", Some(&value), &options).unwrap();
        assert_eq!(text.as_deref(), Some("Line1, Line2"));
    }
}
