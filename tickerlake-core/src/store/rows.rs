//! Tolerant column readers.
//!
//! Rows copied from legacy tables do not always match the declared column
//! affinity (volumes stored as REAL, dates with a time suffix, NULL prices),
//! so reads go through these helpers instead of `row.get::<_, T>` directly.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSqlError, Type, ValueRef};
use rusqlite::Row;

fn text_of<'a>(value: &ValueRef<'a>) -> Option<&'a str> {
    match value {
        ValueRef::Text(t) => std::str::from_utf8(t).ok(),
        _ => None,
    }
}

fn conversion_error(idx: usize, ty: Type, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(FromSqlError::Other(msg.into())))
}

/// A numeric column as `f64`; NULL and non-numeric text are `None`.
pub(crate) fn real_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    let value = row.get_ref(idx)?;
    Ok(match value {
        ValueRef::Real(f) => Some(f),
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Text(_) => text_of(&value).and_then(|s| s.trim().parse::<f64>().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

/// A price column; missing values read back as `NaN`.
pub(crate) fn price(row: &Row<'_>, idx: usize) -> rusqlite::Result<f64> {
    Ok(real_opt(row, idx)?.unwrap_or(f64::NAN))
}

/// An integer column; NULL reads as 0, REAL values are truncated.
pub(crate) fn int(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    Ok(real_opt(row, idx)?.map(|f| f as i64).unwrap_or(0))
}

/// A text column; NULL reads as the empty string.
pub(crate) fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    let value = row.get_ref(idx)?;
    Ok(match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(_) | ValueRef::Blob(_) => text_of(&value).unwrap_or_default().to_string(),
    })
}

/// A date column stored as `YYYY-MM-DD`, optionally with a time suffix.
pub(crate) fn date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw = text(row, idx)?;
    let day = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| conversion_error(idx, Type::Text, format!("date {raw:?}: {e}")))
}

/// A timestamp column in SQLite's `CURRENT_TIMESTAMP` format or ISO-8601.
pub(crate) fn datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw = text(row, idx)?;
    let raw = raw.trim();
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| conversion_error(idx, Type::Text, format!("timestamp {raw:?}")))
}
