//! Property encoding and decoding rules.
//!
//! Two policies live here:
//!
//! - string normalization: inputs are trimmed, and a `None` or
//!   empty-after-trim string means the property is not set at all
//!   ("absent" is distinct from "empty");
//! - date encoding: timestamps are stored as **epoch seconds** in a
//!   [`PropertyValue::Int`]. The historical alternative (a formatted
//!   ISO-8601 string) is still accepted on the decode side for data
//!   written by older revisions, but is never produced.

use crate::property::PropertyValue;
use chrono::{DateTime, TimeZone, Utc};
use log::error;

/// Formatted-string shape accepted by the legacy decode path,
/// e.g. `2012-02-10T19:22:10+0000`.
const LEGACY_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Normalize a string input per the codec contract.
///
/// Returns `None` when the input is absent or trims to empty, meaning
/// the property must not be set.
pub fn normalize_string(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Encode a timestamp as epoch seconds.
///
/// Sub-second precision is dropped; round-tripping through
/// [`decode_datetime`] holds at second granularity.
pub fn encode_datetime(value: &DateTime<Utc>) -> PropertyValue {
    PropertyValue::Int(value.timestamp())
}

/// Convert epoch seconds to a timestamp.
///
/// Out-of-range values are reported and yield `None`.
pub fn datetime_from_secs(secs: i64) -> Option<DateTime<Utc>> {
    match Utc.timestamp_opt(secs, 0).single() {
        Some(dt) => Some(dt),
        None => {
            error!("epoch seconds value out of range: {secs}");
            None
        }
    }
}

/// Convert epoch milliseconds to a timestamp.
///
/// Out-of-range values are reported and yield `None`.
pub fn datetime_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(dt) => Some(dt),
        None => {
            error!("epoch milliseconds value out of range: {millis}");
            None
        }
    }
}

/// Parse a formatted date string.
///
/// Accepts RFC 3339 and the legacy `%Y-%m-%dT%H:%M:%S%z` shape.
/// Unparseable strings are reported and yield `None`.
pub fn datetime_from_str(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    match DateTime::parse_from_str(value, LEGACY_DATE_FORMAT) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            error!("cannot parse \"{value}\" as a date: {e}");
            None
        }
    }
}

/// Decode a stored property into a timestamp.
///
/// `Int` values are interpreted as epoch seconds (the encoding this
/// layer produces), strings go through [`datetime_from_str`]. Any other
/// shape is reported and yields `None`; decode failures are never fatal.
pub fn decode_datetime(value: &PropertyValue) -> Option<DateTime<Utc>> {
    match value {
        PropertyValue::Int(secs) => datetime_from_secs(*secs),
        PropertyValue::String(s) => datetime_from_str(s),
        other => {
            error!("cannot decode a date from property value: {other:?}");
            None
        }
    }
}
