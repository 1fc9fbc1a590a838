//! Normalization of raw site records into [`SiteSnapshot`]s.
//!
//! Host exports are loose: levels arrive as numbers or numeric strings,
//! the moon flag has several spellings and temperatures come either as
//! separate fields or as a text range. Everything is resolved here so the
//! engine never parses strings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::{Coordinates, SiteId, SiteSnapshot, Temperature, ValidationError};

static SIGNED_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").expect("static regex"));

/// Parses a site collection: an array of records, an object keyed by id,
/// or an empire export of the form `{ "planets": [...] }`.
pub fn sites_from_json(text: &str) -> Result<Vec<SiteSnapshot>, ValidationError> {
    let doc: Value =
        serde_json::from_str(text).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    sites_from_value(&doc)
}

pub fn sites_from_value(doc: &Value) -> Result<Vec<SiteSnapshot>, ValidationError> {
    let records: Vec<&Value> = match doc {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("planets") {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => map.values().collect(),
        },
        _ => {
            return Err(ValidationError::Malformed(
                "expected an array or object of site records".to_string(),
            ))
        }
    };
    let mut sites = Vec::with_capacity(records.len());
    for record in records {
        match record {
            Value::Object(fields) => sites.push(site_from_record(fields)?),
            Value::Null => continue,
            other => {
                return Err(ValidationError::Malformed(format!(
                    "site record is not an object: {other}"
                )))
            }
        }
    }
    debug!(count = sites.len(), "parsed site records");
    Ok(sites)
}

/// Builds one snapshot from a raw record.
pub fn site_from_record(fields: &Map<String, Value>) -> Result<SiteSnapshot, ValidationError> {
    let id = match fields.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(ValidationError::MissingId),
    };
    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let coordinates: Coordinates = match fields.get("coordinates").and_then(Value::as_str) {
        Some(s) => s.parse()?,
        None => return Err(ValidationError::MissingCoordinates(id)),
    };

    let mut levels = BTreeMap::new();
    for (key, value) in fields {
        let Ok(structure) = key.parse::<u32>() else {
            continue;
        };
        let level = lenient_level(value);
        if level > 0 {
            levels.insert(structure, level);
        }
    }

    Ok(SiteSnapshot {
        temperature: temperature_of(&id, fields),
        secondary: is_moon(fields),
        id: SiteId(id),
        name,
        coordinates,
        levels,
    })
}

fn is_moon(fields: &Map<String, Value>) -> bool {
    if let Some(t) = fields.get("planetType") {
        if lenient_int(t) == Some(1) {
            return true;
        }
    }
    if fields.get("type").and_then(Value::as_str) == Some("moon") {
        return true;
    }
    matches!(fields.get("isMoon"), Some(Value::Bool(true)))
}

fn temperature_of(id: &str, fields: &Map<String, Value>) -> Temperature {
    let min = fields.get("minTemperature").and_then(lenient_int);
    let max = fields.get("maxTemperature").and_then(lenient_int);
    if min.is_some() || max.is_some() {
        return Temperature::from_readings(to_i32(min), to_i32(max));
    }
    match fields.get("temperature") {
        Some(Value::Number(n)) => {
            Temperature::from_readings(None, n.as_f64().map(|v| v.round() as i32))
        }
        Some(Value::String(s)) => {
            let nums: Vec<i32> = SIGNED_INT
                .find_iter(s)
                .filter_map(|m| m.as_str().parse().ok())
                .collect();
            match nums.as_slice() {
                [] => {
                    warn!(site = id, text = %s, "unreadable temperature, using default");
                    Temperature::default()
                }
                [max] => Temperature::from_readings(None, Some(*max)),
                [min, max, ..] => Temperature::from_readings(Some(*min), Some(*max)),
            }
        }
        _ => {
            debug!(site = id, "no temperature, using default");
            Temperature::default()
        }
    }
}

fn to_i32(v: Option<i64>) -> Option<i32> {
    v.and_then(|v| i32::try_from(v).ok())
}

/// Integer value of a number or a string starting with an integer.
fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let t = s.trim_start();
            let (sign, digits) = match t.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, t.strip_prefix('+').unwrap_or(t)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|v| sign * v)
        }
        _ => None,
    }
}

/// Structure level; anything unusable normalizes to 0.
fn lenient_level(value: &Value) -> u32 {
    lenient_int(value)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}
