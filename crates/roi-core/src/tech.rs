//! User-entered lifeform technology assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::{SiteId, ValidationError};

/// Highest level a lifeform technology can reach.
pub const MAX_TECH_LEVEL: u8 = 20;

/// Identifier of a lifeform technology, e.g. 12207.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechId(pub u32);

impl fmt::Display for TechId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Technology chosen for one slot and its level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAssignment {
    /// `None` leaves the slot empty.
    #[serde(default, deserialize_with = "lenient_technology")]
    pub technology_id: Option<TechId>,
    /// Levels too large for `u8` saturate so range checks still reject them.
    #[serde(default, deserialize_with = "lenient_level")]
    pub level: u8,
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// Null, negative or non-numeric levels read as 0.
fn lenient_level<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_as_u64(&value).map_or(0, |v| u8::try_from(v).unwrap_or(u8::MAX)))
}

// Anything that is not a technology number leaves the slot empty.
fn lenient_technology<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TechId>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_as_u64(&value)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|&v| v > 0)
        .map(TechId))
}

impl SlotAssignment {
    pub fn new(technology: u32, level: u8) -> Self {
        Self {
            technology_id: Some(TechId(technology)),
            level,
        }
    }

    /// Whether the slot can contribute any bonus at all.
    pub fn is_active(&self) -> bool {
        self.technology_id.is_some() && self.level > 0
    }
}

/// Site id -> slot number -> assignment, plus a last-modified stamp.
///
/// The engine treats this as an immutable snapshot; storing it is the
/// caller's business.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechAssignmentConfig {
    #[serde(default)]
    pub sites: BTreeMap<SiteId, BTreeMap<u8, SlotAssignment>>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl TechAssignmentConfig {
    /// Assignments of one site, if any were entered.
    pub fn slots(&self, site: &SiteId) -> Option<&BTreeMap<u8, SlotAssignment>> {
        self.sites.get(site)
    }

    /// Sets the assignment of `slot` on `site` and stamps the config.
    pub fn assign(
        &mut self,
        site: SiteId,
        slot: u8,
        assignment: SlotAssignment,
        now: DateTime<Utc>,
    ) {
        self.sites.entry(site).or_default().insert(slot, assignment);
        self.last_modified = Some(now);
    }

    pub fn from_json_str(s: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(s).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, ValidationError> {
        serde_json::to_string_pretty(self).map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn roundtrip_keeps_null_and_zero_levels() {
        let mut cfg = TechAssignmentConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        cfg.assign(SiteId::from("33620147"), 2, SlotAssignment::new(12202, 7), now);
        cfg.assign(
            SiteId::from("33620147"),
            5,
            SlotAssignment {
                technology_id: None,
                level: 0,
            },
            now,
        );
        cfg.assign(SiteId::from("33620190"), 7, SlotAssignment::new(12207, 0), now);

        let s = cfg.to_json_string().unwrap();
        assert!(s.contains("\"technologyId\": null"));
        let back = TechAssignmentConfig::from_json_str(&s).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn parses_host_shape() {
        let s = r#"{
            "sites": { "1": { "3": { "technologyId": 12203, "level": 4 } } },
            "lastModified": "2024-05-01T08:00:00Z"
        }"#;
        let cfg = TechAssignmentConfig::from_json_str(s).unwrap();
        let slot = cfg.slots(&SiteId::from("1")).unwrap()[&3];
        assert_eq!(slot, SlotAssignment::new(12203, 4));
        assert!(cfg.last_modified.is_some());
    }

    #[test]
    fn unreadable_levels_read_as_zero() {
        let s = r#"{ "sites": { "1": {
            "2": { "technologyId": 12202, "level": null },
            "3": { "technologyId": 12203, "level": "abc" },
            "5": { "technologyId": 12205 }
        } } }"#;
        let cfg = TechAssignmentConfig::from_json_str(s).unwrap();
        let slots = cfg.slots(&SiteId::from("1")).unwrap();
        assert_eq!(slots[&2], SlotAssignment::new(12202, 0));
        assert_eq!(slots[&3], SlotAssignment::new(12203, 0));
        assert_eq!(slots[&5], SlotAssignment::new(12205, 0));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let s = r#"{ "sites": { "1": { "7": { "technologyId": "12207", "level": "7" } } } }"#;
        let cfg = TechAssignmentConfig::from_json_str(s).unwrap();
        assert_eq!(cfg.slots(&SiteId::from("1")).unwrap()[&7], SlotAssignment::new(12207, 7));
    }

    #[test]
    fn unrecognized_technology_is_an_empty_slot() {
        let s = r#"{ "sites": { "1": {
            "2": { "technologyId": "none", "level": 4 },
            "3": { "technologyId": -5, "level": 4 }
        } } }"#;
        let cfg = TechAssignmentConfig::from_json_str(s).unwrap();
        let slots = cfg.slots(&SiteId::from("1")).unwrap();
        assert_eq!(slots[&2].technology_id, None);
        assert_eq!(slots[&3].technology_id, None);
        assert!(!slots[&2].is_active());
    }

    #[test]
    fn oversized_level_saturates() {
        let s = r#"{ "sites": { "1": { "2": { "technologyId": 12202, "level": 300 } } } }"#;
        let cfg = TechAssignmentConfig::from_json_str(s).unwrap();
        assert_eq!(cfg.slots(&SiteId::from("1")).unwrap()[&2].level, u8::MAX);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            TechAssignmentConfig::from_json_str("{\"sites\": 3}"),
            Err(ValidationError::Malformed(_))
        ));
    }

    proptest! {
        #[test]
        fn roundtrip_any_valid_assignment(
            entries in proptest::collection::vec(
                (0u32..1_000_000, 1u8..=11, proptest::option::of(11200u32..14220), 0u8..=MAX_TECH_LEVEL),
                0..20,
            ),
            secs in 0i64..4_000_000_000,
        ) {
            let mut cfg = TechAssignmentConfig::default();
            for (site, slot, tech, level) in entries {
                cfg.sites.entry(SiteId(site.to_string())).or_default().insert(
                    slot,
                    SlotAssignment { technology_id: tech.map(TechId), level },
                );
            }
            cfg.last_modified = DateTime::from_timestamp(secs, 0);
            let back = TechAssignmentConfig::from_json_str(&cfg.to_json_string().unwrap()).unwrap();
            prop_assert_eq!(back, cfg);
        }
    }
}
