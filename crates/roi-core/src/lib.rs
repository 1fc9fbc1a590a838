#![deny(warnings)]

//! Core domain models for the ROI advisor.
//!
//! This crate defines the serializable snapshot types the engine consumes:
//! sites with their structure levels, lifeform kinds, per-resource value
//! triples and the user-entered tech assignments. All of them are plain
//! values recomputed by the caller on every calculation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use thiserror::Error;

pub mod input;
mod tech;

pub use tech::{SlotAssignment, TechAssignmentConfig, TechId, MAX_TECH_LEVEL};

/// Number of board positions inside a solar system.
pub const MAX_POSITION: u8 = 15;

/// The three mined resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Metal,
    Crystal,
    /// Temperature-sensitive resource.
    Deuterium,
}

impl Resource {
    /// All resources in display order.
    pub const ALL: [Resource; 3] = [Resource::Metal, Resource::Crystal, Resource::Deuterium];

    /// Structure id of the mine producing this resource.
    pub const fn mine_structure(self) -> u32 {
        match self {
            Resource::Metal => 1,
            Resource::Crystal => 2,
            Resource::Deuterium => 3,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resource::Metal => "metal",
            Resource::Crystal => "crystal",
            Resource::Deuterium => "deuterium",
        };
        f.write_str(s)
    }
}

/// One value per resource: percentages, cost vectors, weights, totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTriple<T> {
    pub metal: T,
    pub crystal: T,
    pub deuterium: T,
}

impl<T> ResourceTriple<T> {
    pub const fn new(metal: T, crystal: T, deuterium: T) -> Self {
        Self {
            metal,
            crystal,
            deuterium,
        }
    }

    pub fn get(&self, resource: Resource) -> &T {
        match resource {
            Resource::Metal => &self.metal,
            Resource::Crystal => &self.crystal,
            Resource::Deuterium => &self.deuterium,
        }
    }

    pub fn get_mut(&mut self, resource: Resource) -> &mut T {
        match resource {
            Resource::Metal => &mut self.metal,
            Resource::Crystal => &mut self.crystal,
            Resource::Deuterium => &mut self.deuterium,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ResourceTriple<U> {
        ResourceTriple {
            metal: f(self.metal),
            crystal: f(self.crystal),
            deuterium: f(self.deuterium),
        }
    }
}

impl ResourceTriple<f64> {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Same value for every resource.
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    /// Sum of `self[r] * weights[r]` over all resources.
    pub fn weighted_sum(&self, weights: &ResourceTriple<f64>) -> f64 {
        self.metal * weights.metal
            + self.crystal * weights.crystal
            + self.deuterium * weights.deuterium
    }

    pub fn is_finite(&self) -> bool {
        self.metal.is_finite() && self.crystal.is_finite() && self.deuterium.is_finite()
    }
}

impl<T: Add<Output = T>> Add for ResourceTriple<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            metal: self.metal + rhs.metal,
            crystal: self.crystal + rhs.crystal,
            deuterium: self.deuterium + rhs.deuterium,
        }
    }
}

impl<T: AddAssign> AddAssign for ResourceTriple<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.metal += rhs.metal;
        self.crystal += rhs.crystal;
        self.deuterium += rhs.deuterium;
    }
}

/// Unique identifier of a site as reported by the host application.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub String);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(s: &str) -> Self {
        SiteId(s.to_string())
    }
}

/// Location of a site: `galaxy:system:position`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub galaxy: u16,
    pub system: u16,
    /// Board position inside the system, 1..=15.
    pub position: u8,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.galaxy, self.system, self.position)
    }
}

impl FromStr for Coordinates {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ValidationError::InvalidCoordinates(s.to_string());
        let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
        let mut parts = trimmed.split(':').map(str::trim);
        let galaxy = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let system = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let position: u8 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        if parts.next().is_some() {
            return Err(bad());
        }
        if !(1..=MAX_POSITION).contains(&position) {
            return Err(ValidationError::PositionOutOfRange(position));
        }
        Ok(Coordinates {
            galaxy,
            system,
            position,
        })
    }
}

/// Normalized temperature range of a site in °C.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Temperature {
    pub min: i32,
    pub max: i32,
}

impl Temperature {
    /// Average assumed when no temperature is known.
    pub const DEFAULT_AVERAGE: i32 = 50;
    /// Distance between the known maximum and the assumed average.
    pub const MAX_ONLY_OFFSET: i32 = 20;

    /// Builds a range from whatever readings are available.
    ///
    /// Max only yields `T_avg = max - 20`, min only yields `T_avg = min + 20`,
    /// nothing yields `T_avg = 50`.
    pub fn from_readings(min: Option<i32>, max: Option<i32>) -> Self {
        match (min, max) {
            (Some(a), Some(b)) => Self {
                min: a.min(b),
                max: a.max(b),
            },
            (None, Some(max)) => Self {
                min: max.saturating_sub(2 * Self::MAX_ONLY_OFFSET),
                max,
            },
            (Some(min), None) => Self {
                min,
                max: min.saturating_add(2 * Self::MAX_ONLY_OFFSET),
            },
            (None, None) => Self {
                min: Self::DEFAULT_AVERAGE,
                max: Self::DEFAULT_AVERAGE,
            },
        }
    }

    /// Arithmetic mean of min and max.
    pub fn average(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self::from_readings(None, None)
    }
}

/// One of the four mutually exclusive lifeform tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeformKind {
    Human,
    Rocktal,
    Mecha,
    Kaelesh,
}

impl LifeformKind {
    /// Fixed enumeration order; tie-breaks refer to it.
    pub const ALL: [LifeformKind; 4] = [
        LifeformKind::Human,
        LifeformKind::Rocktal,
        LifeformKind::Mecha,
        LifeformKind::Kaelesh,
    ];

    /// Technology id this lifeform offers in `slot` (e.g. 12205 for Rocktal slot 5).
    pub const fn technology_in_slot(self, slot: u8) -> TechId {
        let base = match self {
            LifeformKind::Human => 11200,
            LifeformKind::Rocktal => 12200,
            LifeformKind::Mecha => 13200,
            LifeformKind::Kaelesh => 14200,
        };
        TechId(base + slot as u32)
    }
}

impl fmt::Display for LifeformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifeformKind::Human => "Human",
            LifeformKind::Rocktal => "Rocktal",
            LifeformKind::Mecha => "Mecha",
            LifeformKind::Kaelesh => "Kaelesh",
        };
        f.write_str(s)
    }
}

/// Snapshot of one owned site at calculation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteSnapshot {
    pub id: SiteId,
    pub name: String,
    pub coordinates: Coordinates,
    /// Moons never produce the mined resources.
    pub secondary: bool,
    /// Structure id -> level. Missing ids read as level 0.
    #[serde(default)]
    pub levels: BTreeMap<u32, u32>,
    #[serde(default)]
    pub temperature: Temperature,
}

impl SiteSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            id: SiteId(id.into()),
            name: name.into(),
            coordinates,
            secondary: false,
            levels: BTreeMap::new(),
            temperature: Temperature::default(),
        }
    }

    /// Level of `structure`, 0 when unknown.
    pub fn level(&self, structure: u32) -> u32 {
        self.levels.get(&structure).copied().unwrap_or(0)
    }

    /// Current mine level for `resource`.
    pub fn mine_level(&self, resource: Resource) -> u32 {
        self.level(resource.mine_structure())
    }

    pub fn is_primary(&self) -> bool {
        !self.secondary
    }

    pub fn with_level(mut self, structure: u32, level: u32) -> Self {
        self.levels.insert(structure, level);
        self
    }

    pub fn with_temperature(mut self, temperature: Temperature) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Validation errors raised at the input boundary.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Coordinates are not of the form `galaxy:system:position`.
    #[error("invalid coordinates: {0:?}")]
    InvalidCoordinates(String),
    /// Board position outside 1..=15.
    #[error("position {0} is out of range [1, 15]")]
    PositionOutOfRange(u8),
    /// A site record has no usable identifier.
    #[error("site record without id")]
    MissingId,
    /// A site record has no coordinates.
    #[error("site {0} has no coordinates")]
    MissingCoordinates(String),
    /// Document could not be parsed or serialized.
    #[error("malformed document: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn coordinates_parse_plain_and_bracketed() {
        let c: Coordinates = "1:234:8".parse().unwrap();
        assert_eq!(
            c,
            Coordinates {
                galaxy: 1,
                system: 234,
                position: 8
            }
        );
        let b: Coordinates = "[4:12:15]".parse().unwrap();
        assert_eq!(b.position, 15);
        assert_eq!(b.to_string(), "4:12:15");
    }

    #[test]
    fn coordinates_reject_garbage() {
        assert!("1:2".parse::<Coordinates>().is_err());
        assert!("1:2:3:4".parse::<Coordinates>().is_err());
        assert!("a:b:c".parse::<Coordinates>().is_err());
        assert_eq!(
            "1:2:16".parse::<Coordinates>(),
            Err(ValidationError::PositionOutOfRange(16))
        );
        assert_eq!(
            "1:2:0".parse::<Coordinates>(),
            Err(ValidationError::PositionOutOfRange(0))
        );
    }

    #[test]
    fn temperature_fallbacks() {
        assert_eq!(Temperature::from_readings(Some(10), Some(50)).average(), 30.0);
        assert_eq!(Temperature::from_readings(Some(50), Some(10)).average(), 30.0);
        assert_eq!(Temperature::from_readings(None, Some(60)).average(), 40.0);
        assert_eq!(Temperature::from_readings(Some(-20), None).average(), 0.0);
        let cold = Temperature::from_readings(None, Some(i32::MIN));
        assert_eq!(cold, Temperature { min: i32::MIN, max: i32::MIN });
        let hot = Temperature::from_readings(Some(i32::MAX), None);
        assert_eq!(hot, Temperature { min: i32::MAX, max: i32::MAX });
        assert_eq!(Temperature::default().average(), 50.0);
    }

    #[test]
    fn unknown_structure_reads_zero() {
        let c: Coordinates = "1:1:1".parse().unwrap();
        let site = SiteSnapshot::new("1", "Home", c).with_level(1, 12);
        assert_eq!(site.mine_level(Resource::Metal), 12);
        assert_eq!(site.mine_level(Resource::Crystal), 0);
        assert_eq!(site.level(99_999), 0);
    }

    #[test]
    fn lifeform_technology_ids() {
        assert_eq!(LifeformKind::Human.technology_in_slot(2), TechId(11202));
        assert_eq!(LifeformKind::Kaelesh.technology_in_slot(11), TechId(14211));
    }

    #[test]
    fn triple_ops() {
        let a = ResourceTriple::new(1.0, 2.0, 3.0);
        let mut b = a + ResourceTriple::splat(1.0);
        assert_eq!(b, ResourceTriple::new(2.0, 3.0, 4.0));
        b += a;
        assert_eq!(*b.get(Resource::Deuterium), 7.0);
        assert_eq!(a.weighted_sum(&ResourceTriple::new(1.0, 1.5, 3.0)), 13.0);
        assert_eq!(a.map(|v| v * 2.0).crystal, 4.0);
    }

    #[test]
    fn site_serde_roundtrip() {
        let c: Coordinates = "2:100:7".parse().unwrap();
        let site = SiteSnapshot::new("33", "Colony", c)
            .with_level(1, 20)
            .with_temperature(Temperature::from_readings(Some(-10), Some(30)));
        let s = serde_json::to_string(&site).unwrap();
        let back: SiteSnapshot = serde_json::from_str(&s).unwrap();
        assert_eq!(back, site);
    }

    proptest! {
        #[test]
        fn temperature_range_is_ordered(a in -200i32..300, b in -200i32..300) {
            let t = Temperature::from_readings(Some(a), Some(b));
            prop_assert!(t.min <= t.max);
            prop_assert_eq!(t.average(), (a as f64 + b as f64) / 2.0);
        }

        #[test]
        fn coordinates_display_parses_back(g in 1u16..10, s in 1u16..500, p in 1u8..=15) {
            let c = Coordinates { galaxy: g, system: s, position: p };
            prop_assert_eq!(c.to_string().parse::<Coordinates>().unwrap(), c);
        }
    }
}
