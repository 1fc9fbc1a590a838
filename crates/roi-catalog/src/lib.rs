#![deny(warnings)]

//! Bonus reference data: lifeform buildings, technologies, tech slots,
//! research coefficients and position bonuses.
//!
//! The catalog is plain data handed to the engine. Universes with
//! different rules load their own table from YAML instead of patching a
//! global one.

use roi_core::{LifeformKind, Resource, ResourceTriple, TechId, MAX_POSITION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Number of tech slots in the standard catalog.
pub const STANDARD_SLOT_COUNT: u8 = 11;

/// A lifeform and the tier-1 structure used to detect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeformDef {
    pub kind: LifeformKind,
    pub tier1_marker: u32,
}

/// `level × per_level_pct` added to `resource` while `lifeform` is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingBonusRule {
    pub lifeform: LifeformKind,
    pub structure: u32,
    pub name: String,
    pub resource: Resource,
    pub per_level_pct: f64,
}

/// A lifeform technology and what each level adds per resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyDef {
    pub id: TechId,
    pub name: String,
    pub per_level_pct: ResourceTriple<f64>,
}

/// A numbered slot and the technologies that may occupy it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechSlotDef {
    pub slot: u8,
    pub technologies: Vec<TechId>,
}

impl TechSlotDef {
    /// Slot offering the technology of every lifeform at this number.
    pub fn standard(slot: u8) -> Self {
        Self {
            slot,
            technologies: LifeformKind::ALL
                .iter()
                .map(|k| k.technology_in_slot(slot))
                .collect(),
        }
    }

    pub fn allows(&self, id: TechId) -> bool {
        self.technologies.contains(&id)
    }
}

/// Account research that boosts every mine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchDef {
    pub structure: u32,
    pub per_level_pct: ResourceTriple<f64>,
}

/// Production bonus of a board position, folded into base production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionBonus {
    pub position: u8,
    pub pct: ResourceTriple<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("coefficient for {0} must be finite and >= 0")]
    InvalidCoefficient(String),
    #[error("lifeform {0} declared {1} times")]
    LifeformCount(LifeformKind, usize),
    #[error("duplicate tier-1 marker {0}")]
    DuplicateMarker(u32),
    #[error("duplicate tech slot {0}")]
    DuplicateSlot(u8),
    #[error("duplicate technology {0}")]
    DuplicateTechnology(TechId),
    #[error("position {0} is out of range [1, 15]")]
    PositionOutOfRange(u8),
    #[error("duplicate position {0}")]
    DuplicatePosition(u8),
    #[error("invalid catalog document: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::Io(e.to_string())
    }
}

/// Immutable lookup tables used by the bonus aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusCatalog {
    pub lifeforms: Vec<LifeformDef>,
    pub buildings: Vec<BuildingBonusRule>,
    pub technologies: Vec<TechnologyDef>,
    pub slots: Vec<TechSlotDef>,
    pub research: ResearchDef,
    pub positions: Vec<PositionBonus>,
}

impl Default for BonusCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn building(
    lifeform: LifeformKind,
    structure: u32,
    name: &str,
    resource: Resource,
    per_level_pct: f64,
) -> BuildingBonusRule {
    BuildingBonusRule {
        lifeform,
        structure,
        name: name.to_string(),
        resource,
        per_level_pct,
    }
}

fn technology(id: u32, name: &str, per_level_pct: ResourceTriple<f64>) -> TechnologyDef {
    TechnologyDef {
        id: TechId(id),
        name: name.to_string(),
        per_level_pct,
    }
}

fn only(resource: Resource, pct: f64) -> ResourceTriple<f64> {
    let mut t: ResourceTriple<f64> = ResourceTriple::ZERO;
    *t.get_mut(resource) = pct;
    t
}

impl BonusCatalog {
    /// Rules of the live game as of lifeform release.
    pub fn standard() -> Self {
        use LifeformKind::*;
        use Resource::*;

        let lifeforms = vec![
            LifeformDef {
                kind: Human,
                tier1_marker: 11101,
            },
            LifeformDef {
                kind: Rocktal,
                tier1_marker: 12101,
            },
            LifeformDef {
                kind: Mecha,
                tier1_marker: 13101,
            },
            LifeformDef {
                kind: Kaelesh,
                tier1_marker: 14101,
            },
        ];
        let buildings = vec![
            building(Human, 11103, "High Energy Smelting", Metal, 1.5),
            building(Rocktal, 12103, "Magma Forge", Metal, 2.0),
            building(Rocktal, 12104, "Crystal Refinery", Crystal, 2.0),
            building(Rocktal, 12105, "Deuterium Synthesiser", Deuterium, 2.0),
            building(Mecha, 13103, "High-Performance Synthesiser", Deuterium, 2.0),
        ];
        let technologies = vec![
            technology(11202, "High-Performance Extractors", ResourceTriple::splat(0.06)),
            technology(11208, "Enhanced Production Technologies", ResourceTriple::splat(0.06)),
            technology(12202, "Acoustic Scanning", only(Crystal, 0.08)),
            technology(12203, "High Energy Pump Systems", only(Deuterium, 0.08)),
            technology(12205, "Magma-Powered Production", ResourceTriple::splat(0.08)),
            technology(12207, "Depth Sounding", only(Metal, 0.08)),
            technology(13202, "Catalyser Technology", only(Deuterium, 0.08)),
            technology(13206, "Sulphide Process", only(Deuterium, 0.08)),
        ];
        let slots = (1..=STANDARD_SLOT_COUNT).map(TechSlotDef::standard).collect();
        let research = ResearchDef {
            structure: 122,
            per_level_pct: ResourceTriple::new(1.0, 0.66, 0.33),
        };
        let positions = (1..=MAX_POSITION)
            .map(|position| {
                let pct = match position {
                    1 => only(Crystal, 40.0),
                    2 => only(Crystal, 30.0),
                    3 => only(Crystal, 20.0),
                    6 | 10 => only(Metal, 17.0),
                    7 | 9 => only(Metal, 23.0),
                    8 => only(Metal, 35.0),
                    _ => ResourceTriple::ZERO,
                };
                PositionBonus { position, pct }
            })
            .collect();

        Self {
            lifeforms,
            buildings,
            technologies,
            slots,
            research,
            positions,
        }
    }

    /// Parses and validates a YAML catalog.
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let catalog: BonusCatalog =
            serde_yaml::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_yaml_str(&text)?;
        info!(
            path = %path.as_ref().display(),
            buildings = catalog.buildings.len(),
            technologies = catalog.technologies.len(),
            slots = catalog.slots.len(),
            "loaded bonus catalog"
        );
        Ok(catalog)
    }

    pub fn to_yaml_string(&self) -> Result<String, CatalogError> {
        serde_yaml::to_string(self).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Checks coefficients and uniqueness of every key the engine looks up.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for kind in LifeformKind::ALL {
            let n = self.lifeforms.iter().filter(|l| l.kind == kind).count();
            if n != 1 {
                return Err(CatalogError::LifeformCount(kind, n));
            }
        }
        let mut markers = BTreeSet::new();
        for l in &self.lifeforms {
            if !markers.insert(l.tier1_marker) {
                return Err(CatalogError::DuplicateMarker(l.tier1_marker));
            }
        }
        for b in &self.buildings {
            check_pct(&b.name, b.per_level_pct)?;
        }
        let mut techs = BTreeSet::new();
        for t in &self.technologies {
            if !techs.insert(t.id) {
                return Err(CatalogError::DuplicateTechnology(t.id));
            }
            check_triple(&t.name, &t.per_level_pct)?;
        }
        let mut slots = BTreeSet::new();
        for s in &self.slots {
            if !slots.insert(s.slot) {
                return Err(CatalogError::DuplicateSlot(s.slot));
            }
        }
        check_triple("research", &self.research.per_level_pct)?;
        let mut positions = BTreeSet::new();
        for p in &self.positions {
            if !(1..=MAX_POSITION).contains(&p.position) {
                return Err(CatalogError::PositionOutOfRange(p.position));
            }
            if !positions.insert(p.position) {
                return Err(CatalogError::DuplicatePosition(p.position));
            }
            check_triple(&format!("position {}", p.position), &p.pct)?;
        }
        Ok(())
    }

    pub fn lifeform(&self, kind: LifeformKind) -> Option<&LifeformDef> {
        self.lifeforms.iter().find(|l| l.kind == kind)
    }

    /// Building rules that apply while `kind` is active.
    pub fn buildings_for(&self, kind: LifeformKind) -> impl Iterator<Item = &BuildingBonusRule> {
        self.buildings.iter().filter(move |b| b.lifeform == kind)
    }

    pub fn technology(&self, id: TechId) -> Option<&TechnologyDef> {
        self.technologies.iter().find(|t| t.id == id)
    }

    pub fn slot(&self, slot: u8) -> Option<&TechSlotDef> {
        self.slots.iter().find(|s| s.slot == slot)
    }

    /// Position bonus percentages; zero for positions without an entry.
    pub fn position_pct(&self, position: u8) -> ResourceTriple<f64> {
        self.positions
            .iter()
            .find(|p| p.position == position)
            .map(|p| p.pct)
            .unwrap_or_default()
    }
}

fn check_pct(what: &str, v: f64) -> Result<(), CatalogError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(CatalogError::InvalidCoefficient(what.to_string()))
    }
}

fn check_triple(what: &str, t: &ResourceTriple<f64>) -> Result<(), CatalogError> {
    for r in Resource::ALL {
        check_pct(what, *t.get(r))?;
    }
    Ok(())
}
