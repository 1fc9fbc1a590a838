//! Bonus aggregation across research, lifeform buildings, lifeform
//! technologies and board position.

use roi_catalog::BonusCatalog;
use roi_core::{
    LifeformKind, Resource, ResourceTriple, SiteId, SiteSnapshot, TechAssignmentConfig,
    MAX_TECH_LEVEL,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::EngineError;

/// How to pick the active lifeform when several tier-1 markers share the
/// highest level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeformTieBreak {
    /// Earliest kind in `LifeformKind::ALL` order wins.
    #[default]
    FirstDeclared,
    /// Latest kind in `LifeformKind::ALL` order wins.
    LastDeclared,
}

/// Active lifeform of a site: the kind whose tier-1 marker has the highest
/// non-zero level. `None` when every marker is 0.
pub fn detect_lifeform(
    site: &SiteSnapshot,
    catalog: &BonusCatalog,
    tie_break: LifeformTieBreak,
) -> Option<LifeformKind> {
    let mut best: Option<(LifeformKind, u32)> = None;
    for kind in LifeformKind::ALL {
        let Some(def) = catalog.lifeform(kind) else {
            continue;
        };
        let level = site.level(def.tier1_marker);
        if level == 0 {
            continue;
        }
        let replace = match best {
            None => true,
            Some((_, top)) if level > top => true,
            Some((_, top)) if level == top => tie_break == LifeformTieBreak::LastDeclared,
            Some(_) => false,
        };
        if replace {
            best = Some((kind, level));
        }
    }
    best.map(|(kind, _)| kind)
}

/// Account-wide research bonus: `level × coefficient` per resource.
pub fn research_bonus(level: u32, catalog: &BonusCatalog) -> ResourceTriple<f64> {
    catalog.research.per_level_pct.map(|c| c * level as f64)
}

/// Building bonus of a site for its active lifeform.
pub fn building_bonus(
    site: &SiteSnapshot,
    catalog: &BonusCatalog,
    lifeform: Option<LifeformKind>,
) -> ResourceTriple<f64> {
    let mut pct: ResourceTriple<f64> = ResourceTriple::ZERO;
    let Some(kind) = lifeform else {
        return pct;
    };
    for rule in catalog.buildings_for(kind) {
        let level = site.level(rule.structure);
        if level > 0 {
            *pct.get_mut(rule.resource) += level as f64 * rule.per_level_pct;
        }
    }
    pct
}

/// Rejects slot numbers the catalog does not know and levels above the maximum.
pub fn validate_assignments(
    techs: &TechAssignmentConfig,
    catalog: &BonusCatalog,
) -> Result<(), EngineError> {
    for (site, slots) in &techs.sites {
        for (&slot, a) in slots {
            if catalog.slot(slot).is_none() {
                return Err(EngineError::UnknownSlot {
                    site: site.clone(),
                    slot,
                });
            }
            if a.level > MAX_TECH_LEVEL {
                return Err(EngineError::TechLevelOutOfRange {
                    site: site.clone(),
                    slot,
                    level: a.level,
                });
            }
        }
    }
    Ok(())
}

/// Technology bonus of one site. Assumes `validate_assignments` passed.
///
/// Empty slots, level 0 and technologies the catalog does not define for
/// the slot contribute nothing.
pub fn technology_bonus(
    site: &SiteId,
    techs: &TechAssignmentConfig,
    catalog: &BonusCatalog,
) -> ResourceTriple<f64> {
    let mut pct: ResourceTriple<f64> = ResourceTriple::ZERO;
    let Some(slots) = techs.slots(site) else {
        return pct;
    };
    for (&slot, assignment) in slots {
        let Some(id) = assignment.technology_id else {
            continue;
        };
        if assignment.level == 0 {
            continue;
        }
        if !catalog.slot(slot).is_some_and(|s| s.allows(id)) {
            warn!(%site, slot, technology = %id, "technology not offered in this slot, ignored");
            continue;
        }
        let Some(def) = catalog.technology(id) else {
            debug!(%site, slot, technology = %id, "technology has no production effect");
            continue;
        };
        let level = assignment.level as f64;
        for r in Resource::ALL {
            *pct.get_mut(r) += level * def.per_level_pct.get(r);
        }
    }
    pct
}

/// Per-site bonuses. Research is account-global and lives in [`AccountBonuses`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteBonuses {
    pub lifeform: Option<LifeformKind>,
    pub buildings: ResourceTriple<f64>,
    pub technologies: ResourceTriple<f64>,
    /// Folded into base production, never added to the percentages.
    pub position: ResourceTriple<f64>,
}

impl SiteBonuses {
    /// Percentage applied on top of the position-adjusted base.
    pub fn site_pct(&self) -> ResourceTriple<f64> {
        self.buildings + self.technologies
    }
}

/// Bonuses for the whole account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountBonuses {
    pub research_level: u32,
    pub research: ResourceTriple<f64>,
    pub sites: BTreeMap<SiteId, SiteBonuses>,
    pub buildings_total: ResourceTriple<f64>,
    pub technologies_total: ResourceTriple<f64>,
}

/// Combines the four bonus layers for a set of sites.
#[derive(Clone, Copy, Debug)]
pub struct BonusAggregator<'a> {
    catalog: &'a BonusCatalog,
    tie_break: LifeformTieBreak,
}

impl<'a> BonusAggregator<'a> {
    pub fn new(catalog: &'a BonusCatalog, tie_break: LifeformTieBreak) -> Self {
        Self { catalog, tie_break }
    }

    /// Research level read from the sites: the highest reading among
    /// primary sites, 0 when none carries one.
    pub fn research_level_of(&self, sites: &[SiteSnapshot]) -> u32 {
        sites
            .iter()
            .filter(|s| s.is_primary())
            .map(|s| s.level(self.catalog.research.structure))
            .max()
            .unwrap_or(0)
    }

    /// Bonuses of one primary site.
    pub fn site(&self, site: &SiteSnapshot, techs: &TechAssignmentConfig) -> SiteBonuses {
        let lifeform = detect_lifeform(site, self.catalog, self.tie_break);
        let bonuses = SiteBonuses {
            lifeform,
            buildings: building_bonus(site, self.catalog, lifeform),
            technologies: technology_bonus(&site.id, techs, self.catalog),
            position: self.catalog.position_pct(site.coordinates.position),
        };
        debug!(site = %site.id, ?lifeform, pct = ?bonuses.site_pct(), "site bonuses");
        bonuses
    }

    /// Bonuses of every primary site plus account totals.
    ///
    /// The tech config is validated first; secondary bodies are skipped.
    pub fn aggregate(
        &self,
        sites: &[SiteSnapshot],
        techs: &TechAssignmentConfig,
        research_level: u32,
    ) -> Result<AccountBonuses, EngineError> {
        validate_assignments(techs, self.catalog)?;
        let mut out = AccountBonuses {
            research_level,
            research: research_bonus(research_level, self.catalog),
            sites: BTreeMap::new(),
            buildings_total: ResourceTriple::ZERO,
            technologies_total: ResourceTriple::ZERO,
        };
        for site in sites.iter().filter(|s| s.is_primary()) {
            let b = self.site(site, techs);
            out.buildings_total += b.buildings;
            out.technologies_total += b.technologies;
            if out.sites.insert(site.id.clone(), b).is_some() {
                return Err(EngineError::DuplicateSite(site.id.clone()));
            }
        }
        Ok(out)
    }
}
