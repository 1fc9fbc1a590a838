#![deny(warnings)]

//! Bonus composition and payback evaluation for mine upgrades.
//!
//! The engine is pure: every call recomputes from the given sites, tech
//! assignments, catalog and config. An [`Engine`] can be shared across
//! threads and evaluated concurrently.

pub mod aggregate;
pub mod config;
pub mod evaluate;

use roi_catalog::{BonusCatalog, CatalogError};
use roi_core::{Resource, ResourceTriple, SiteId, SiteSnapshot, TechAssignmentConfig};
use roi_econ::EconError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;
use tracing::info;

pub use aggregate::{AccountBonuses, BonusAggregator, LifeformTieBreak, SiteBonuses};
pub use config::EngineConfig;
pub use evaluate::{evaluate, BonusContext, EvalParams, Payback, ProductionStages, RoiResult};

/// Errors surfaced by the engine.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("site {site} uses unknown tech slot {slot}")]
    UnknownSlot { site: SiteId, slot: u8 },
    #[error("site {site} slot {slot}: tech level {level} exceeds {max}", max = roi_core::MAX_TECH_LEVEL)]
    TechLevelOutOfRange { site: SiteId, slot: u8, level: u8 },
    #[error("site {0} appears more than once")]
    DuplicateSite(SiteId),
    #[error("mine level {0} cannot be raised further")]
    LevelOverflow(u32),
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Econ(#[from] EconError),
}

/// Account-wide hourly production at current levels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionTotals {
    pub current: ResourceTriple<f64>,
    /// Hourly production if every mine were raised one level.
    pub next: ResourceTriple<f64>,
}

/// Result of one account evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountReport {
    pub bonuses: AccountBonuses,
    /// One entry per (primary site, resource), in input order.
    pub results: Vec<RoiResult>,
    pub totals: ProductionTotals,
}

impl AccountReport {
    /// Results ordered by payback, fastest first.
    pub fn ranked(&self) -> Vec<&RoiResult> {
        rank_by_payback(&self.results)
    }
}

/// Orders results by payback time; `Payback::Never` sorts last.
pub fn rank_by_payback(results: &[RoiResult]) -> Vec<&RoiResult> {
    let mut ranked: Vec<&RoiResult> = results.iter().collect();
    ranked.sort_by(|a, b| match (a.payback.hours(), b.payback.hours()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ranked
}

/// Validated catalog and config.
#[derive(Clone, Debug)]
pub struct Engine {
    catalog: BonusCatalog,
    config: EngineConfig,
}

impl Engine {
    pub fn new(catalog: BonusCatalog, config: EngineConfig) -> Result<Self, EngineError> {
        catalog.validate()?;
        config.validate()?;
        Ok(Self { catalog, config })
    }

    pub fn catalog(&self) -> &BonusCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn aggregator(&self) -> BonusAggregator<'_> {
        BonusAggregator::new(&self.catalog, self.config.tie_break)
    }

    /// Research level in effect: pinned by config or read from the sites.
    pub fn research_level(&self, sites: &[SiteSnapshot]) -> u32 {
        self.config
            .research_level
            .unwrap_or_else(|| self.aggregator().research_level_of(sites))
    }

    /// Aggregates bonuses and evaluates every mine of every primary site.
    pub fn evaluate(
        &self,
        sites: &[SiteSnapshot],
        techs: &TechAssignmentConfig,
    ) -> Result<AccountReport, EngineError> {
        let research_level = self.research_level(sites);
        let bonuses = self.aggregator().aggregate(sites, techs, research_level)?;
        let params = EvalParams {
            speed: self.config.speed,
            weights: self.config.weights,
        };

        let mut results = Vec::with_capacity(bonuses.sites.len() * Resource::ALL.len());
        let mut totals = ProductionTotals::default();
        for site in sites.iter().filter(|s| s.is_primary()) {
            let Some(site_bonuses) = bonuses.sites.get(&site.id) else {
                continue;
            };
            let ctx = BonusContext {
                global: bonuses.research,
                site: site_bonuses.site_pct(),
                position: site_bonuses.position,
            };
            for resource in Resource::ALL {
                let r = evaluate(site, resource, &ctx, &params)?;
                *totals.current.get_mut(resource) += r.current_production();
                *totals.next.get_mut(resource) += r.next_production();
                results.push(r);
            }
        }
        info!(
            sites = bonuses.sites.len(),
            results = results.len(),
            research_level,
            "evaluated account"
        );
        Ok(AccountReport {
            bonuses,
            results,
            totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roi_core::{Coordinates, SlotAssignment};

    fn planet(id: &str, position: u8) -> SiteSnapshot {
        SiteSnapshot::new(
            id,
            format!("Planet {id}"),
            Coordinates {
                galaxy: 1,
                system: 42,
                position,
            },
        )
    }

    fn engine() -> Engine {
        Engine::new(BonusCatalog::standard(), EngineConfig::default()).unwrap()
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
        assert_send_sync::<AccountReport>();
    }

    #[test]
    fn one_row_per_primary_site_and_resource() {
        let mut moon = planet("3", 8).with_level(1, 5);
        moon.secondary = true;
        let sites = vec![planet("1", 8).with_level(1, 20), planet("2", 2), moon];
        let report = engine().evaluate(&sites, &TechAssignmentConfig::default()).unwrap();
        assert_eq!(report.results.len(), 6);
        assert!(report.results.iter().all(|r| r.site_id != SiteId::from("3")));
        assert_eq!(report.results[0].resource, Resource::Metal);
        assert_eq!(report.results[2].resource, Resource::Deuterium);
    }

    #[test]
    fn composes_all_layers() {
        // Rocktal site at position 8 with Magma Forge 5, research 10,
        // Depth Sounding level 5 in slot 7.
        let site = planet("1", 8)
            .with_level(1, 10)
            .with_level(122, 10)
            .with_level(12101, 2)
            .with_level(12103, 5);
        let mut techs = TechAssignmentConfig::default();
        techs
            .sites
            .entry(SiteId::from("1"))
            .or_default()
            .insert(7, SlotAssignment::new(12207, 5));
        let report = engine().evaluate(&[site], &techs).unwrap();
        let metal = &report.results[0];

        let site_pct = 10.0 + 0.4;
        let expected = 778.0 * 1.35 * (1.0 + (10.0 + site_pct) / 100.0);
        assert!((metal.current_production() - expected).abs() < 1e-9);
        assert_eq!(report.bonuses.research_level, 10);
        assert_eq!(report.totals.current.metal, metal.current_production());
    }

    #[test]
    fn pinned_research_level_wins() {
        let cfg = EngineConfig {
            research_level: Some(3),
            ..EngineConfig::default()
        };
        let e = Engine::new(BonusCatalog::standard(), cfg).unwrap();
        let sites = [planet("1", 4).with_level(122, 20)];
        assert_eq!(e.research_level(&sites), 3);
        assert_eq!(engine().research_level(&sites), 20);
    }

    #[test]
    fn rejects_invalid_tech_config() {
        let mut techs = TechAssignmentConfig::default();
        techs
            .sites
            .entry(SiteId::from("1"))
            .or_default()
            .insert(0, SlotAssignment::new(11200, 1));
        assert_eq!(
            engine().evaluate(&[planet("1", 4)], &techs),
            Err(EngineError::UnknownSlot {
                site: SiteId::from("1"),
                slot: 0
            })
        );
    }

    #[test]
    fn rejects_tech_level_above_max() {
        let techs = TechAssignmentConfig::from_json_str(
            r#"{ "sites": { "1": { "2": { "technologyId": 12202, "level": 21 } } } }"#,
        )
        .unwrap();
        assert_eq!(
            engine().evaluate(&[planet("1", 4)], &techs),
            Err(EngineError::TechLevelOutOfRange {
                site: SiteId::from("1"),
                slot: 2,
                level: 21
            })
        );
    }

    #[test]
    fn null_tech_levels_do_not_block_evaluation() {
        let techs = TechAssignmentConfig::from_json_str(
            r#"{ "sites": { "1": {
                "2": { "technologyId": 12202, "level": null },
                "7": { "technologyId": 12207, "level": "5" }
            } } }"#,
        )
        .unwrap();
        let site = planet("1", 4).with_level(1, 10);
        let report = engine().evaluate(&[site], &techs).unwrap();
        let bonuses = &report.bonuses.sites[&SiteId::from("1")];
        assert!((bonuses.technologies.metal - 0.4).abs() < 1e-9);
        assert_eq!(bonuses.technologies.crystal, 0.0);
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = EngineConfig {
            speed: -1.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(BonusCatalog::standard(), cfg),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn ranking_puts_never_last() {
        let mut hot = planet("2", 4).with_level(3, 5);
        hot.temperature = roi_core::Temperature { min: 500, max: 500 };
        let sites = [planet("1", 8).with_level(1, 30).with_level(2, 5), hot];
        let report = engine().evaluate(&sites, &TechAssignmentConfig::default()).unwrap();
        let ranked = report.ranked();
        assert_eq!(ranked.len(), 6);
        assert_eq!(ranked.last().unwrap().payback, Payback::Never);
        let hours: Vec<f64> = ranked.iter().filter_map(|r| r.payback.hours()).collect();
        assert!(hours.windows(2).all(|w| w[0] <= w[1]));
    }
}
