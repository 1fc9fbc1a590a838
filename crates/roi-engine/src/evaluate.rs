//! Payback time of the next mine level.

use roi_core::{Coordinates, Resource, ResourceTriple, SiteId, SiteSnapshot, Temperature};
use roi_econ::{base_production, comparable_cost, cost_to_reach};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::EngineError;

/// Hours per day used for `Payback::Hours::days`.
pub const HOURS_PER_DAY: f64 = 24.0;

/// Percentages feeding one evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BonusContext {
    /// Account-wide research bonus.
    pub global: ResourceTriple<f64>,
    /// Buildings plus technologies of the site.
    pub site: ResourceTriple<f64>,
    /// Position bonus, applied to raw base production.
    pub position: ResourceTriple<f64>,
}

/// Account-wide parameters of an evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalParams {
    pub speed: f64,
    pub weights: ResourceTriple<f64>,
}

/// Hourly production at one level, stage by stage.
///
/// raw -> position-adjusted base -> bonus-adjusted -> speed-adjusted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionStages {
    pub raw: u64,
    pub position_adjusted: f64,
    pub with_bonuses: f64,
    pub effective: f64,
}

impl ProductionStages {
    pub fn compute(
        resource: Resource,
        level: u32,
        temperature: &Temperature,
        bonuses: &BonusContext,
        speed: f64,
    ) -> Self {
        let raw = base_production(resource, level, temperature);
        let position_adjusted = raw as f64 * (1.0 + bonuses.position.get(resource) / 100.0);
        let pct = bonuses.global.get(resource) + bonuses.site.get(resource);
        let with_bonuses = position_adjusted * (1.0 + pct / 100.0);
        Self {
            raw,
            position_adjusted,
            with_bonuses,
            effective: with_bonuses * speed,
        }
    }
}

/// Time until an upgrade pays for itself.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payback {
    Hours { hours: f64, days: f64 },
    /// The upgrade never pays back: the production gain is not positive.
    Never,
}

impl Payback {
    fn from_ratio(cost: f64, gain: f64) -> Self {
        if !(gain > 0.0 && gain.is_finite()) {
            return Payback::Never;
        }
        let hours = cost / gain;
        if !hours.is_finite() || hours < 0.0 {
            return Payback::Never;
        }
        Payback::Hours {
            hours,
            days: hours / HOURS_PER_DAY,
        }
    }

    pub fn hours(&self) -> Option<f64> {
        match self {
            Payback::Hours { hours, .. } => Some(*hours),
            Payback::Never => None,
        }
    }

    pub fn days(&self) -> Option<f64> {
        match self {
            Payback::Hours { days, .. } => Some(*days),
            Payback::Never => None,
        }
    }
}

/// ROI of the next level of one mine on one site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiResult {
    pub site_id: SiteId,
    pub site_name: String,
    pub coordinates: Coordinates,
    pub resource: Resource,
    pub current_level: u32,
    pub next_level: u32,
    /// Cost of `next_level` per raw resource.
    pub cost: ResourceTriple<f64>,
    pub current: ProductionStages,
    pub next: ProductionStages,
    /// Effective hourly gain of the upgrade.
    pub production_delta: f64,
    pub cost_comparable: f64,
    pub payback: Payback,
}

impl RoiResult {
    pub fn current_production(&self) -> f64 {
        self.current.effective
    }

    pub fn next_production(&self) -> f64 {
        self.next.effective
    }
}

/// Evaluates the upgrade of `resource`'s mine on `site` to the next level.
pub fn evaluate(
    site: &SiteSnapshot,
    resource: Resource,
    bonuses: &BonusContext,
    params: &EvalParams,
) -> Result<RoiResult, EngineError> {
    let current_level = site.mine_level(resource);
    let next_level = current_level
        .checked_add(1)
        .ok_or(EngineError::LevelOverflow(current_level))?;

    let current = ProductionStages::compute(
        resource,
        current_level,
        &site.temperature,
        bonuses,
        params.speed,
    );
    let next = ProductionStages::compute(
        resource,
        next_level,
        &site.temperature,
        bonuses,
        params.speed,
    );
    let production_delta = next.effective - current.effective;

    let cost = cost_to_reach(resource, next_level)?;
    let cost_comparable = comparable_cost(&cost, &params.weights);
    let gain = production_delta * params.weights.get(resource);
    let payback = Payback::from_ratio(cost_comparable, gain);
    if payback == Payback::Never {
        warn!(site = %site.id, %resource, current_level, production_delta, "upgrade never pays back");
    } else {
        debug!(site = %site.id, %resource, current_level, ?payback, "evaluated upgrade");
    }

    Ok(RoiResult {
        site_id: site.id.clone(),
        site_name: site.name.clone(),
        coordinates: site.coordinates,
        resource,
        current_level,
        next_level,
        cost,
        current,
        next,
        production_delta,
        cost_comparable,
        payback,
    })
}
