#![deny(warnings)]

//! Mine production and upgrade cost curves.
//!
//! This crate provides the bonus-free building blocks of the ROI engine:
//! - Base hourly production of a mine at a given level
//! - Resource cost of raising a mine to a given level
//! - Conversion of a cost vector into one comparable unit using weights

use roi_core::{Resource, ResourceTriple, Temperature};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// Per-level production growth shared by all mines.
pub const PRODUCTION_GROWTH: f64 = 1.1;

/// Default weights: metal 1, crystal 1.5, deuterium 3.
pub const DEFAULT_WEIGHTS: ResourceTriple<f64> = ResourceTriple::new(1.0, 1.5, 3.0);

/// Errors produced by the economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Costs start at level 1; level 0 is "not built".
    #[error("no cost is defined for level {0}; the first buildable level is 1")]
    UndefinedLevel(u32),
    /// Weights must be finite and strictly positive.
    #[error("invalid weight for {0}: {1}")]
    InvalidWeight(Resource, f64),
}

/// Geometric cost curve: `base × factor^(level-1)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostCurve {
    pub base: ResourceTriple<f64>,
    pub factor: f64,
}

impl CostCurve {
    pub const METAL_MINE: CostCurve = CostCurve {
        base: ResourceTriple::new(60.0, 15.0, 0.0),
        factor: 1.5,
    };
    pub const CRYSTAL_MINE: CostCurve = CostCurve {
        base: ResourceTriple::new(48.0, 24.0, 0.0),
        factor: 1.6,
    };
    pub const DEUTERIUM_SYNTHESIZER: CostCurve = CostCurve {
        base: ResourceTriple::new(225.0, 75.0, 0.0),
        factor: 1.5,
    };

    pub const fn for_mine(resource: Resource) -> CostCurve {
        match resource {
            Resource::Metal => Self::METAL_MINE,
            Resource::Crystal => Self::CRYSTAL_MINE,
            Resource::Deuterium => Self::DEUTERIUM_SYNTHESIZER,
        }
    }

    pub fn at(&self, level: u32) -> Result<ResourceTriple<f64>, EconError> {
        if level == 0 {
            return Err(EconError::UndefinedLevel(level));
        }
        let exponent = i32::try_from(level - 1).unwrap_or(i32::MAX);
        let scale = self.factor.powi(exponent);
        // Keep zero components at zero when the scale overflows.
        Ok(self.base.map(|b| if b == 0.0 { 0.0 } else { b * scale }))
    }
}

/// Production constant `K` of the level curve `K × L × 1.1^L`.
pub const fn production_constant(resource: Resource) -> f64 {
    match resource {
        Resource::Metal => 30.0,
        Resource::Crystal => 20.0,
        Resource::Deuterium => 10.0,
    }
}

/// Temperature multiplier of the deuterium synthesizer: `1.36 - 0.004 × T_avg`.
///
/// Clamped at zero so very hot sites never report negative output.
pub fn temperature_factor(average: f64) -> f64 {
    (1.36 - 0.004 * average).max(0.0)
}

/// Base hourly production of a mine, without any bonus, floored.
///
/// Level 0 produces nothing. Deuterium additionally depends on the
/// site's average temperature. Output saturates at `u64::MAX` once the
/// curve leaves the `f64` range (around level 7400), so it is strictly
/// increasing below that point and non-decreasing everywhere.
///
/// Example:
/// let t = Temperature::default();
/// assert_eq!(base_production(Resource::Metal, 10, &t), 778);
pub fn base_production(resource: Resource, level: u32, temperature: &Temperature) -> u64 {
    if level == 0 {
        return 0;
    }
    let l = level as f64;
    let growth = PRODUCTION_GROWTH.powi(i32::try_from(level).unwrap_or(i32::MAX));
    let raw = match resource {
        Resource::Metal | Resource::Crystal => production_constant(resource) * l * growth,
        Resource::Deuterium => {
            production_constant(resource) * l * growth * temperature_factor(temperature.average())
        }
    };
    // NaN only arises from a zero temperature factor times an infinite curve.
    let floored = if raw > 0.0 {
        raw.floor().min(u64::MAX as f64) as u64
    } else {
        0
    };
    trace!(%resource, level, floored, "base production");
    floored
}

/// Resource cost of raising the mine of `resource` to `level`.
///
/// Example:
/// let c = cost_to_reach(Resource::Metal, 1).unwrap();
/// assert_eq!(c, ResourceTriple::new(60.0, 15.0, 0.0));
pub fn cost_to_reach(resource: Resource, level: u32) -> Result<ResourceTriple<f64>, EconError> {
    CostCurve::for_mine(resource).at(level)
}

/// Weighted sum of a cost vector in one comparable unit.
pub fn comparable_cost(cost: &ResourceTriple<f64>, weights: &ResourceTriple<f64>) -> f64 {
    cost.weighted_sum(weights)
}

/// Weights must be finite and strictly positive.
pub fn validate_weights(weights: &ResourceTriple<f64>) -> Result<(), EconError> {
    for r in Resource::ALL {
        let w = *weights.get(r);
        if !(w.is_finite() && w > 0.0) {
            return Err(EconError::InvalidWeight(r, w));
        }
    }
    Ok(())
}
