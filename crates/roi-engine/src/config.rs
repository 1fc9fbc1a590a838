//! Engine parameters, loadable from YAML.

use roi_core::ResourceTriple;
use roi_econ::{validate_weights, DEFAULT_WEIGHTS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::aggregate::LifeformTieBreak;
use crate::EngineError;

/// Account-wide calculation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Server economy speed multiplier.
    pub speed: f64,
    /// Resource weights used to compare costs and gains.
    pub weights: ResourceTriple<f64>,
    /// Pins the research level; read from the sites when absent.
    pub research_level: Option<u32>,
    pub tie_break: LifeformTieBreak,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            weights: DEFAULT_WEIGHTS,
            research_level: None,
            tie_break: LifeformTieBreak::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "speed must be > 0, got {}",
                self.speed
            )));
        }
        validate_weights(&self.weights)?;
        Ok(())
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, EngineError> {
        let cfg: EngineConfig =
            serde_yaml::from_str(text).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::InvalidConfig(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roi_core::Resource;
    use roi_econ::EconError;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.speed, 1.0);
        assert_eq!(cfg.weights, ResourceTriple::new(1.0, 1.5, 3.0));
        assert_eq!(cfg.tie_break, LifeformTieBreak::FirstDeclared);
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = EngineConfig::from_yaml_str("speed: 4\ntie_break: last_declared\n").unwrap();
        assert_eq!(cfg.speed, 4.0);
        assert_eq!(cfg.weights, DEFAULT_WEIGHTS);
        assert_eq!(cfg.tie_break, LifeformTieBreak::LastDeclared);
        assert_eq!(cfg.research_level, None);
    }

    #[test]
    fn custom_weights_and_research() {
        let text = "weights: { metal: 2.0, crystal: 3.0, deuterium: 4.0 }\nresearch_level: 18\n";
        let cfg = EngineConfig::from_yaml_str(text).unwrap();
        assert_eq!(cfg.weights, ResourceTriple::new(2.0, 3.0, 4.0));
        assert_eq!(cfg.research_level, Some(18));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_yaml_str("speed: 0"),
            Err(EngineError::InvalidConfig(_))
        ));
        assert_eq!(
            EngineConfig::from_yaml_str("weights: { metal: 1.0, crystal: -1.0, deuterium: 3.0 }"),
            Err(EngineError::Econ(EconError::InvalidWeight(Resource::Crystal, -1.0)))
        );
        assert!(EngineConfig::from_yaml_str("speed: [1, 2]").is_err());
    }
}
