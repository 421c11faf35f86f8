//! scenarios.rs — propagation scenario presets
//!
//! Each preset overrides the radio environment to exercise one estimator
//! behavior: the clean baseline, urban shadowing, and contaminated logs that
//! should trip the robust rejection gate.

use crate::radio::RadioConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Free-space-ish propagation, no shadowing
    Clean,
    /// Dense-urban exponent with heavy shadowing
    Urban,
    /// Urban plus multipath ghosts on a fraction of readings
    Contaminated,
}

impl Scenario {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "clean" => Some(Self::Clean),
            "urban" => Some(Self::Urban),
            "contaminated" => Some(Self::Contaminated),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Urban => "urban",
            Self::Contaminated => "contaminated",
        }
    }

    /// Apply the preset on top of the configured radio baseline.
    pub fn apply(&self, cfg: &mut RadioConfig) {
        match self {
            Self::Clean => {
                cfg.path_loss_exponent = 2.0;
                cfg.shadowing_sigma_db = 0.0;
                cfg.contamination_rate = 0.0;
            }
            Self::Urban => {
                cfg.path_loss_exponent = 3.2;
                cfg.shadowing_sigma_db = 6.0;
                cfg.contamination_rate = 0.0;
            }
            Self::Contaminated => {
                cfg.path_loss_exponent = 3.2;
                cfg.shadowing_sigma_db = 6.0;
                cfg.contamination_rate = 0.08;
                cfg.contamination_bias_db = 35.0;
            }
        }
    }
}
