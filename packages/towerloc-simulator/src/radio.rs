//! radio.rs — simulated cellular radio measurement chain
//!
//! Turns the ground-truth walk into an observation log:
//! 1. True observer→tower range in the survey tangent plane
//! 2. Log-distance path loss with the configured `(P₀, η)`
//! 3. Gaussian shadowing noise
//! 4. Receiver clamping to the plausible dBm envelope and integer rounding
//!
//! Optional contamination injects wildly-off readings (multipath ghosts) to
//! exercise the robust estimator's rejection gate.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use towerloc_core::pathloss;
use towerloc_core::tangent::PlanePoint;
use towerloc_types::Observation;

use crate::walk::WalkSample;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Propagation environment, populated from `[radio]` in config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct RadioConfig {
    /// True reference power at 1 m, dBm
    pub ref_power_dbm: f64,
    /// True path-loss exponent
    pub path_loss_exponent: f64,
    /// 1-sigma log-normal shadowing, dB
    pub shadowing_sigma_db: f64,
    /// Fraction of readings replaced by a multipath ghost (0 disables)
    pub contamination_rate: f64,
    /// dB added to a contaminated reading's path loss (pushes the inverted
    /// range far out)
    pub contamination_bias_db: f64,
}

/// One simulated transmitter, populated from `[[towers]]` in config.toml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TowerSpec {
    pub cell_id: String,
    pub technology: String,
    /// Tower position in the survey plane, meters east of center
    pub east_m: f64,
    /// Tower position in the survey plane, meters north of center
    pub north_m: f64,
}

impl TowerSpec {
    pub fn position(&self) -> PlanePoint {
        PlanePoint::new(self.east_m, self.north_m)
    }
}

// ── Measurement generation ────────────────────────────────────────────────────

/// Simulate one RSSI reading for a true range, integer dBm.
pub fn measure(range_m: f64, cfg: &RadioConfig, rng: &mut impl Rng) -> i32 {
    let shadowing = Normal::new(0.0, cfg.shadowing_sigma_db.max(0.0)).expect("finite sigma");
    let mut rssi = pathloss::rssi_at(
        range_m.max(pathloss::MIN_DISTANCE_M),
        cfg.path_loss_exponent,
        cfg.ref_power_dbm,
        1.0,
    ) + shadowing.sample(rng);

    if cfg.contamination_rate > 0.0 && rng.gen_bool(cfg.contamination_rate.min(1.0)) {
        rssi -= cfg.contamination_bias_db;
    }

    rssi.clamp(pathloss::MIN_RSSI_DBM, pathloss::MAX_RSSI_DBM)
        .round() as i32
}

/// Full observation log: every walk sample hears every tower.
pub fn observe_walk(
    walk: &[WalkSample],
    towers: &[TowerSpec],
    cfg: &RadioConfig,
    rng: &mut impl Rng,
) -> Vec<Observation> {
    let mut log = Vec::with_capacity(walk.len() * towers.len());
    for sample in walk {
        for tower in towers {
            let range = sample.true_point.dist(&tower.position());
            log.push(Observation {
                timestamp_ms: sample.timestamp_ms,
                lat_deg: sample.lat_deg,
                lon_deg: sample.lon_deg,
                rssi_dbm: measure(range, cfg, rng),
                cell_id: tower.cell_id.clone(),
                technology: tower.technology.clone(),
            });
        }
    }
    log
}
