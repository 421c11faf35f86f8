//! # towerloc-types
//!
//! Shared plain-data records for the Towerloc cell-tower localization suite.
//!
//! These types are used by:
//! - `towerloc-core`: the estimation core consumes `Observation`s and
//!   produces `Estimate`s / `TrackingSnapshot`s
//! - `towerloc-simulator`: generates synthetic observation logs and emits
//!   JSON accuracy reports built from these records
//!
//! ## Coordinate Conventions
//!
//! - **Geographic**: WGS84 latitude/longitude in decimal degrees
//! - **UTM**: zoned metric easting/northing (see `towerloc-core::utm`);
//!   southern hemisphere carries the 10 000 000 m false northing
//! - **Tangent plane**: local equirectangular meters, x = east, y = north,
//!   centered at the observation centroid (batch estimation only)
//!
//! All records here are inert values: no I/O, no interior state.

use serde::{Deserialize, Serialize};

// ── Observation ───────────────────────────────────────────────────────────────

/// One sampled cell measurement from the acquisition layer.
///
/// Immutable once created. Ill-formed records (non-finite position) are
/// dropped at the estimation boundary, never repaired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Monotonic sample timestamp, milliseconds
    pub timestamp_ms: i64,
    /// WGS84 latitude of the observer, degrees
    pub lat_deg: f64,
    /// WGS84 longitude of the observer, degrees
    pub lon_deg: f64,
    /// Received signal strength, dBm. Typical range −140..−20.
    pub rssi_dbm: i32,
    /// Opaque cell identifier (MCC/MNC/LAC/CID string or similar)
    pub cell_id: String,
    /// Opaque radio technology tag ("LTE", "NR", ...)
    pub technology: String,
}

impl Observation {
    /// True iff the record can enter estimation: finite observer position.
    /// Timestamp and RSSI are integers and therefore always finite.
    pub fn is_well_formed(&self) -> bool {
        self.lat_deg.is_finite() && self.lon_deg.is_finite()
    }

    /// RSSI as a float measurement, dBm
    pub fn rssi(&self) -> f64 {
        f64::from(self.rssi_dbm)
    }
}

// ── Batch estimation configuration ────────────────────────────────────────────

/// Position algorithm run per cell group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMethod {
    /// Power-weighted mean of observer positions
    Centroid,
    /// Pairwise circle-intersection voting with density clustering
    Intersection,
    /// Gauss-Newton weighted least squares on inverted ranges
    Wls,
    /// WLS with MAD outlier rejection and re-solve
    #[default]
    Robust,
}

impl BatchMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "centroid" => Some(Self::Centroid),
            "intersection" => Some(Self::Intersection),
            "wls" => Some(Self::Wls),
            "robust" => Some(Self::Robust),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Centroid => "centroid",
            Self::Intersection => "intersection",
            Self::Wls => "wls",
            Self::Robust => "robust",
        }
    }
}

/// Tuning knobs for the batch estimators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Path-loss exponent η of the inversion model
    pub path_loss_exponent: f64,
    /// Reference received power P₀ at `reference_distance_m`, dBm
    pub reference_rssi_dbm: f64,
    /// Reference distance d_ref of the model, meters
    pub reference_distance_m: f64,
    /// Ball radius for circle-intersection density voting, meters
    pub cluster_bandwidth_m: f64,
    /// Robust WLS rejection gate, in normalized MAD units
    pub outlier_threshold_mad: f64,
    /// Selected algorithm
    pub method: BatchMethod,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            path_loss_exponent: 2.0,
            reference_rssi_dbm: -40.0,
            reference_distance_m: 1.0,
            cluster_bandwidth_m: 150.0,
            outlier_threshold_mad: 2.5,
            method: BatchMethod::Robust,
        }
    }
}

// ── Recursive filter configuration ────────────────────────────────────────────

/// Tuning knobs for the recursive (EKF) tracker.
///
/// Defaults reproduce the production constants; raise `process_noise` for
/// faster adaptation of the propagation parameters at the cost of noisier
/// position tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EkfConfig {
    /// Per-step diagonal process noise q (all four state coordinates)
    pub process_noise: f64,
    /// RSSI measurement variance R, dB²
    pub measurement_variance_db2: f64,
    /// Initial diagonal covariance for all state coordinates
    pub initial_covariance: f64,
    /// Initial reference power P₀ guess, dBm
    pub initial_ref_power_dbm: f64,
    /// Initial path-loss exponent η guess
    pub initial_exponent: f64,
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-5,
            measurement_variance_db2: 9.0,
            initial_covariance: 1000.0,
            initial_ref_power_dbm: -40.0,
            initial_exponent: 3.0,
        }
    }
}

// ── Outputs ───────────────────────────────────────────────────────────────────

/// Batch estimation result for one cell group.
///
/// A cell whose estimation failed still produces an entry, with
/// `lat_deg`/`lon_deg` absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Cell identifier of the group
    pub cell_id: String,
    /// Technology tag taken from the newest observation in the group
    pub technology: String,
    /// Estimated tower latitude, degrees (absent on estimation failure)
    pub lat_deg: Option<f64>,
    /// Estimated tower longitude, degrees (absent on estimation failure)
    pub lon_deg: Option<f64>,
    /// Number of observations the estimator actually consumed
    pub observation_count: usize,
}

impl Estimate {
    /// True iff the estimator produced a position
    pub fn has_fix(&self) -> bool {
        self.lat_deg.is_some() && self.lon_deg.is_some()
    }
}

/// Per-step output of the recursive tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    /// Estimated tower latitude, degrees
    pub lat_deg: f64,
    /// Estimated tower longitude, degrees
    pub lon_deg: f64,
    /// RMS of the position standard deviations √(P₁₁ + P₂₂), meters.
    /// Display figure only; not calibrated to a confidence level.
    pub error_radius_m: f64,
    /// Current reference-power estimate P₀, dBm
    pub ref_power_dbm: f64,
    /// Current path-loss exponent estimate η
    pub path_loss_exponent: f64,
    /// Easting of the last user position fed to the filter, meters
    pub last_user_easting_m: f64,
    /// Northing of the last user position fed to the filter, meters
    pub last_user_northing_m: f64,
    /// Last RSSI measurement fed to the filter, dBm
    pub last_rssi_dbm: f64,
    /// Accepted measurements since (re)initialization
    pub measurement_count: u64,
}
