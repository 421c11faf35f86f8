//! ekf.rs — recursive single-tower tracker
//!
//! Self-calibrating Extended Kalman Filter over the 4-state vector
//! `(x_b, y_b, P₀, η)`: tower easting/northing in a fixed UTM frame plus the
//! two log-distance propagation parameters. One instance tracks one
//! stationary transmitter; measurements are scalar RSSI readings taken at
//! known user positions.
//!
//! The UTM zone and hemisphere are captured at (auto-)initialization and are
//! the filter's frame for the rest of its life — user positions from another
//! frame are rejected, never re-projected. All failure modes degrade to a
//! skipped step with a warning; nothing here panics or returns errors.

use nalgebra::{Matrix4, RowVector4, Vector4};
use tracing::{debug, warn};

use towerloc_types::{EkfConfig, TrackingSnapshot};

use crate::pathloss;
use crate::utm::{self, Hemisphere, UtmCoord};

/// Distance floor for the measurement model, meters. Keeps the Jacobian
/// finite when the user stands on the current estimate.
const MIN_RANGE_M: f64 = 1.0;

struct FilterState {
    /// `(x_b, y_b, P₀, η)`
    x: Vector4<f64>,
    /// Symmetric PSD covariance
    p: Matrix4<f64>,
    zone: u8,
    hemisphere: Hemisphere,
    last_user: (f64, f64),
    last_rssi: f64,
    count: u64,
}

/// Recursive tower position tracker.
///
/// Two states: *Uninitialized* (fresh or after [`reset`](Self::reset)) and
/// *Tracking*. The first [`step`](Self::step) auto-initializes on the
/// incoming user position, so explicit [`initialize`](Self::initialize) is
/// only needed to seed a frame without consuming a measurement.
pub struct TowerTracker {
    config: EkfConfig,
    state: Option<FilterState>,
}

impl Default for TowerTracker {
    fn default() -> Self {
        Self::new(EkfConfig::default())
    }
}

impl TowerTracker {
    pub fn new(config: EkfConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &EkfConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Return to *Uninitialized*; the next step re-initializes.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Enter *Tracking* with the tower hypothesis placed at the user position
    /// and the propagation parameters at their configured priors. Captures
    /// the coordinate's `(zone, hemisphere)` as the filter frame.
    pub fn initialize(&mut self, user: UtmCoord) {
        debug!(
            zone = user.zone,
            hemisphere = %user.hemisphere.letter(),
            "tracker initialized"
        );
        self.state = Some(FilterState {
            x: Vector4::new(
                user.easting_m,
                user.northing_m,
                self.config.initial_ref_power_dbm,
                self.config.initial_exponent,
            ),
            p: Matrix4::from_diagonal_element(self.config.initial_covariance),
            zone: user.zone,
            hemisphere: user.hemisphere,
            last_user: (user.easting_m, user.northing_m),
            last_rssi: f64::NAN,
            count: 0,
        });
    }

    /// One predict-update iteration on a single RSSI measurement.
    ///
    /// Ill-formed inputs and frame mismatches skip the step; a degenerate
    /// innovation variance (possible only after a catastrophic loss of
    /// positive-semidefiniteness) skips it with a warning.
    pub fn step(&mut self, user: UtmCoord, rssi_dbm: f64) {
        if !user.easting_m.is_finite() || !user.northing_m.is_finite() || !rssi_dbm.is_finite() {
            warn!("skipping step: non-finite input");
            return;
        }
        if self.state.is_none() {
            self.initialize(user);
        }
        let Some(fs) = self.state.as_mut() else {
            return;
        };
        if user.zone != fs.zone || user.hemisphere != fs.hemisphere {
            warn!(
                filter_zone = fs.zone,
                input_zone = user.zone,
                "skipping step: user position outside the filter frame"
            );
            return;
        }

        // Predict. Stationary target: the mean carries over, the covariance
        // inflates by the process noise.
        fs.p += Matrix4::from_diagonal_element(self.config.process_noise);

        // Linearize at the prior mean.
        let user_xy = (user.easting_m, user.northing_m);
        let z_pred = predict_rssi(&fs.x, user_xy);
        let h = jacobian(&fs.x, user_xy);

        let s = (h * fs.p * h.transpose())[(0, 0)] + self.config.measurement_variance_db2;
        if s <= 0.0 {
            warn!(s, "skipping step: innovation variance is not positive");
            return;
        }

        let k = fs.p * h.transpose() / s;
        fs.x += k * (rssi_dbm - z_pred);
        fs.p = (Matrix4::identity() - k * h) * fs.p;
        // Symmetrize to keep numerical asymmetry from accumulating.
        fs.p = (fs.p + fs.p.transpose()) * 0.5;

        fs.last_user = user_xy;
        fs.last_rssi = rssi_dbm;
        fs.count += 1;
    }

    /// Current tower estimate in the filter frame, or `None` before
    /// initialization.
    pub fn estimated_position_utm(&self) -> Option<UtmCoord> {
        self.state.as_ref().map(|fs| UtmCoord {
            easting_m: fs.x[0],
            northing_m: fs.x[1],
            zone: fs.zone,
            hemisphere: fs.hemisphere,
        })
    }

    /// Current tower estimate as `(lat_deg, lon_deg)` via the inverse
    /// projection in the captured frame.
    pub fn estimated_position(&self) -> Option<(f64, f64)> {
        self.estimated_position_utm().map(|utm| utm::inverse(&utm))
    }

    /// `√(P₁₁ + P₂₂)`: RMS of the position variances, meters. Display figure
    /// only, not a calibrated confidence radius. Infinite before
    /// initialization.
    pub fn error_radius_m(&self) -> f64 {
        match &self.state {
            Some(fs) => (fs.p[(0, 0)] + fs.p[(1, 1)]).sqrt(),
            None => f64::INFINITY,
        }
    }

    /// Standard deviations of the position components, meters
    pub fn position_uncertainty(&self) -> (f64, f64) {
        match &self.state {
            Some(fs) => (fs.p[(0, 0)].sqrt(), fs.p[(1, 1)].sqrt()),
            None => (f64::INFINITY, f64::INFINITY),
        }
    }

    /// Current `(P₀, η)` estimate; the configured priors before
    /// initialization.
    pub fn path_loss_parameters(&self) -> (f64, f64) {
        match &self.state {
            Some(fs) => (fs.x[2], fs.x[3]),
            None => (
                self.config.initial_ref_power_dbm,
                self.config.initial_exponent,
            ),
        }
    }

    /// Copy of the 4×4 state covariance
    pub fn covariance(&self) -> Option<Matrix4<f64>> {
        self.state.as_ref().map(|fs| fs.p)
    }

    /// Accepted measurements since (re)initialization
    pub fn measurement_count(&self) -> u64 {
        self.state.as_ref().map_or(0, |fs| fs.count)
    }

    /// Full per-step output record, once at least one measurement has been
    /// accepted.
    pub fn snapshot(&self) -> Option<TrackingSnapshot> {
        let fs = self.state.as_ref().filter(|fs| fs.count > 0)?;
        let (lat_deg, lon_deg) = utm::inverse(&UtmCoord {
            easting_m: fs.x[0],
            northing_m: fs.x[1],
            zone: fs.zone,
            hemisphere: fs.hemisphere,
        });
        Some(TrackingSnapshot {
            lat_deg,
            lon_deg,
            error_radius_m: self.error_radius_m(),
            ref_power_dbm: fs.x[2],
            path_loss_exponent: fs.x[3],
            last_user_easting_m: fs.last_user.0,
            last_user_northing_m: fs.last_user.1,
            last_rssi_dbm: fs.last_rssi,
            measurement_count: fs.count,
        })
    }
}

/// Measurement function `h(x)`: expected RSSI at the user position under the
/// current state, with the range floored at [`MIN_RANGE_M`].
fn predict_rssi(x: &Vector4<f64>, user: (f64, f64)) -> f64 {
    let d = range(x, user);
    pathloss::rssi_at(d, x[3], x[2], 1.0)
}

/// Measurement Jacobian `∂h/∂x` at the current state.
fn jacobian(x: &Vector4<f64>, user: (f64, f64)) -> RowVector4<f64> {
    let d = range(x, user);
    let g = -10.0 * x[3] / (std::f64::consts::LN_10 * d * d);
    RowVector4::new(
        g * (x[0] - user.0),
        g * (x[1] - user.1),
        1.0,
        -10.0 * d.log10(),
    )
}

fn range(x: &Vector4<f64>, user: (f64, f64)) -> f64 {
    (x[0] - user.0).hypot(x[1] - user.1).max(MIN_RANGE_M)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
