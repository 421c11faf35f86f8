//! pathloss.rs — log-distance propagation model
//!
//! Canonical model: `RSSI(d) = P₀ − 10η·log₁₀(d / d_ref)`, with P₀ the
//! received power at the reference distance. Inversion recovers a range from
//! a measured RSSI. All inputs are clamped into the model's useful envelope
//! so a noisy reading yields finite geometry instead of a failure.

/// Exponent floor: a degenerate configuration (η → 0) would otherwise send
/// the inversion exponent to infinity.
pub const MIN_EXPONENT: f64 = 0.1;

/// Distances outside this interval mean the RSSI is beyond the model's
/// usefulness; the inversion pins them to the nearer edge, meters.
pub const MIN_DISTANCE_M: f64 = 1.0;
pub const MAX_DISTANCE_M: f64 = 50_000.0;

/// Plausible RSSI envelope for terrestrial cellular hardware, dBm
pub const MIN_RSSI_DBM: f64 = -140.0;
pub const MAX_RSSI_DBM: f64 = -20.0;

/// Expected RSSI at a distance, dBm. No clamping: this is the forward model
/// used for prediction and simulation.
pub fn rssi_at(distance_m: f64, eta: f64, ref_rssi_dbm: f64, ref_dist_m: f64) -> f64 {
    ref_rssi_dbm - 10.0 * eta * (distance_m / ref_dist_m).log10()
}

/// Invert a measured RSSI into a range, meters. Always finite and strictly
/// positive: η is floored at [`MIN_EXPONENT`], the RSSI is clamped into
/// [`MIN_RSSI_DBM`]..[`MAX_RSSI_DBM`], and the result is clamped into
/// [`MIN_DISTANCE_M`]..[`MAX_DISTANCE_M`].
pub fn distance_from_rssi(rssi_dbm: f64, eta: f64, ref_rssi_dbm: f64, ref_dist_m: f64) -> f64 {
    let eta = eta.max(MIN_EXPONENT);
    let rssi = rssi_dbm.clamp(MIN_RSSI_DBM, MAX_RSSI_DBM);
    let d = ref_dist_m * 10f64.powf((ref_rssi_dbm - rssi) / (10.0 * eta));
    d.clamp(MIN_DISTANCE_M, MAX_DISTANCE_M)
}
