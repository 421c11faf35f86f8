//! batch.rs — observation grouping and batch estimation dispatch
//!
//! One-shot estimation over an archived observation log: observations are
//! grouped per cell, each group is handed to the configured estimator, and
//! every numerical failure degrades to the centroid. A cell always yields an
//! output record; a cell that defeats even the centroid yields one without a
//! fix.

use std::collections::BTreeMap;

use tracing::debug;

use towerloc_types::{BatchConfig, BatchMethod, Estimate, Observation};

use crate::intersect::solve_intersection;
use crate::multilateration::{solve_robust, solve_wls};
use crate::pathloss::{self, distance_from_rssi};
use crate::tangent::{PlanePoint, TangentPlane};

/// Group a raw observation log by cell identifier.
///
/// Ill-formed records are dropped. Observations sharing a bit-identical
/// `(lat, lon, cell_id)` are collapsed to the one with the latest timestamp.
/// Groups come back sorted by cell id and ordered by timestamp inside, so
/// downstream output is deterministic.
pub fn group_observations(observations: &[Observation]) -> BTreeMap<String, Vec<Observation>> {
    let mut dedup: BTreeMap<(String, u64, u64), Observation> = BTreeMap::new();
    for obs in observations {
        if !obs.is_well_formed() {
            continue;
        }
        let key = (
            obs.cell_id.clone(),
            obs.lat_deg.to_bits(),
            obs.lon_deg.to_bits(),
        );
        match dedup.get(&key) {
            Some(existing) if existing.timestamp_ms >= obs.timestamp_ms => {}
            _ => {
                dedup.insert(key, obs.clone());
            }
        }
    }

    let mut groups: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
    for (_, obs) in dedup {
        groups.entry(obs.cell_id.clone()).or_default().push(obs);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|o| o.timestamp_ms);
    }
    groups
}

/// Drop observations older than the retention window.
pub fn retain_recent(observations: &mut Vec<Observation>, now_ms: i64, window_ms: i64) {
    observations.retain(|o| now_ms.saturating_sub(o.timestamp_ms) <= window_ms);
}

/// Run the configured estimator over every cell group. One output record per
/// group, in the iteration order of the input map.
pub fn estimate_positions(
    groups: &BTreeMap<String, Vec<Observation>>,
    config: &BatchConfig,
) -> Vec<Estimate> {
    groups
        .iter()
        .map(|(cell_id, observations)| estimate_cell(cell_id, observations, config))
        .collect()
}

fn estimate_cell(cell_id: &str, observations: &[Observation], config: &BatchConfig) -> Estimate {
    let usable: Vec<&Observation> = observations.iter().filter(|o| o.is_well_formed()).collect();

    let technology = usable
        .iter()
        .max_by_key(|o| o.timestamp_ms)
        .map(|o| o.technology.clone())
        .unwrap_or_default();

    // Under-determined groups go straight to the centroid; everything else
    // tries the configured method first and falls back on failure.
    let position = if usable.len() < 2 || config.method == BatchMethod::Centroid {
        centroid(&usable, config.path_loss_exponent)
    } else {
        ranged_estimate(&usable, config).or_else(|| {
            debug!(cell_id, method = config.method.name(), "falling back to centroid");
            centroid(&usable, config.path_loss_exponent)
        })
    };

    Estimate {
        cell_id: cell_id.to_owned(),
        technology,
        lat_deg: position.map(|p| p.0),
        lon_deg: position.map(|p| p.1),
        observation_count: usable.len(),
    }
}

/// Power-weighted mean of the observer positions: each observation weighs
/// `p^(2/η)` with `p` its linear received power. Operates on raw geographic
/// coordinates; no tangent plane is needed for a mean.
fn centroid(observations: &[&Observation], eta: f64) -> Option<(f64, f64)> {
    let eta = eta.max(pathloss::MIN_EXPONENT);
    let mut sum_w = 0.0;
    let mut sum_lat = 0.0;
    let mut sum_lon = 0.0;
    for obs in observations {
        let power = 10f64.powf(obs.rssi() / 10.0);
        let w = power.powf(2.0 / eta);
        sum_w += w;
        sum_lat += w * obs.lat_deg;
        sum_lon += w * obs.lon_deg;
    }
    if sum_w <= 0.0 {
        return None;
    }
    Some((sum_lat / sum_w, sum_lon / sum_w))
}

/// Common front half of the range-based estimators: project the group into
/// its tangent plane and invert every RSSI into a range.
fn ranged_estimate(observations: &[&Observation], config: &BatchConfig) -> Option<(f64, f64)> {
    let positions: Vec<(f64, f64)> = observations
        .iter()
        .map(|o| (o.lat_deg, o.lon_deg))
        .collect();
    let plane = TangentPlane::centered_on_mean(&positions)?;

    let points: Vec<PlanePoint> = positions
        .iter()
        .map(|&(lat, lon)| plane.project(lat, lon))
        .collect();
    let distances: Vec<f64> = observations
        .iter()
        .map(|o| {
            distance_from_rssi(
                o.rssi(),
                config.path_loss_exponent,
                config.reference_rssi_dbm,
                config.reference_distance_m,
            )
        })
        .collect();

    let solved = match config.method {
        BatchMethod::Centroid => unreachable!("handled by the caller"),
        BatchMethod::Intersection => {
            solve_intersection(&points, &distances, config.cluster_bandwidth_m)
        }
        BatchMethod::Wls => solve_wls(&points, &distances),
        BatchMethod::Robust => solve_robust(&points, &distances, config.outlier_threshold_mad),
    }?;
    Some(plane.unproject(solved))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn obs(t: i64, lat: f64, lon: f64, rssi: i32, cell: &str) -> Observation {
        Observation {
            timestamp_ms: t,
            lat_deg: lat,
            lon_deg: lon,
            rssi_dbm: rssi,
            cell_id: cell.to_owned(),
            technology: "LTE".to_owned(),
        }
    }

    #[test]
    fn grouping_dedups_and_drops_ill_formed() {
        let log = vec![
            obs(0, 35.0, 139.0, -80, "A"),
            // Same sample point, newer reading wins
            obs(5, 35.0, 139.0, -85, "A"),
            obs(2, 35.001, 139.0, -90, "A"),
            obs(1, 35.0, 139.0, -70, "B"),
            obs(3, f64::NAN, 139.0, -70, "B"),
        ];
        let groups = group_observations(&log);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["A"].len(), 2);
        assert_eq!(groups["B"].len(), 1);

        let dup = groups["A"].iter().find(|o| o.lat_deg == 35.0).unwrap();
        assert_eq!((dup.timestamp_ms, dup.rssi_dbm), (5, -85));
        // Ordered by timestamp inside the group
        assert!(groups["A"].windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
    }

    #[test]
    fn retention_window() {
        let mut log = vec![
            obs(1_000, 35.0, 139.0, -80, "A"),
            obs(9_000, 35.0, 139.1, -80, "A"),
        ];
        retain_recent(&mut log, 10_000, 5_000);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].timestamp_ms, 9_000);
    }

    #[test]
    fn single_observation_centroid_is_exact() {
        let groups = group_observations(&[obs(0, 35.6812, 139.7671, -80, "C")]);
        let config = BatchConfig {
            method: BatchMethod::Centroid,
            ..BatchConfig::default()
        };
        let estimates = estimate_positions(&groups, &config);
        assert_eq!(estimates.len(), 1);
        let e = &estimates[0];
        assert_eq!(e.cell_id, "C");
        assert_eq!(e.observation_count, 1);
        assert_eq!(e.lat_deg, Some(35.6812));
        assert_eq!(e.lon_deg, Some(139.7671));
    }

    #[test]
    fn centroid_weighs_stronger_readings_harder() {
        let group = vec![
            obs(0, 35.0000, 139.0, -60, "A"),
            obs(1, 35.0010, 139.0, -90, "A"),
        ];
        let refs: Vec<&Observation> = group.iter().collect();
        let (lat, _) = centroid(&refs, 2.0).unwrap();
        // −60 dBm carries 10³ the linear power of −90 dBm, so the mean sits
        // essentially on the strong reading.
        assert!(lat < 35.0000 + 1e-5, "lat {lat}");
        assert!(lat > 35.0000);
    }

    #[test]
    fn under_determined_methods_fall_back_to_centroid() {
        // Two observations cannot feed WLS; the output must equal the
        // centroid of the pair.
        let log = vec![
            obs(0, 35.0000, 139.0000, -80, "A"),
            obs(1, 35.0010, 139.0010, -80, "A"),
        ];
        let groups = group_observations(&log);

        let wls_cfg = BatchConfig {
            method: BatchMethod::Wls,
            ..BatchConfig::default()
        };
        let centroid_cfg = BatchConfig {
            method: BatchMethod::Centroid,
            ..BatchConfig::default()
        };
        let via_wls = estimate_positions(&groups, &wls_cfg);
        let via_centroid = estimate_positions(&groups, &centroid_cfg);
        assert_eq!(via_wls, via_centroid);
        assert!(via_wls[0].has_fix());
        // Equal readings: plain mean of the two positions.
        assert_relative_eq!(via_wls[0].lat_deg.unwrap(), 35.0005, epsilon = 1e-9);
    }

    #[test]
    fn empty_group_produces_record_without_fix() {
        let mut groups = BTreeMap::new();
        groups.insert("ghost".to_owned(), Vec::new());
        let estimates = estimate_positions(&groups, &BatchConfig::default());
        assert_eq!(estimates.len(), 1);
        assert!(!estimates[0].has_fix());
        assert_eq!(estimates[0].observation_count, 0);
    }

    #[test]
    fn output_order_follows_the_group_map() {
        let log = vec![
            obs(0, 35.0, 139.0, -80, "zeta"),
            obs(1, 35.1, 139.1, -80, "alpha"),
            obs(2, 35.2, 139.2, -80, "midway"),
        ];
        let groups = group_observations(&log);
        let estimates = estimate_positions(&groups, &BatchConfig::default());
        let cells: Vec<&str> = estimates.iter().map(|e| e.cell_id.as_str()).collect();
        assert_eq!(cells, vec!["alpha", "midway", "zeta"]);
    }

    #[test]
    fn technology_comes_from_the_newest_observation() {
        let mut old = obs(0, 35.0, 139.0, -80, "A");
        old.technology = "GSM".to_owned();
        let mut new = obs(10, 35.001, 139.0, -80, "A");
        new.technology = "NR".to_owned();
        let groups = group_observations(&[old, new]);
        let estimates = estimate_positions(&groups, &BatchConfig::default());
        assert_eq!(estimates[0].technology, "NR");
    }
}
