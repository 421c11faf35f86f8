//! main.rs — Towerloc estimator validation harness
//!
//! Offline end-to-end run against synthetic ground truth:
//!   1. Generate an observer drive-walk and an RSSI observation log
//!   2. Feed the recursive tracker one measurement at a time, per tower
//!   3. Run every batch method over the grouped log
//!   4. Report position error against the true tower placements
//!
//! No network, no services: read a config, print (or emit JSON) and exit.

mod radio;
mod scenarios;
mod walk;

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use towerloc_core::tangent::TangentPlane;
use towerloc_core::{estimate_positions, group_observations, utm, TowerTracker};
use towerloc_types::{BatchConfig, BatchMethod, Observation};

use radio::{RadioConfig, TowerSpec};
use scenarios::Scenario;
use walk::WalkConfig;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "towerloc-sim", about = "Towerloc synthetic survey simulator")]
struct Args {
    /// Config file path (falls back to the built-in survey)
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Propagation preset overriding the [radio] baseline
    #[arg(long)]
    scenario: Option<String>,
    /// RNG seed (same seed, same survey)
    #[arg(long, default_value = "42")]
    seed: u64,
    /// Batch method to run: centroid|intersection|wls|robust|all
    #[arg(long, default_value = "all")]
    method: String,
    /// Emit the report as JSON on stdout instead of log lines
    #[arg(long)]
    json: bool,
}

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FullConfig {
    walk: WalkConfig,
    radio: RadioConfig,
    towers: Vec<TowerSpec>,
}

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Report {
    scenario: String,
    seed: u64,
    observation_count: usize,
    tracker: Vec<TrackerReport>,
    batch: Vec<BatchReport>,
}

#[derive(Debug, Serialize)]
struct TrackerReport {
    cell_id: String,
    error_m: f64,
    error_radius_m: f64,
    ref_power_dbm: f64,
    path_loss_exponent: f64,
    measurements: u64,
}

#[derive(Debug, Serialize)]
struct BatchReport {
    method: &'static str,
    cell_id: String,
    error_m: Option<f64>,
    observation_count: usize,
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "towerloc_simulator=info".into()),
        )
        .init();

    let args = Args::parse();

    let config_str = std::fs::read_to_string(&args.config)
        .unwrap_or_else(|_| include_str!("../config.toml").to_string());
    let mut cfg: FullConfig = toml::from_str(&config_str).context("invalid config.toml")?;
    if cfg.towers.is_empty() {
        bail!("config defines no towers");
    }

    let scenario = match &args.scenario {
        Some(name) => match Scenario::from_name(name) {
            Some(s) => {
                s.apply(&mut cfg.radio);
                s.name().to_owned()
            }
            None => bail!("unknown scenario '{name}' (clean|urban|contaminated)"),
        },
        None => "baseline".to_owned(),
    };

    let methods: Vec<BatchMethod> = if args.method == "all" {
        vec![
            BatchMethod::Centroid,
            BatchMethod::Intersection,
            BatchMethod::Wls,
            BatchMethod::Robust,
        ]
    } else {
        match BatchMethod::from_name(&args.method) {
            Some(m) => vec![m],
            None => bail!("unknown method '{}'", args.method),
        }
    };

    info!(
        "📡 Towerloc survey — {} towers, {} samples, scenario {scenario}, seed {}",
        cfg.towers.len(),
        cfg.walk.samples,
        args.seed
    );

    // Ground truth + observation log
    let mut rng = StdRng::seed_from_u64(args.seed);
    let track = walk::generate(&cfg.walk, &mut rng);
    let log = radio::observe_walk(&track, &cfg.towers, &cfg.radio, &mut rng);
    let plane = walk::survey_plane(&cfg.walk);
    info!("🚶 walk generated: {} observations across the log", log.len());

    let tracker = run_trackers(&log, &cfg.towers, &plane);
    let batch = run_batch(&log, &cfg.towers, &cfg.radio, &methods, &plane);

    let report = Report {
        scenario,
        seed: args.seed,
        observation_count: log.len(),
        tracker,
        batch,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for t in &report.tracker {
            info!(
                "📍 tracker {}: error {:.1} m (radius {:.1} m, P₀ {:.1} dBm, η {:.2}, {} steps)",
                t.cell_id, t.error_m, t.error_radius_m, t.ref_power_dbm, t.path_loss_exponent,
                t.measurements
            );
        }
        for b in &report.batch {
            match b.error_m {
                Some(err) => info!(
                    "📍 batch {:>12} {}: error {:.1} m ({} obs)",
                    b.method, b.cell_id, err, b.observation_count
                ),
                None => info!(
                    "📍 batch {:>12} {}: no fix ({} obs)",
                    b.method, b.cell_id, b.observation_count
                ),
            }
        }
    }

    Ok(())
}

/// One recursive tracker per tower, fed that tower's observations in log
/// order at the acquisition cadence.
fn run_trackers(
    log: &[Observation],
    towers: &[TowerSpec],
    plane: &TangentPlane,
) -> Vec<TrackerReport> {
    towers
        .iter()
        .map(|tower| {
            let mut tracker = TowerTracker::default();
            for obs in log.iter().filter(|o| o.cell_id == tower.cell_id) {
                let user = utm::forward(obs.lat_deg, obs.lon_deg);
                tracker.step(user, obs.rssi());
            }
            let error_m = tracker
                .estimated_position()
                .map(|(lat, lon)| plane.project(lat, lon).dist(&tower.position()))
                .unwrap_or(f64::INFINITY);
            let (ref_power_dbm, path_loss_exponent) = tracker.path_loss_parameters();
            TrackerReport {
                cell_id: tower.cell_id.clone(),
                error_m,
                error_radius_m: tracker.error_radius_m(),
                ref_power_dbm,
                path_loss_exponent,
                measurements: tracker.measurement_count(),
            }
        })
        .collect()
}

/// Every requested batch method over the grouped log. The batch model is
/// pointed at the simulated environment's true propagation constants, so the
/// residual error isolates estimator behavior.
fn run_batch(
    log: &[Observation],
    towers: &[TowerSpec],
    radio: &RadioConfig,
    methods: &[BatchMethod],
    plane: &TangentPlane,
) -> Vec<BatchReport> {
    let groups = group_observations(log);
    let mut reports = Vec::new();

    for &method in methods {
        let config = BatchConfig {
            method,
            path_loss_exponent: radio.path_loss_exponent,
            reference_rssi_dbm: radio.ref_power_dbm,
            ..BatchConfig::default()
        };
        for estimate in estimate_positions(&groups, &config) {
            let tower = towers.iter().find(|t| t.cell_id == estimate.cell_id);
            let error_m = match (tower, estimate.lat_deg, estimate.lon_deg) {
                (Some(t), Some(lat), Some(lon)) => {
                    Some(plane.project(lat, lon).dist(&t.position()))
                }
                _ => None,
            };
            reports.push(BatchReport {
                method: method.name(),
                cell_id: estimate.cell_id,
                error_m,
                observation_count: estimate.observation_count,
            });
        }
    }
    reports
}
