//! # towerloc-core
//!
//! Signal-to-location estimation core for the Towerloc suite: turns streams
//! of `(time, lat, lon, rssi, cell_id)` observations into cell-tower
//! position estimates.
//!
//! Two estimators:
//! - [`ekf::TowerTracker`]: a self-calibrating EKF that tracks one
//!   stationary tower and the two log-distance propagation parameters,
//!   fed one measurement at a time
//! - [`batch::estimate_positions`]: one-shot estimation over an archived
//!   log, grouped per cell, with four configurable algorithms and a
//!   centroid fallback
//!
//! ## Coordinate Conventions
//!
//! - **Geographic**: WGS84 degrees, the external interface everywhere
//! - **UTM** ([`utm`]): the EKF's metric frame; the zone and hemisphere are
//!   captured at filter initialization and never change behind the caller
//! - **Tangent plane** ([`tangent`]): flat equirectangular meters used by
//!   the batch estimators, centered per observation cluster
//!
//! The core performs no I/O, spawns nothing, and keeps no state outside the
//! tracker instances the caller owns. Estimation failures surface as absent
//! values, never as panics or errors; the only typed errors are
//! constructor-level frame violations ([`error::GeoError`]).

pub mod batch;
pub mod ekf;
pub mod error;
pub mod intersect;
pub mod multilateration;
pub mod pathloss;
pub mod tangent;
pub mod utm;

pub use batch::{estimate_positions, group_observations, retain_recent};
pub use ekf::TowerTracker;
pub use error::GeoError;
pub use tangent::{PlanePoint, TangentPlane};
pub use utm::{Hemisphere, UtmCoord};
