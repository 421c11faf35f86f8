//! tangent.rs — local equirectangular tangent plane
//!
//! Batch estimation works on relative positions inside one observation
//! cluster (spread ≪ 1 km), so a flat equirectangular approximation centered
//! at the cluster is sufficient and sidesteps the UTM zone machinery.
//! x = east, y = north, meters.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for the flat approximation, meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Point in a [`TangentPlane`], meters east/north of the plane origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanePoint {
    pub x: f64,
    pub y: f64,
}

impl PlanePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist(&self, other: &PlanePoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Flat local frame anchored at a geographic origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TangentPlane {
    origin_lat_deg: f64,
    origin_lon_deg: f64,
    cos_lat0: f64,
}

impl TangentPlane {
    pub fn centered_at(lat_deg: f64, lon_deg: f64) -> Self {
        Self {
            origin_lat_deg: lat_deg,
            origin_lon_deg: lon_deg,
            cos_lat0: lat_deg.to_radians().cos(),
        }
    }

    /// Plane centered at the arithmetic mean of a position list.
    /// Returns `None` on an empty list.
    pub fn centered_on_mean(positions: &[(f64, f64)]) -> Option<Self> {
        if positions.is_empty() {
            return None;
        }
        let n = positions.len() as f64;
        let (lat_sum, lon_sum) = positions
            .iter()
            .fold((0.0, 0.0), |(la, lo), p| (la + p.0, lo + p.1));
        Some(Self::centered_at(lat_sum / n, lon_sum / n))
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.origin_lat_deg, self.origin_lon_deg)
    }

    pub fn project(&self, lat_deg: f64, lon_deg: f64) -> PlanePoint {
        PlanePoint {
            x: EARTH_RADIUS_M
                * self.cos_lat0
                * (lon_deg - self.origin_lon_deg).to_radians(),
            y: EARTH_RADIUS_M * (lat_deg - self.origin_lat_deg).to_radians(),
        }
    }

    pub fn unproject(&self, p: PlanePoint) -> (f64, f64) {
        let lat = self.origin_lat_deg + (p.y / EARTH_RADIUS_M).to_degrees();
        let lon = if self.cos_lat0.abs() > f64::EPSILON {
            self.origin_lon_deg + (p.x / (EARTH_RADIUS_M * self.cos_lat0)).to_degrees()
        } else {
            self.origin_lon_deg
        };
        (lat, lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn origin_maps_to_zero() {
        let plane = TangentPlane::centered_at(35.68, 139.77);
        let p = plane.project(35.68, 139.77);
        assert_eq!(p, PlanePoint::new(0.0, 0.0));
    }

    #[test]
    fn project_unproject_round_trip() {
        let plane = TangentPlane::centered_at(-36.85, 174.76);
        for (dlat, dlon) in [(0.003, -0.004), (-0.001, 0.002), (0.0049, 0.0049)] {
            let (lat, lon) = (-36.85 + dlat, 174.76 + dlon);
            let (lat2, lon2) = plane.unproject(plane.project(lat, lon));
            assert_relative_eq!(lat, lat2, epsilon = 1e-12);
            assert_relative_eq!(lon, lon2, epsilon = 1e-12);
        }
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let plane = TangentPlane::centered_at(0.0, 0.0);
        let p = plane.project(1.0, 0.0);
        // R · (π/180) ≈ 111 194.9 m
        assert!((p.y - 111_194.9).abs() < 1.0, "y = {}", p.y);
        assert_eq!(p.x, 0.0);
    }

    #[test]
    fn mean_centering() {
        let plane =
            TangentPlane::centered_on_mean(&[(10.0, 20.0), (12.0, 22.0)]).unwrap();
        assert_eq!(plane.origin(), (11.0, 21.0));
        assert!(TangentPlane::centered_on_mean(&[]).is_none());
    }
}
