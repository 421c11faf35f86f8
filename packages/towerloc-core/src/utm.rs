//! utm.rs — WGS84 ↔ UTM projection
//!
//! Closed-form transverse-mercator series on the WGS84 ellipsoid, fourth
//! order (Snyder's formulation, the expansion used by the standard UTM
//! references). Round-trip error is sub-millimeter anywhere within 80° of
//! the equator; behavior at the poles is undefined.
//!
//! UTM frames are zoned: coordinates from different zones or hemispheres are
//! not comparable, and nothing here re-projects behind the caller's back. A
//! caller whose track crosses a zone boundary picks one frame and projects
//! into it with [`forward_in_zone`].

use serde::{Deserialize, Serialize};

use crate::error::GeoError;

// WGS84 defining constants
const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;

// Derived eccentricities
const E2: f64 = F * (2.0 - F);
const E4: f64 = E2 * E2;
const E6: f64 = E2 * E2 * E2;
const EP2: f64 = E2 / (1.0 - E2);

/// UTM scale factor on the central meridian
pub const K0: f64 = 0.9996;
/// False easting applied to every zone, meters
pub const FALSE_EASTING: f64 = 500_000.0;
/// False northing applied in the southern hemisphere, meters
pub const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    pub fn from_lat(lat_deg: f64) -> Self {
        if lat_deg >= 0.0 {
            Self::North
        } else {
            Self::South
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Self::North => 'N',
            Self::South => 'S',
        }
    }
}

/// Metric point in one UTM zone.
///
/// Easting and northing are non-negative by construction of the false
/// origins. Any arithmetic combining two coordinates requires an equal
/// `(zone, hemisphere)` frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtmCoord {
    pub easting_m: f64,
    pub northing_m: f64,
    pub zone: u8,
    pub hemisphere: Hemisphere,
}

impl UtmCoord {
    pub fn new(
        easting_m: f64,
        northing_m: f64,
        zone: u8,
        hemisphere: Hemisphere,
    ) -> Result<Self, GeoError> {
        if !(1..=60).contains(&zone) {
            return Err(GeoError::InvalidZone(zone));
        }
        Ok(Self {
            easting_m,
            northing_m,
            zone,
            hemisphere,
        })
    }

    pub fn same_frame(&self, other: &UtmCoord) -> bool {
        self.zone == other.zone && self.hemisphere == other.hemisphere
    }

    /// Euclidean distance to another coordinate in the same frame.
    pub fn distance_to(&self, other: &UtmCoord) -> Result<f64, GeoError> {
        if !self.same_frame(other) {
            return Err(GeoError::FrameMismatch {
                lhs_zone: self.zone,
                lhs_hemi: self.hemisphere.letter(),
                rhs_zone: other.zone,
                rhs_hemi: other.hemisphere.letter(),
            });
        }
        Ok((self.easting_m - other.easting_m).hypot(self.northing_m - other.northing_m))
    }
}

// ── Zone arithmetic ───────────────────────────────────────────────────────────

/// UTM zone containing a longitude. Longitudes are expected in [−180, 180];
/// the antimeridian itself maps into zone 60.
pub fn zone_for(lon_deg: f64) -> u8 {
    let z = ((lon_deg + 180.0) / 6.0).floor() as i32 + 1;
    z.clamp(1, 60) as u8
}

/// Central meridian of a zone, degrees
pub fn central_meridian_deg(zone: u8) -> f64 {
    6.0 * f64::from(zone) - 183.0
}

// ── Forward ───────────────────────────────────────────────────────────────────

/// Project a geographic position into the UTM zone it falls in.
pub fn forward(lat_deg: f64, lon_deg: f64) -> UtmCoord {
    let zone = zone_for(lon_deg);
    forward_in_zone(lat_deg, lon_deg, zone, Hemisphere::from_lat(lat_deg))
}

/// Project a geographic position into an explicit `(zone, hemisphere)` frame.
///
/// This is the boundary-crossing escape hatch: a track straddling a zone
/// seam (or the equator) stays continuous when every point is projected into
/// the frame captured at the start of the track. The supplied hemisphere
/// decides the false northing, so a northern-hemisphere point projected into
/// a southern frame lands above 10 000 000 m rather than wrapping.
pub fn forward_in_zone(lat_deg: f64, lon_deg: f64, zone: u8, hemisphere: Hemisphere) -> UtmCoord {
    let phi = lat_deg.to_radians();
    let dlam = lon_deg.to_radians() - central_meridian_deg(zone).to_radians();

    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = sin_phi / cos_phi;

    let n = A / (1.0 - E2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = EP2 * cos_phi * cos_phi;
    let a = cos_phi * dlam;

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a2 * a2;
    let a5 = a4 * a;
    let a6 = a4 * a2;

    let easting = K0
        * n
        * (a + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * EP2) * a5 / 120.0)
        + FALSE_EASTING;

    let mut northing = K0
        * (meridian_arc(phi)
            + n * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * EP2) * a6 / 720.0));
    if hemisphere == Hemisphere::South {
        northing += FALSE_NORTHING_SOUTH;
    }

    UtmCoord {
        easting_m: easting,
        northing_m: northing,
        zone,
        hemisphere,
    }
}

/// Meridian arc length from the equator, meters (signed)
fn meridian_arc(phi: f64) -> f64 {
    A * ((1.0 - E2 / 4.0 - 3.0 * E4 / 64.0 - 5.0 * E6 / 256.0) * phi
        - (3.0 * E2 / 8.0 + 3.0 * E4 / 32.0 + 45.0 * E6 / 1024.0) * (2.0 * phi).sin()
        + (15.0 * E4 / 256.0 + 45.0 * E6 / 1024.0) * (4.0 * phi).sin()
        - (35.0 * E6 / 3072.0) * (6.0 * phi).sin())
}

// ── Inverse ───────────────────────────────────────────────────────────────────

/// Recover the geographic position of a UTM coordinate. Returns
/// `(lat_deg, lon_deg)`.
pub fn inverse(utm: &UtmCoord) -> (f64, f64) {
    let x = utm.easting_m - FALSE_EASTING;
    let y = match utm.hemisphere {
        Hemisphere::North => utm.northing_m,
        Hemisphere::South => utm.northing_m - FALSE_NORTHING_SOUTH,
    };

    // Footpoint latitude from the rectifying series
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * E4 / 64.0 - 5.0 * E6 / 256.0));
    let sqrt_1me2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_2 * e1_2;

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let (sin_phi1, cos_phi1) = phi1.sin_cos();
    let tan_phi1 = sin_phi1 / cos_phi1;

    let c1 = EP2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let w = 1.0 - E2 * sin_phi1 * sin_phi1;
    let n1 = A / w.sqrt();
    let r1 = A * (1.0 - E2) / (w * w.sqrt());
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d2 * d2;
    let d5 = d4 * d;
    let d6 = d4 * d2;

    let phi = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * EP2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * EP2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let dlam = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * EP2 + 24.0 * t1 * t1) * d5 / 120.0)
        / cos_phi1;

    (
        phi.to_degrees(),
        central_meridian_deg(utm.zone) + dlam.to_degrees(),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Metric round-trip error between a geographic input and its
    /// forward-then-inverse image, meters.
    fn round_trip_error_m(lat: f64, lon: f64) -> f64 {
        let (lat2, lon2) = inverse(&forward(lat, lon));
        let dlat_m = (lat2 - lat) * 111_132.0;
        let dlon_m = (lon2 - lon) * 111_320.0 * lat.to_radians().cos();
        dlat_m.hypot(dlon_m)
    }

    #[test]
    fn round_trip_is_submillimeter_across_latitudes() {
        // Spread over both hemispheres, several zones, and in-zone offsets
        // from near the central meridian out to the zone edge.
        let lons = [-176.2, -122.45, -3.0, 12.0, 139.7671, 174.9];
        for lat10 in -8..=8 {
            let lat = f64::from(lat10) * 10.0 + 0.123;
            for lon in lons {
                let err = round_trip_error_m(lat.min(80.0), lon);
                assert!(
                    err < 1e-3,
                    "round trip error {err} m at lat={lat} lon={lon}"
                );
            }
        }
    }

    #[test]
    fn central_meridian_projects_to_false_easting() {
        // Zone 31 central meridian is 3°E exactly.
        assert_eq!(zone_for(3.0), 31);
        let utm = forward(0.0, 3.0);
        assert!((utm.easting_m - FALSE_EASTING).abs() < 1e-6);
        assert!(utm.northing_m.abs() < 1e-6);
        assert_eq!(utm.hemisphere, Hemisphere::North);
    }

    #[test]
    fn equatorial_easting_matches_scaled_arc() {
        // 0.1° east of the central meridian on the equator: easting offset is
        // k₀·a·Δλ plus a ~6 mm third-order correction, ≈ 11 127.50 m.
        let utm = forward(0.0, 3.1);
        assert!(
            (utm.easting_m - FALSE_EASTING - 11_127.50).abs() < 0.1,
            "easting {}",
            utm.easting_m
        );
    }

    #[test]
    fn southern_hemisphere_uses_false_northing() {
        let utm = forward(-33.9249, 18.4241); // Cape Town
        assert_eq!(utm.zone, 34);
        assert_eq!(utm.hemisphere, Hemisphere::South);
        assert!(
            utm.northing_m > 6.0e6 && utm.northing_m < 6.5e6,
            "northing {}",
            utm.northing_m
        );
        let (lat, lon) = inverse(&utm);
        assert!((lat - -33.9249).abs() < 1e-8);
        assert!((lon - 18.4241).abs() < 1e-8);
    }

    #[test]
    fn zone_derivation() {
        assert_eq!(zone_for(-179.9), 1);
        assert_eq!(zone_for(-177.0), 1);
        assert_eq!(zone_for(0.0), 31);
        assert_eq!(zone_for(139.7671), 54); // Tokyo
        assert_eq!(zone_for(179.99), 60);
        assert_eq!(central_meridian_deg(54), 141.0);
    }

    #[test]
    fn fixed_frame_projection_stays_continuous_across_the_seam() {
        // Two points 0.02° apart straddling the zone 31/32 seam at 6°E.
        let a = forward_in_zone(50.0, 5.99, 31, Hemisphere::North);
        let b = forward_in_zone(50.0, 6.01, 31, Hemisphere::North);
        let d = a.distance_to(&b).unwrap();
        // 0.02° of longitude at 50°N is ν·cosφ·Δλ ≈ 1434 m on the ellipsoid,
        // stretched by the ≈1.00017 grid scale three degrees off the meridian.
        assert!((d - 1434.2).abs() < 2.0, "seam distance {d}");
    }

    #[test]
    fn mixed_frames_refuse_distance() {
        let a = forward(50.0, 5.0); // zone 31
        let b = forward(50.0, 7.0); // zone 32
        assert!(a.distance_to(&b).is_err());
    }

    #[test]
    fn invalid_zone_rejected() {
        assert_eq!(
            UtmCoord::new(500_000.0, 0.0, 0, Hemisphere::North),
            Err(GeoError::InvalidZone(0))
        );
        assert!(UtmCoord::new(500_000.0, 0.0, 61, Hemisphere::North).is_err());
    }
}
