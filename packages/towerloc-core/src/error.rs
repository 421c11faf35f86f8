//! error.rs — typed failures at the core's constructor boundaries
//!
//! Estimation failures never surface as errors: a cell that cannot be
//! estimated produces an `Estimate` without a fix, and a degenerate filter
//! step is skipped with a warning. The error type below covers only the
//! cases where a caller hands the core structurally invalid geometry.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeoError {
    /// UTM zone outside 1..=60
    #[error("UTM zone {0} outside the valid range 1..=60")]
    InvalidZone(u8),

    /// Two UTM coordinates from different zones or hemispheres were combined
    #[error("UTM frame mismatch: zone {lhs_zone}{lhs_hemi} vs zone {rhs_zone}{rhs_hemi}")]
    FrameMismatch {
        lhs_zone: u8,
        lhs_hemi: char,
        rhs_zone: u8,
        rhs_hemi: char,
    },
}
