//! multilateration.rs — Gauss-Newton weighted-least-squares range solver
//!
//! Estimates a single transmitter position from `(observer point, inverted
//! range)` pairs in the tangent plane, minimizing
//!
//!   J = Σ_i  w_i · (‖p − p_i‖ − d_i)²
//!
//! with the far-range down-weighting `w_i = 1/(1 + d_i/1000)`. The robust
//! variant re-solves after rejecting observations whose residuals are
//! median/MAD outliers, which tolerates a single wildly inconsistent range
//! without dragging the fix.

use crate::tangent::PlanePoint;

/// Fewer observations than this cannot constrain a 2D position plus leave a
/// residual to check.
const MIN_OBSERVATIONS: usize = 3;

/// Iteration cap and convergence gate for the Gauss-Newton loop
const MAX_ITERATIONS: usize = 20;
const CONVERGENCE_M: f64 = 0.1;

/// Normal-matrix determinants below this mean the geometry is degenerate
/// (collinear or coincident observers).
const SINGULAR_DET: f64 = 1e-10;

/// Consistency constant turning a MAD into a Gaussian-comparable sigma
const MAD_SIGMA: f64 = 1.4826;

/// Plain weighted least squares. Returns `None` when under-determined or
/// when the normal equations go singular.
pub fn solve_wls(points: &[PlanePoint], distances: &[f64]) -> Option<PlanePoint> {
    debug_assert_eq!(points.len(), distances.len());
    if points.len() < MIN_OBSERVATIONS {
        return None;
    }

    // Start from the arithmetic mean of the observer positions.
    let n = points.len() as f64;
    let mut p = PlanePoint::new(
        points.iter().map(|q| q.x).sum::<f64>() / n,
        points.iter().map(|q| q.y).sum::<f64>() / n,
    );

    for _ in 0..MAX_ITERATIONS {
        // Accumulate the 2×2 normal equations HᵀWH · Δ = HᵀWr.
        let mut atwa = [[0.0f64; 2]; 2];
        let mut atwb = [0.0f64; 2];

        for (q, &d) in points.iter().zip(distances) {
            let dx = p.x - q.x;
            let dy = p.y - q.y;
            let dist = dx.hypot(dy).max(1e-3);
            let residual = dist - d;
            let w = 1.0 / (1.0 + d / 1000.0);

            // Jacobian row: ∂‖p − q‖/∂p = (p − q)/‖p − q‖
            let jx = dx / dist;
            let jy = dy / dist;

            atwa[0][0] += w * jx * jx;
            atwa[0][1] += w * jx * jy;
            atwa[1][0] += w * jy * jx;
            atwa[1][1] += w * jy * jy;
            atwb[0] += w * jx * residual;
            atwb[1] += w * jy * residual;
        }

        // Cramer solve; 2×2 is cheaper closed-form than any general solver.
        let det = atwa[0][0] * atwa[1][1] - atwa[0][1] * atwa[1][0];
        if det.abs() < SINGULAR_DET {
            return None;
        }
        let step_x = (atwa[1][1] * atwb[0] - atwa[0][1] * atwb[1]) / det;
        let step_y = (atwa[0][0] * atwb[1] - atwa[1][0] * atwb[0]) / det;

        p.x -= step_x;
        p.y -= step_y;

        if step_x.hypot(step_y) < CONVERGENCE_M {
            break;
        }
    }

    Some(p)
}

/// WLS with one round of median/MAD outlier rejection.
///
/// Observations whose absolute residual sits more than `threshold`
/// normalized MADs from the residual median are dropped; the solve is
/// repeated iff at least [`MIN_OBSERVATIONS`] inliers remain and something
/// was actually dropped. A collapsed MAD (all residuals alike) accepts
/// everything.
pub fn solve_robust(
    points: &[PlanePoint],
    distances: &[f64],
    threshold: f64,
) -> Option<PlanePoint> {
    let initial = solve_wls(points, distances)?;

    let residuals: Vec<f64> = points
        .iter()
        .zip(distances)
        .map(|(q, &d)| (initial.dist(q) - d).abs())
        .collect();

    let med = median(&residuals);
    let deviations: Vec<f64> = residuals.iter().map(|r| (r - med).abs()).collect();
    let mad = median(&deviations);
    if mad < 1e-6 {
        return Some(initial);
    }

    let mut inlier_points = Vec::with_capacity(points.len());
    let mut inlier_distances = Vec::with_capacity(points.len());
    for ((q, &d), r) in points.iter().zip(distances).zip(&residuals) {
        if (r - med).abs() / (MAD_SIGMA * mad) < threshold {
            inlier_points.push(*q);
            inlier_distances.push(d);
        }
    }

    if inlier_points.len() >= MIN_OBSERVATIONS && inlier_points.len() < points.len() {
        solve_wls(&inlier_points, &inlier_distances).or(Some(initial))
    } else {
        Some(initial)
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Equilateral observer triangle, side 100 m; every range equals the
    /// circumradius, so all residuals vanish at the circumcenter.
    fn equilateral() -> (Vec<PlanePoint>, Vec<f64>, PlanePoint) {
        let points = vec![
            PlanePoint::new(0.0, 0.0),
            PlanePoint::new(100.0, 0.0),
            PlanePoint::new(50.0, 86.6025),
        ];
        let r = 57.735;
        (points, vec![r; 3], PlanePoint::new(50.0, 28.8675))
    }

    #[test]
    fn under_determined_input_returns_none() {
        let points = vec![PlanePoint::new(0.0, 0.0), PlanePoint::new(10.0, 0.0)];
        assert!(solve_wls(&points, &[5.0, 5.0]).is_none());
        assert!(solve_robust(&points, &[5.0, 5.0], 2.5).is_none());
    }

    #[test]
    fn consistent_ranges_converge_on_the_target() {
        let (points, distances, target) = equilateral();
        let p = solve_wls(&points, &distances).unwrap();
        assert!(p.dist(&target) < 0.15, "estimate {p:?}");
    }

    #[test]
    fn collinear_observers_are_singular() {
        let points = vec![
            PlanePoint::new(0.0, 0.0),
            PlanePoint::new(50.0, 0.0),
            PlanePoint::new(100.0, 0.0),
        ];
        // Ranges consistent with a point on the line: the normal matrix has
        // no cross-track information once the iterate sits on the axis.
        let distances = vec![50.0, 0.0, 50.0];
        assert!(solve_wls(&points, &distances).is_none());
    }

    #[test]
    fn identical_residuals_accept_everything() {
        let (points, distances, _) = equilateral();
        // Residuals are all (near) zero, MAD collapses, nothing is dropped.
        let robust = solve_robust(&points, &distances, 2.5).unwrap();
        let plain = solve_wls(&points, &distances).unwrap();
        assert_eq!(robust, plain);
    }

    #[test]
    fn single_inflated_range_is_rejected() {
        // Five clean ranges on a ring around the target plus one inflated
        // five-fold. The bad range drags the plain solve off target; its
        // residual is a many-MAD outlier, so the gate drops it and the
        // re-solve lands back on the ring center.
        let target = PlanePoint::new(50.0, 28.8675);
        let mut points = Vec::new();
        let mut distances = Vec::new();
        for k in 0..5 {
            let theta = f64::from(k) * std::f64::consts::TAU / 5.0;
            points.push(PlanePoint::new(
                target.x + 60.0 * theta.cos(),
                target.y + 60.0 * theta.sin(),
            ));
            distances.push(60.0);
        }
        points.push(PlanePoint::new(
            target.x + 60.0 * 0.7f64.cos(),
            target.y + 60.0 * 0.7f64.sin(),
        ));
        distances.push(300.0);

        let plain = solve_wls(&points, &distances).unwrap();
        let robust = solve_robust(&points, &distances, 2.5).unwrap();

        let plain_err = plain.dist(&target);
        let robust_err = robust.dist(&target);
        assert!(
            robust_err < plain_err,
            "robust {robust_err} m should beat plain {plain_err} m"
        );
        assert!(robust_err < 0.5, "robust error {robust_err} m");
        assert!(plain_err > 10.0, "plain WLS should be visibly dragged");
    }
}
