//! intersect.rs — circle-intersection voting estimator
//!
//! Every observation defines a range circle around its observer. Pairs of
//! circles intersect in up to two points; where many circles agree, their
//! intersection points pile up. The estimator scores each intersection point
//! by the crossing-angle-weighted mass inside a fixed-radius ball and
//! returns the tent-kernel centroid of the densest cluster.
//!
//! The crossing weight is `h / min(r_i, r_j)` with `h` the perpendicular
//! half-chord: grazing intersections (which slide wildly under range noise)
//! count for almost nothing, deep crossings count fully.

use crate::tangent::PlanePoint;

/// Floor for the voting ball radius, meters
const MIN_BANDWIDTH_M: f64 = 5.0;

/// Center separations below this are treated as coincident circles.
const MIN_SEPARATION_M: f64 = 1e-6;

/// One circle-pair intersection point with its crossing-angle weight
#[derive(Debug, Clone, Copy)]
struct Vote {
    p: PlanePoint,
    w: f64,
}

/// Intersection points of two range circles, or `None` for coincident,
/// separate, or nested circles.
fn circle_intersections(
    c1: PlanePoint,
    r1: f64,
    c2: PlanePoint,
    r2: f64,
) -> Option<[(PlanePoint, f64); 2]> {
    let sep = c1.dist(&c2);
    if sep <= MIN_SEPARATION_M || sep > r1 + r2 || sep < (r1 - r2).abs() {
        return None;
    }

    // Distance from c1 to the chord along the center line, and the
    // perpendicular half-chord.
    let a = (sep * sep + r1 * r1 - r2 * r2) / (2.0 * sep);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();

    let ex = (c2.x - c1.x) / sep;
    let ey = (c2.y - c1.y) / sep;
    let base = PlanePoint::new(c1.x + a * ex, c1.y + a * ey);

    let w = (h / r1.min(r2)).clamp(0.0, 1.0);
    Some([
        (PlanePoint::new(base.x - h * ey, base.y + h * ex), w),
        (PlanePoint::new(base.x + h * ey, base.y - h * ex), w),
    ])
}

/// Voting estimate over all observation pairs. `None` when no pair of
/// circles intersects (the caller falls back to the centroid).
pub fn solve_intersection(
    points: &[PlanePoint],
    distances: &[f64],
    cluster_bandwidth_m: f64,
) -> Option<PlanePoint> {
    debug_assert_eq!(points.len(), distances.len());
    let bandwidth = cluster_bandwidth_m.max(MIN_BANDWIDTH_M);

    let mut votes: Vec<Vote> = Vec::new();
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            if let Some(pair) =
                circle_intersections(points[i], distances[i], points[j], distances[j])
            {
                for (p, w) in pair {
                    votes.push(Vote { p, w });
                }
            }
        }
    }
    if votes.is_empty() {
        return None;
    }

    // Densest vote: maximum crossing-weight mass within one bandwidth.
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (k, vote) in votes.iter().enumerate() {
        let score: f64 = votes
            .iter()
            .filter(|other| other.p.dist(&vote.p) <= bandwidth)
            .map(|other| other.w)
            .sum();
        if score > best_score {
            best_score = score;
            best = k;
        }
    }
    let center = votes[best].p;

    // Tent-kernel refinement inside the winning ball.
    let mut sum_w = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for vote in &votes {
        let dist = vote.p.dist(&center);
        if dist <= bandwidth {
            let w = vote.w * (1.0 - dist / bandwidth);
            sum_w += w;
            sum_x += w * vote.p.x;
            sum_y += w * vote.p.y;
        }
    }
    if sum_w <= 0.0 {
        return None;
    }
    Some(PlanePoint::new(sum_x / sum_w, sum_y / sum_w))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
