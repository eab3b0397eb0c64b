//! Automatic epsilon estimation for density clustering.
//!
//! Two estimators: a coverage-driven one over a precomputed distance
//! matrix (trace clustering) and a knee-driven one over scaled scalar
//! values (metric clustering). Both return a single neighborhood radius.

use crate::distance::DistanceMatrix;
use crate::utils::config::KNEE_CURVE_POINT_LIMIT;
use crate::utils::error::ClusterError;
use log::{debug, info};

/// Estimate epsilon so that a target fraction of items keeps its nearest
/// neighbor inside the radius
///
/// **Public** - used by the trace strategy when no epsilon is given
///
/// The k-th smallest of the unique nearest-neighbor distances (with
/// `k = ceil((n-1) * coverage)`) is taken as the limit; epsilon is the
/// midpoint between the limit and the next larger unique distance, which
/// guards against landing exactly on a tie. When the limit is already the
/// largest unique distance, the limit itself is returned.
///
/// # Errors
/// * `ClusterError::InvalidParameter` - coverage outside (0, 1] or fewer
///   than two items
pub fn estimate_epsilon_by_coverage(
    matrix: &DistanceMatrix,
    coverage: f64,
) -> Result<f64, ClusterError> {
    if !(coverage > 0.0 && coverage <= 1.0) {
        return Err(ClusterError::InvalidParameter {
            name: "coverage",
            message: format!("must be within (0, 1], got {}", coverage),
        });
    }

    let n = matrix.size();
    if n < 2 {
        return Err(ClusterError::InvalidParameter {
            name: "items",
            message: "need at least two items to estimate epsilon".to_string(),
        });
    }

    info!("Finding eps parameter based on coverage of {}...", coverage);

    let mut distances = matrix.nearest_neighbor_distances();
    distances.sort_by(f64::total_cmp);

    let mut unique = distances;
    unique.dedup();

    let k = ((n - 1) as f64 * coverage).ceil() as usize;
    let index = k.min(unique.len() - 1);
    let limit = unique[index];

    let epsilon = match unique.get(index + 1) {
        Some(next) => (limit + next) / 2.0,
        None => limit,
    };

    info!(
        "eps parameter based on coverage of {} set to {:.6}",
        coverage, epsilon
    );

    Ok(epsilon)
}

/// Estimate epsilon from the knee of the nearest-neighbor-distance curve
///
/// **Public** - used by the adaptive scalar strategy; `values` are expected
/// to be scaled into [0, 1], and the returned epsilon lives in that space
///
/// Per-point nearest-neighbor distances (minimum against either sort-order
/// neighbor) are sorted into a convex increasing curve. Runs of
/// near-duplicate values (distance <= `near_zero`) are trimmed from the
/// front, very long curves are subsampled uniformly, and the knee is found
/// as the maximum gap below the normalized chord. The chosen index is then
/// biased halfway toward the end of the curve, favoring a slightly more
/// inclusive radius.
///
/// # Errors
/// * `ClusterError::InvalidParameter` - fewer than two values
pub fn estimate_epsilon_by_knee(values: &[f64], near_zero: f64) -> Result<f64, ClusterError> {
    let n = values.len();
    if n < 2 {
        return Err(ClusterError::InvalidParameter {
            name: "values",
            message: "need at least two values to estimate epsilon".to_string(),
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut nn: Vec<f64> = Vec::with_capacity(n);
    for i in 0..n {
        let left = if i > 0 {
            sorted[i] - sorted[i - 1]
        } else {
            f64::INFINITY
        };
        let right = if i + 1 < n {
            sorted[i + 1] - sorted[i]
        } else {
            f64::INFINITY
        };
        nn.push(left.min(right));
    }
    nn.sort_by(f64::total_cmp);

    // Trim the leading near-duplicate run; it carries no shape information
    let first_informative = nn.iter().position(|&d| d > near_zero).unwrap_or(nn.len());
    let mut curve: Vec<f64> = nn.split_off(first_informative);

    if curve.is_empty() {
        // Everything is a near-duplicate of something else
        debug!("Nearest-neighbor curve fully trimmed; falling back to the near-zero threshold");
        return Ok(near_zero.max(f64::MIN_POSITIVE));
    }

    if curve.len() > KNEE_CURVE_POINT_LIMIT {
        curve = subsample(&curve, KNEE_CURVE_POINT_LIMIT);
    }

    let knee = knee_index(&curve);
    let biased = (knee + curve.len() - 1) / 2;
    let epsilon = curve[biased];

    debug!(
        "Knee at index {} of {}, biased to {}; eps = {:.6}",
        knee,
        curve.len(),
        biased,
        epsilon
    );

    Ok(epsilon)
}

/// Uniformly subsample a sorted curve, always keeping the last point
///
/// **Private** - preserves the relative shape of the curve.
fn subsample(curve: &[f64], limit: usize) -> Vec<f64> {
    let step = curve.len() as f64 / limit as f64;
    let mut sampled: Vec<f64> = (0..limit)
        .map(|i| curve[(i as f64 * step) as usize])
        .collect();

    let last = curve[curve.len() - 1];
    if sampled.last() != Some(&last) {
        sampled.push(last);
    }
    sampled
}

/// Knee of a convex increasing curve: the index with the maximum gap below
/// the normalized chord from first to last point
///
/// **Private** - a flat curve has no knee; its last index is returned.
fn knee_index(curve: &[f64]) -> usize {
    let m = curve.len();
    if m < 3 {
        return m - 1;
    }

    let y0 = curve[0];
    let span = curve[m - 1] - y0;
    if span <= 0.0 {
        return m - 1;
    }

    let mut best = 0;
    let mut best_gap = f64::NEG_INFINITY;
    for (i, &value) in curve.iter().enumerate() {
        let x = i as f64 / (m - 1) as f64;
        let y = (value - y0) / span;
        let gap = x - y;
        if gap > best_gap {
            best_gap = gap;
            best = i;
        }
    }

    best
}
