//! Silhouette score over a precomputed distance matrix.
//!
//! Measures how much closer each point sits to its own group than to the
//! nearest other group: `s = (b - a) / max(a, b)` per point, averaged.
//! Scores fall in [-1, 1]; higher is better separated. The noise label is
//! treated as a group of its own, matching how the labels are produced.

use crate::distance::DistanceMatrix;

/// Mean silhouette coefficient of a labeling
///
/// **Public** - returns `None` when fewer than two distinct groups exist,
/// where the score is undefined.
pub fn silhouette_score(matrix: &DistanceMatrix, labels: &[i32]) -> Option<f64> {
    let n = labels.len();
    debug_assert_eq!(n, matrix.size());

    let mut groups: Vec<i32> = labels.to_vec();
    groups.sort_unstable();
    groups.dedup();

    if groups.len() < 2 || n < 2 {
        return None;
    }

    let mut total = 0.0;
    for i in 0..n {
        total += point_silhouette(matrix, labels, i, &groups);
    }

    Some(total / n as f64)
}

/// Silhouette coefficient of a single point
///
/// **Private** - a point alone in its group scores 0.
fn point_silhouette(matrix: &DistanceMatrix, labels: &[i32], i: usize, groups: &[i32]) -> f64 {
    let own = labels[i];

    let mut own_sum = 0.0;
    let mut own_count = 0usize;
    for (j, &label) in labels.iter().enumerate() {
        if j != i && label == own {
            own_sum += matrix.get(i, j);
            own_count += 1;
        }
    }

    if own_count == 0 {
        return 0.0;
    }
    let a = own_sum / own_count as f64;

    let mut b = f64::INFINITY;
    for &group in groups {
        if group == own {
            continue;
        }

        let mut sum = 0.0;
        let mut count = 0usize;
        for (j, &label) in labels.iter().enumerate() {
            if label == group {
                sum += matrix.get(i, j);
                count += 1;
            }
        }
        if count > 0 {
            b = b.min(sum / count as f64);
        }
    }

    let denom = a.max(b);
    if denom == 0.0 {
        return 0.0;
    }
    (b - a) / denom
}
