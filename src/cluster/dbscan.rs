//! DBSCAN label passes.
//!
//! Two region-query backends share one expansion core: a precomputed
//! distance matrix (trace clustering) and sorted scalar values with
//! multiplicity weights (metric clustering). Expansion is iterative with an
//! explicit queue, so cluster growth never recurses.

use crate::cluster::silhouette::silhouette_score;
use crate::distance::DistanceMatrix;
use crate::result::ClusteringInformation;
use crate::utils::error::ClusterError;
use log::{debug, info};

/// Label assigned to points that belong to no cluster
pub const NOISE: i32 = -1;

/// Shared DBSCAN core over an abstract region query
///
/// **Private** - `weight` gives the multiplicity of a point; density is the
/// summed weight of a neighborhood (including the point itself), so a run
/// over value-groups behaves exactly like a run over the raw points.
fn dbscan_with_query<Q, W>(n: usize, min_samples: usize, region_query: Q, weight: W) -> Vec<i32>
where
    Q: Fn(usize) -> Vec<usize>,
    W: Fn(usize) -> usize,
{
    let mut labels = vec![NOISE; n];
    let mut visited = vec![false; n];
    let mut next_cluster: i32 = 0;

    for point in 0..n {
        if visited[point] {
            continue;
        }
        visited[point] = true;

        let neighbors = region_query(point);
        let mass: usize = weight(point) + neighbors.iter().map(|&j| weight(j)).sum::<usize>();
        if mass < min_samples {
            // Not a core point; stays noise unless claimed as a border later
            continue;
        }

        labels[point] = next_cluster;
        let mut queue = neighbors;

        while let Some(candidate) = queue.pop() {
            if labels[candidate] == NOISE {
                labels[candidate] = next_cluster;
            }
            if visited[candidate] {
                continue;
            }
            visited[candidate] = true;

            let candidate_neighbors = region_query(candidate);
            let candidate_mass: usize = weight(candidate)
                + candidate_neighbors.iter().map(|&j| weight(j)).sum::<usize>();

            if candidate_mass >= min_samples {
                for neighbor in candidate_neighbors {
                    if labels[neighbor] == NOISE {
                        labels[neighbor] = next_cluster;
                    }
                    if !visited[neighbor] {
                        queue.push(neighbor);
                    }
                }
            }
        }

        next_cluster += 1;
    }

    labels
}

/// Validate the shared DBSCAN parameters
///
/// **Private** - fail fast before any expansion work.
fn validate_parameters(n: usize, epsilon: f64, min_samples: usize) -> Result<(), ClusterError> {
    if n == 0 {
        return Err(ClusterError::EmptyInput);
    }
    if !(epsilon > 0.0) {
        return Err(ClusterError::InvalidParameter {
            name: "epsilon",
            message: format!("must be positive, got {}", epsilon),
        });
    }
    if min_samples == 0 {
        return Err(ClusterError::InvalidParameter {
            name: "min_samples",
            message: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// DBSCAN over a precomputed symmetric distance matrix
///
/// **Public** - `min_samples` counts the point itself; label -1 is noise,
/// other labels are contiguous zero-indexed cluster ids in discovery order
pub fn dbscan_precomputed_labels(
    matrix: &DistanceMatrix,
    epsilon: f64,
    min_samples: usize,
) -> Result<Vec<i32>, ClusterError> {
    let n = matrix.size();
    validate_parameters(n, epsilon, min_samples)?;

    let query = |i: usize| {
        matrix
            .row(i)
            .iter()
            .enumerate()
            .filter(|&(j, &d)| j != i && d <= epsilon)
            .map(|(j, _)| j)
            .collect()
    };

    Ok(dbscan_with_query(n, min_samples, query, |_| 1))
}

/// DBSCAN over scalar values with per-value multiplicities
///
/// **Public** - values are typically distinct value-groups and `weights`
/// their invocation counts. The region query walks the sorted order, so a
/// pass costs O(n log n + output).
pub fn dbscan_scalar_labels(
    values: &[f64],
    weights: &[usize],
    epsilon: f64,
    min_samples: usize,
) -> Result<Vec<i32>, ClusterError> {
    let n = values.len();
    validate_parameters(n, epsilon, min_samples)?;
    debug_assert_eq!(weights.len(), n);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut rank = vec![0usize; n];
    for (r, &i) in order.iter().enumerate() {
        rank[i] = r;
    }

    let query = |i: usize| {
        let center = values[i];
        let mut neighbors = Vec::new();

        let mut left = rank[i];
        while left > 0 {
            left -= 1;
            let j = order[left];
            if center - values[j] <= epsilon {
                neighbors.push(j);
            } else {
                break;
            }
        }

        let mut right = rank[i] + 1;
        while right < n {
            let j = order[right];
            if values[j] - center <= epsilon {
                neighbors.push(j);
                right += 1;
            } else {
                break;
            }
        }

        neighbors
    };

    Ok(dbscan_with_query(n, min_samples, query, |i| weights[i]))
}

/// Convert a label vector into cluster buckets plus a noise list
///
/// **Public** - clusters come out zero-indexed and contiguous in label
/// order; both lists are built fresh, never mutated in place.
pub fn labels_to_buckets(labels: &[i32]) -> (Vec<Vec<usize>>, Vec<usize>) {
    let cluster_count = labels
        .iter()
        .copied()
        .max()
        .map_or(0, |m| (m + 1).max(0) as usize);

    let mut clusters = vec![Vec::new(); cluster_count];
    let mut noise = Vec::new();

    for (i, &label) in labels.iter().enumerate() {
        if label == NOISE {
            noise.push(i);
        } else {
            clusters[label as usize].push(i);
        }
    }

    (clusters, noise)
}

/// Precomputed-distance clustering strategy
///
/// **Public** - one DBSCAN pass over the cached matrix, no adaptive retry
///
/// # Arguments
/// * `matrix` - precomputed symmetric distance matrix
/// * `epsilon` - neighborhood radius
/// * `min_samples` - core-point threshold (counts the point itself)
/// * `invocation_sets` - member invocation ids per set, one per matrix row
///
/// # Errors
/// * `ClusterError::InvalidParameter` - bad epsilon/min_samples or a
///   set-count/matrix-size mismatch
pub fn dbscan_precomputed(
    matrix: &DistanceMatrix,
    epsilon: f64,
    min_samples: usize,
    invocation_sets: Vec<Vec<usize>>,
) -> Result<ClusteringInformation, ClusterError> {
    if invocation_sets.len() != matrix.size() {
        return Err(ClusterError::InvalidParameter {
            name: "invocation_sets",
            message: format!(
                "{} sets do not match a {}x{} matrix",
                invocation_sets.len(),
                matrix.size(),
                matrix.size()
            ),
        });
    }

    info!("Clustering using parameters: eps = {:.6}", epsilon);

    let labels = dbscan_precomputed_labels(matrix, epsilon, min_samples)?;
    let (clusters, noise) = labels_to_buckets(&labels);

    info!("Estimated number of clusters: {}", clusters.len());
    info!(
        "Estimated number of noise points: {} ({:.2}%)",
        noise.len(),
        noise.len() as f64 * 100.0 / matrix.size() as f64
    );

    if clusters.len() > 1 {
        if let Some(score) = silhouette_score(matrix, &labels) {
            info!("Silhouette coefficient: {:.3}", score);
        }
    } else {
        debug!("Skipping silhouette score for a single-cluster result");
    }

    ClusteringInformation::new(Some(epsilon), invocation_sets, clusters, noise, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Matrix for points on a line at coordinates 0, 1, 2, 50, 51, 52, 200
    fn line_matrix() -> DistanceMatrix {
        let coords: [f64; 7] = [0.0, 1.0, 2.0, 50.0, 51.0, 52.0, 200.0];
        let n = coords.len();
        let mut data = Vec::with_capacity(n * n);
        for a in coords {
            for b in coords {
                data.push((a - b).abs());
            }
        }
        DistanceMatrix::from_row_major(n, data)
    }

    #[test]
    fn test_precomputed_two_clusters_and_noise() {
        let labels = dbscan_precomputed_labels(&line_matrix(), 1.5, 3).unwrap();

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
        assert_eq!(labels[6], NOISE);
    }

    #[test]
    fn test_precomputed_all_noise() {
        let labels = dbscan_precomputed_labels(&line_matrix(), 0.5, 2).unwrap();
        assert!(labels.iter().all(|&l| l == NOISE));
    }

    #[test]
    fn test_invalid_parameters() {
        let m = line_matrix();
        assert!(dbscan_precomputed_labels(&m, 0.0, 3).is_err());
        assert!(dbscan_precomputed_labels(&m, -1.0, 3).is_err());
        assert!(dbscan_precomputed_labels(&m, 1.0, 0).is_err());
    }

    #[test]
    fn test_scalar_weights_count_toward_density() {
        // Two value-groups within epsilon of each other; the multiplicity
        // of the first makes both core despite only two groups existing
        let values = [0.0, 0.5];
        let weights = [10, 1];

        let labels = dbscan_scalar_labels(&values, &weights, 1.0, 5).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[0], NOISE);
    }

    #[test]
    fn test_scalar_separated_groups() {
        let values = [0.0, 0.1, 0.2, 10.0, 10.1];
        let weights = [1usize; 5];

        let labels = dbscan_scalar_labels(&values, &weights, 0.3, 2).unwrap();

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_labels_to_buckets() {
        let (clusters, noise) = labels_to_buckets(&[0, 1, -1, 0, 1, -1]);

        assert_eq!(clusters, vec![vec![0, 3], vec![1, 4]]);
        assert_eq!(noise, vec![2, 5]);
    }

    #[test]
    fn test_labels_to_buckets_all_noise() {
        let (clusters, noise) = labels_to_buckets(&[-1, -1]);
        assert!(clusters.is_empty());
        assert_eq!(noise, vec![0, 1]);
    }

    #[test]
    fn test_dbscan_precomputed_builds_partition() {
        let sets: Vec<Vec<usize>> = (0..7).map(|i| vec![i]).collect();
        let info = dbscan_precomputed(&line_matrix(), 1.5, 3, sets).unwrap();

        assert_eq!(info.cluster_count(), 2);
        assert_eq!(info.noise_invocation_set_count(), 1);
        assert_eq!(info.epsilon(), Some(1.5));
        assert_eq!(info.invocation_count(), 7);
    }

    #[test]
    fn test_set_count_mismatch_rejected() {
        let sets = vec![vec![0], vec![1]];
        assert!(matches!(
            dbscan_precomputed(&line_matrix(), 1.5, 3, sets),
            Err(ClusterError::InvalidParameter { .. })
        ));
    }
}
