//! Evaluation metadata for metric-based clustering results.
//!
//! Computes coverage fractions, per-cluster counter averages, and
//! geometric-mean centroids from the final partition. Averaged ratios are
//! never used: IPC comes from summed instructions over summed cycles.

use crate::metrics::{MeasuredInvocation, PerformanceMetrics};
use crate::result::ClusteringExtra;
use crate::utils::config::NOISE_COVERAGE_KEY;

/// Build the evaluation metadata for a metric-based partition
///
/// **Public (crate)** - callers guarantee a non-empty input with a strictly
/// positive total instruction count.
pub(crate) fn evaluate_metric_clusters(
    invocations: &[MeasuredInvocation],
    invocation_sets: &[Vec<usize>],
    clusters: &[Vec<usize>],
    noise: &[usize],
) -> ClusteringExtra {
    let total = PerformanceMetrics::aggregate(invocations.iter().map(|i| &i.metrics));
    let total_instructions = total.instructions as f64;
    let total_invocations = invocations.len();

    let mut extra = ClusteringExtra::default();
    let mut clustered_instructions = 0u64;
    let mut clustered_invocations = 0usize;

    for (cluster_id, cluster) in clusters.iter().enumerate() {
        let member_ids: Vec<usize> = cluster
            .iter()
            .flat_map(|&set| invocation_sets[set].iter().copied())
            .collect();
        let aggregated =
            PerformanceMetrics::aggregate(member_ids.iter().map(|&id| &invocations[id].metrics));

        clustered_instructions += aggregated.instructions;
        clustered_invocations += member_ids.len();

        let key = cluster_id.to_string();
        let count = member_ids.len() as f64;
        extra
            .coverage
            .insert(key.clone(), aggregated.instructions as f64 / total_instructions);
        extra
            .instructions_metric
            .insert(key.clone(), aggregated.instructions as f64 / count);
        extra
            .cycles_metric
            .insert(key.clone(), aggregated.cycles as f64 / count);
        extra.ipc_metric.insert(key.clone(), aggregated.ipc());

        if let Some(centroid) = select_centroid(invocations, invocation_sets, cluster) {
            extra.centroids.insert(key, centroid);
        }
    }

    let noise_metrics = PerformanceMetrics::aggregate(
        noise
            .iter()
            .flat_map(|&set| invocation_sets[set].iter().copied())
            .map(|id| &invocations[id].metrics)
            .collect::<Vec<_>>(),
    );
    extra.coverage.insert(
        NOISE_COVERAGE_KEY.to_string(),
        noise_metrics.instructions as f64 / total_instructions,
    );

    extra.instr_coverage = clustered_instructions as f64 / total_instructions;
    extra.inv_coverage = clustered_invocations as f64 / total_invocations as f64;

    extra
}

/// Pick the member set closest to the cluster's geometric mean
///
/// **Private** - distances are Euclidean in (instructions, IPC) space with
/// each axis normalized by its geometric mean, so the two scales contribute
/// comparably. When any IPC is non-positive the IPC axis is dropped.
fn select_centroid(
    invocations: &[MeasuredInvocation],
    invocation_sets: &[Vec<usize>],
    cluster: &[usize],
) -> Option<usize> {
    let member_ids: Vec<usize> = cluster
        .iter()
        .flat_map(|&set| invocation_sets[set].iter().copied())
        .collect();
    if member_ids.is_empty() {
        return None;
    }

    let use_ipc = member_ids
        .iter()
        .all(|&id| invocations[id].metrics.ipc() > 0.0);

    let gm_instructions = geometric_mean(
        member_ids
            .iter()
            .map(|&id| invocations[id].metrics.instructions as f64),
    );
    let gm_ipc = if use_ipc {
        geometric_mean(member_ids.iter().map(|&id| invocations[id].metrics.ipc()))
    } else {
        1.0
    };

    let mut best: Option<(usize, f64)> = None;
    for &set in cluster {
        let aggregated = PerformanceMetrics::aggregate(
            invocation_sets[set]
                .iter()
                .map(|&id| &invocations[id].metrics),
        );
        let count = invocation_sets[set].len() as f64;
        let instructions = aggregated.instructions as f64 / count;

        let di = (instructions - gm_instructions) / gm_instructions;
        let distance = if use_ipc {
            let dp = (aggregated.ipc() - gm_ipc) / gm_ipc;
            (di * di + dp * dp).sqrt()
        } else {
            di.abs()
        };

        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((set, distance)),
        }
    }

    best.map(|(set, _)| set)
}

/// Geometric mean of strictly positive values
///
/// **Private** - computed in log space for numeric stability.
fn geometric_mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut log_sum = 0.0;
    let mut count = 0usize;
    for value in values {
        log_sum += value.ln();
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    (log_sum / count as f64).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(index: usize, instructions: u64, cycles: u64) -> MeasuredInvocation {
        MeasuredInvocation {
            index,
            metrics: PerformanceMetrics {
                time_us: 1,
                instructions,
                cycles,
                mem_instructions: 10,
                cache_misses: 1,
            },
        }
    }

    #[test]
    fn test_coverage_fractions() {
        let invocations = vec![
            invocation(0, 900, 450),
            invocation(1, 50, 25),
            invocation(2, 50, 25),
        ];
        let sets = vec![vec![0], vec![1], vec![2]];
        let clusters = vec![vec![0]];
        let noise = vec![1, 2];

        let extra = evaluate_metric_clusters(&invocations, &sets, &clusters, &noise);

        assert_eq!(extra.instr_coverage, 0.9);
        assert_eq!(extra.inv_coverage, 1.0 / 3.0);
        assert_eq!(extra.coverage["0"], 0.9);
        assert_eq!(extra.coverage["-1"], 0.1);
    }

    #[test]
    fn test_cluster_averages_use_summed_counters() {
        let invocations = vec![invocation(0, 1000, 1000), invocation(1, 3000, 1000)];
        let sets = vec![vec![0], vec![1]];
        let clusters = vec![vec![0, 1]];

        let extra = evaluate_metric_clusters(&invocations, &sets, &clusters, &[]);

        assert_eq!(extra.instructions_metric["0"], 2000.0);
        assert_eq!(extra.cycles_metric["0"], 1000.0);
        // 4000 instructions over 2000 cycles, not the mean of 1.0 and 3.0
        assert_eq!(extra.ipc_metric["0"], 2.0);
    }

    #[test]
    fn test_centroid_is_nearest_to_geometric_mean() {
        // Geometric mean of {100, 10000} is 1000; the middle set sits on it
        let invocations = vec![
            invocation(0, 100, 100),
            invocation(1, 1000, 1000),
            invocation(2, 10000, 10000),
        ];
        let sets = vec![vec![0], vec![1], vec![2]];
        let clusters = vec![vec![0, 1, 2]];

        let extra = evaluate_metric_clusters(&invocations, &sets, &clusters, &[]);

        assert_eq!(extra.centroids["0"], 1);
    }

    #[test]
    fn test_centroid_without_ipc_axis() {
        // Zero cycles force the 1-D fallback
        let invocations = vec![
            invocation(0, 100, 0),
            invocation(1, 1000, 0),
            invocation(2, 10000, 0),
        ];
        let sets = vec![vec![0], vec![1], vec![2]];
        let clusters = vec![vec![0, 1, 2]];

        let extra = evaluate_metric_clusters(&invocations, &sets, &clusters, &[]);

        assert_eq!(extra.centroids["0"], 1);
    }

    #[test]
    fn test_empty_noise_has_zero_coverage() {
        let invocations = vec![invocation(0, 100, 50)];
        let sets = vec![vec![0]];
        let clusters = vec![vec![0]];

        let extra = evaluate_metric_clusters(&invocations, &sets, &clusters, &[]);

        assert_eq!(extra.coverage["-1"], 0.0);
        assert_eq!(extra.inv_coverage, 1.0);
    }
}
