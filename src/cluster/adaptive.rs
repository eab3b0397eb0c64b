//! Adaptive scalar-metric clustering (`instr` strategy).
//!
//! Clusters invocations by retired-instruction count, re-parametrizing
//! itself until a target cluster count is reached. The retry/recursion of
//! the procedure is driven by an explicit work queue with a hard depth
//! bound: every queued step either shrinks epsilon tenfold or descends into
//! a strictly smaller noise subset, so the machine terminates by
//! construction.

use crate::cluster::dbscan::{dbscan_scalar_labels, labels_to_buckets};
use crate::cluster::epsilon::estimate_epsilon_by_knee;
use crate::cluster::evaluate::evaluate_metric_clusters;
use crate::metrics::MeasuredInvocation;
use crate::result::ClusteringInformation;
use crate::utils::config::{
    EPSILON_SHRINK_DIVISOR, MAX_ADAPTIVE_DEPTH, SINGLE_CLUSTER_NOISE_FRACTION,
};
use crate::utils::error::ClusterError;
use log::{debug, info};
use std::collections::HashMap;

/// Tuning knobs of the adaptive scalar strategy.
///
/// Percentages are expressed over the full scaled value range (distances)
/// or the population size (cluster size).
#[derive(Debug, Clone)]
pub struct AdaptiveParams {
    /// Below this many distinct values, each value seeds its own cluster
    pub uniq_value_threshold: usize,

    /// Distance (%) under which two points are considered equal
    pub min_distance_pct: f64,

    /// Distance (%) above which two points never share a cluster
    pub max_distance_pct: f64,

    /// Minimum cluster membership as % of the population
    pub min_cluster_size_pct: f64,

    /// Desired lower bound on the number of clusters (goal, not guarantee)
    pub min_cluster_count: usize,

    /// Hard upper bound used when promoting noise to singleton clusters
    pub max_cluster_count: usize,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            uniq_value_threshold: 50,
            min_distance_pct: 0.1,
            max_distance_pct: 5.0,
            min_cluster_size_pct: 1.0,
            min_cluster_count: 10,
            max_cluster_count: 50,
        }
    }
}

impl AdaptiveParams {
    /// Reject out-of-range parameters before any computation
    pub fn validate(&self) -> Result<(), ClusterError> {
        let pct = |name: &'static str, value: f64| {
            if value > 0.0 && value <= 100.0 {
                Ok(())
            } else {
                Err(ClusterError::InvalidParameter {
                    name,
                    message: format!("must be within (0, 100], got {}", value),
                })
            }
        };

        pct("min_distance_pct", self.min_distance_pct)?;
        pct("max_distance_pct", self.max_distance_pct)?;
        pct("min_cluster_size_pct", self.min_cluster_size_pct)?;

        if self.uniq_value_threshold == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "uniq_value_threshold",
                message: "must be positive".to_string(),
            });
        }
        if self.max_cluster_count == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "max_cluster_count",
                message: "must be positive".to_string(),
            });
        }
        if self.max_cluster_count <= self.min_cluster_count {
            return Err(ClusterError::InvalidParameter {
                name: "max_cluster_count",
                message: format!(
                    "must be greater than min_cluster_count ({} <= {})",
                    self.max_cluster_count, self.min_cluster_count
                ),
            });
        }
        if self.max_distance_pct <= self.min_distance_pct {
            return Err(ClusterError::InvalidParameter {
                name: "max_distance_pct",
                message: format!(
                    "must be greater than min_distance_pct ({} <= {})",
                    self.max_distance_pct, self.min_distance_pct
                ),
            });
        }

        Ok(())
    }
}

/// One queued unit of clustering work
///
/// **Private** - `retry` carries the tightened parameters of a
/// single-cluster retry; a fresh step re-estimates its own.
struct Step {
    set_indices: Vec<usize>,
    depth: usize,
    retry: Option<(f64, usize)>,
}

/// Cluster invocations by retired-instruction count, adapting parameters
/// until the cluster-count goal is met
///
/// **Public** - entry point of the `instr` strategy
///
/// # Errors
/// * `ClusterError::EmptyInput` - no invocations
/// * `ClusterError::ZeroMetricFloor` - the smallest instruction count is 0
/// * `ClusterError::InvalidParameter` - out-of-range tuning knobs
pub fn dbscan_instr(
    invocations: &[MeasuredInvocation],
    params: &AdaptiveParams,
) -> Result<ClusteringInformation, ClusterError> {
    params.validate()?;

    if invocations.is_empty() {
        return Err(ClusterError::EmptyInput);
    }

    let raw: Vec<u64> = invocations.iter().map(|i| i.metrics.instructions).collect();
    let min = raw.iter().copied().min().unwrap_or(0);
    let max = raw.iter().copied().max().unwrap_or(0);

    if min == 0 {
        return Err(ClusterError::ZeroMetricFloor {
            metric: "instructions",
        });
    }

    // Identical counts collapse into one invocation set; clustering then
    // works over value-groups weighted by their multiplicity
    let (sets, set_values) = group_by_value(&raw);
    let weights: Vec<usize> = sets.iter().map(Vec::len).collect();

    info!(
        "Clustering {} invocations ({} distinct instruction counts)",
        invocations.len(),
        sets.len()
    );

    if max == min {
        // One distinct value: trivially a single cluster, no noise
        let extra = evaluate_metric_clusters(invocations, &sets, &[vec![0]], &[]);
        return ClusteringInformation::new(
            Some(params.min_distance_pct / 100.0),
            sets,
            vec![vec![0]],
            Vec::new(),
            Some(extra),
        );
    }

    let span = (max - min) as f64;
    let scaled: Vec<f64> = set_values
        .iter()
        .map(|&v| (v - min) as f64 / span)
        .collect();

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut noise: Vec<usize> = Vec::new();
    let mut initial_epsilon = None;

    let mut pending = vec![Step {
        set_indices: (0..sets.len()).collect(),
        depth: 0,
        retry: None,
    }];

    while let Some(step) = pending.pop() {
        let sub_scaled: Vec<f64> = step.set_indices.iter().map(|&s| scaled[s]).collect();
        let sub_weights: Vec<usize> = step.set_indices.iter().map(|&s| weights[s]).collect();
        let sub_population: usize = sub_weights.iter().sum();

        let (epsilon, min_samples) = match step.retry {
            Some(tightened) => tightened,
            None => initial_parameters(&sub_scaled, sub_population, params)?,
        };
        if initial_epsilon.is_none() {
            initial_epsilon = Some(epsilon);
        }

        debug!(
            "Pass at depth {}: {} value-groups, eps = {:.6}, min_samples = {}",
            step.depth,
            step.set_indices.len(),
            epsilon,
            min_samples
        );

        let labels = dbscan_scalar_labels(&sub_scaled, &sub_weights, epsilon, min_samples)?;
        let (local_clusters, local_noise) = labels_to_buckets(&labels);

        let noise_weight: usize = local_noise.iter().map(|&l| sub_weights[l]).sum();

        if local_clusters.len() < params.min_cluster_count {
            let collapsed = local_clusters.len() == 1
                && noise_weight as f64 <= SINGLE_CLUSTER_NOISE_FRACTION * sub_population as f64;

            if collapsed && step.depth < MAX_ADAPTIVE_DEPTH {
                debug!("Single collapsed cluster; retrying with eps / 10");
                pending.push(Step {
                    set_indices: step.set_indices,
                    depth: step.depth + 1,
                    retry: Some((
                        epsilon / EPSILON_SHRINK_DIVISOR,
                        (min_samples / 10).max(1),
                    )),
                });
                continue;
            }

            if clusters.len() + local_clusters.len() + local_noise.len()
                <= params.max_cluster_count
            {
                debug!(
                    "Promoting {} noise value-groups to singleton clusters",
                    local_noise.len()
                );
                commit_clusters(&mut clusters, &local_clusters, &step.set_indices);
                for &local in &local_noise {
                    clusters.push(vec![step.set_indices[local]]);
                }
                continue;
            }

            if step.depth < MAX_ADAPTIVE_DEPTH
                && !local_noise.is_empty()
                && local_noise.len() < step.set_indices.len()
            {
                debug!(
                    "Subdividing {} noise value-groups at depth {}",
                    local_noise.len(),
                    step.depth + 1
                );
                commit_clusters(&mut clusters, &local_clusters, &step.set_indices);
                pending.push(Step {
                    set_indices: local_noise.iter().map(|&l| step.set_indices[l]).collect(),
                    depth: step.depth + 1,
                    retry: None,
                });
                continue;
            }
        }

        commit_clusters(&mut clusters, &local_clusters, &step.set_indices);
        noise.extend(local_noise.iter().map(|&l| step.set_indices[l]));
    }

    info!(
        "Adaptive clustering produced {} clusters, {} noise sets",
        clusters.len(),
        noise.len()
    );

    let extra = evaluate_metric_clusters(invocations, &sets, &clusters, &noise);
    ClusteringInformation::new(initial_epsilon, sets, clusters, noise, Some(extra))
}

/// Group invocation indices by identical raw value, in encounter order
///
/// **Private** - returns the member lists and the value of each group.
fn group_by_value(raw: &[u64]) -> (Vec<Vec<usize>>, Vec<u64>) {
    let mut by_value: HashMap<u64, usize> = HashMap::new();
    let mut sets: Vec<Vec<usize>> = Vec::new();
    let mut values: Vec<u64> = Vec::new();

    for (index, &value) in raw.iter().enumerate() {
        match by_value.get(&value) {
            Some(&set) => sets[set].push(index),
            None => {
                by_value.insert(value, sets.len());
                sets.push(vec![index]);
                values.push(value);
            }
        }
    }

    (sets, values)
}

/// Map a pass's local cluster buckets back into the parent index space
///
/// **Private** - appends to the accumulated cluster list.
fn commit_clusters(
    clusters: &mut Vec<Vec<usize>>,
    local_clusters: &[Vec<usize>],
    set_indices: &[usize],
) {
    for local in local_clusters {
        clusters.push(local.iter().map(|&l| set_indices[l]).collect());
    }
}

/// Epsilon and min_samples for a fresh pass over a subset
///
/// **Private** - few distinct values force the equality threshold with
/// min_samples 1 so each value seeds its own cluster; otherwise the knee
/// estimator runs and its result is clamped into the configured band.
fn initial_parameters(
    sub_scaled: &[f64],
    population: usize,
    params: &AdaptiveParams,
) -> Result<(f64, usize), ClusterError> {
    let floor = params.min_distance_pct / 100.0;
    let cap = params.max_distance_pct / 100.0;

    if sub_scaled.len() < params.uniq_value_threshold || sub_scaled.len() < 2 {
        debug!(
            "{} distinct values below threshold {}; forcing eps to the equality threshold",
            sub_scaled.len(),
            params.uniq_value_threshold
        );
        return Ok((floor, 1));
    }

    let epsilon = estimate_epsilon_by_knee(sub_scaled, floor)?.clamp(floor, cap);
    let min_samples = ((population as f64 * params.min_cluster_size_pct / 100.0).round() as usize)
        .max(1);

    Ok((epsilon, min_samples))
}
