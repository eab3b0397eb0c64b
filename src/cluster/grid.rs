//! Fixed-grid 2D density clustering (`instr-ipc-density` strategy).
//!
//! Builds a 2D histogram over (retired instructions, IPC), starting from a
//! fine grid and coarsening until the heaviest bins cover the target share
//! of the instruction mass. Each selected bin becomes one cluster; all
//! other points are noise. No recursion and no epsilon: granularity only
//! ever shrinks, so the search is a bounded linear scan.

use crate::cluster::evaluate::evaluate_metric_clusters;
use crate::metrics::MeasuredInvocation;
use crate::result::ClusteringInformation;
use crate::utils::error::ClusterError;
use log::{debug, info};

/// Tuning knobs of the 2D density strategy.
#[derive(Debug, Clone)]
pub struct GridParams {
    /// Maximum number of clusters to define
    pub max_clusters: usize,

    /// Minimum bin weight as % of the retained instruction mass
    pub min_weight_pct: f64,

    /// Target instruction-mass coverage (%) of the selected bins
    pub target_coverage_pct: f64,

    /// Top/bottom share (%) of points trimmed as outliers before binning
    pub outlier_pct: f64,

    /// Outlier trimming only applies above this many samples
    pub outlier_minsize_threshold: usize,

    /// Initial (finest) granularity: each bin spans this % of an axis
    pub min_granularity_pct: f64,

    /// Granularity increase per round while coverage is short
    pub granularity_step_pct: f64,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            max_clusters: 20,
            min_weight_pct: 1.0,
            target_coverage_pct: 90.0,
            outlier_pct: 1.0,
            outlier_minsize_threshold: 1000,
            min_granularity_pct: 1.0,
            granularity_step_pct: 1.0,
        }
    }
}

impl GridParams {
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

        pct("min_weight_pct", self.min_weight_pct)?;
        pct("target_coverage_pct", self.target_coverage_pct)?;
        pct("outlier_pct", self.outlier_pct)?;
        pct("min_granularity_pct", self.min_granularity_pct)?;
        pct("granularity_step_pct", self.granularity_step_pct)?;

        if self.max_clusters == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "max_clusters",
                message: "must be positive".to_string(),
            });
        }
        if self.outlier_minsize_threshold == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "outlier_minsize_threshold",
                message: "must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// Selected bins of one grid round: instruction weight plus member point
/// indices, heaviest first
///
/// **Private**
type BinSelection = Vec<(f64, Vec<usize>)>;

/// Cluster invocations on a 2D (instructions, IPC) density grid
///
/// **Public** - entry point of the `instr-ipc-density` strategy
///
/// # Errors
/// * `ClusterError::EmptyInput` - no invocations
/// * `ClusterError::ZeroMetricFloor` - the smallest instruction count is 0
/// * `ClusterError::InvalidParameter` - out-of-range tuning knobs
pub fn instr_ipc_density(
    invocations: &[MeasuredInvocation],
    params: &GridParams,
) -> Result<ClusteringInformation, ClusterError> {
    params.validate()?;

    if invocations.is_empty() {
        return Err(ClusterError::EmptyInput);
    }

    let points: Vec<(f64, f64)> = invocations
        .iter()
        .map(|i| (i.metrics.instructions as f64, i.metrics.ipc()))
        .collect();

    if invocations
        .iter()
        .map(|i| i.metrics.instructions)
        .min()
        .unwrap_or(0)
        == 0
    {
        return Err(ClusterError::ZeroMetricFloor {
            metric: "instructions",
        });
    }

    // Trimmed outliers simply stay unclustered and end up as noise
    let (retained, _outliers) = trim_outliers(&points, params);
    debug!(
        "Retained {} of {} points after outlier trimming",
        retained.len(),
        points.len()
    );

    let total_weight: f64 = retained.iter().map(|&i| points[i].0).sum();
    let selection = search_granularity(&points, &retained, total_weight, params);

    info!(
        "Density grid selected {} clusters covering {:.2}% of retained instructions",
        selection.len(),
        selection.iter().map(|(w, _)| w).sum::<f64>() / total_weight * 100.0
    );

    build_result(invocations, selection)
}

/// Drop the top and bottom share of points by instruction count
///
/// **Private** - only applies above the configured population threshold;
/// returns (retained, outliers), both in ascending index order.
fn trim_outliers(points: &[(f64, f64)], params: &GridParams) -> (Vec<usize>, Vec<usize>) {
    let n = points.len();
    if n <= params.outlier_minsize_threshold {
        return ((0..n).collect(), Vec::new());
    }

    // Both tails are cut; cap so at least one point always survives
    let cut = ((n as f64 * params.outlier_pct / 100.0).floor() as usize).min((n - 1) / 2);
    if cut == 0 {
        return ((0..n).collect(), Vec::new());
    }

    let mut by_weight: Vec<usize> = (0..n).collect();
    by_weight.sort_by(|&a, &b| points[a].0.total_cmp(&points[b].0));

    let mut outliers: Vec<usize> = by_weight[..cut]
        .iter()
        .chain(by_weight[n - cut..].iter())
        .copied()
        .collect();
    outliers.sort_unstable();

    let mut retained: Vec<usize> = by_weight[cut..n - cut].to_vec();
    retained.sort_unstable();

    (retained, outliers)
}

/// Coarsen the grid until the selected bins reach the coverage target
///
/// **Private** - returns the first (finest) satisfying selection, or the
/// finest-grid selection when no round satisfies the target.
fn search_granularity(
    points: &[(f64, f64)],
    retained: &[usize],
    total_weight: f64,
    params: &GridParams,
) -> BinSelection {
    let target = params.target_coverage_pct / 100.0 * total_weight;

    let mut finest: Option<BinSelection> = None;
    let mut granularity = params.min_granularity_pct;

    loop {
        let bins = (100.0 / granularity).round() as usize;
        if bins < 1 {
            break;
        }

        let selection = select_bins(points, retained, bins, total_weight, params);
        let covered: f64 = selection.iter().map(|(w, _)| w).sum();

        debug!(
            "Granularity {:.2}% ({} bins/axis): {} bins cover {:.2}%",
            granularity,
            bins,
            selection.len(),
            covered / total_weight * 100.0
        );

        if finest.is_none() {
            finest = Some(selection.clone());
        }

        if covered >= target {
            return selection;
        }

        granularity += params.granularity_step_pct;
    }

    // The coverage target was never reached; fall back to the finest grid
    finest.unwrap_or_default()
}

/// Histogram one grid round and pick the heaviest qualifying bins
///
/// **Private** - bins are ranked by instruction weight (ties broken by bin
/// index for determinism), filtered by the minimum weight share, and capped
/// at the cluster limit.
fn select_bins(
    points: &[(f64, f64)],
    retained: &[usize],
    bins: usize,
    total_weight: f64,
    params: &GridParams,
) -> BinSelection {
    let (min_x, span_x) = axis_range(retained.iter().map(|&i| points[i].0));
    let (min_y, span_y) = axis_range(retained.iter().map(|&i| points[i].1));

    let mut weights = vec![0.0f64; bins * bins];
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); bins * bins];

    for &index in retained {
        let bx = bin_index(points[index].0, min_x, span_x, bins);
        let by = bin_index(points[index].1, min_y, span_y, bins);
        let bin = bx * bins + by;
        weights[bin] += points[index].0;
        members[bin].push(index);
    }

    let mut occupied: Vec<usize> = (0..bins * bins).filter(|&b| !members[b].is_empty()).collect();
    occupied.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]).then(a.cmp(&b)));

    let min_weight = params.min_weight_pct / 100.0 * total_weight;

    occupied
        .into_iter()
        .filter(|&b| weights[b] >= min_weight)
        .take(params.max_clusters)
        .map(|b| (weights[b], std::mem::take(&mut members[b])))
        .collect()
}

/// Minimum and span of one axis
///
/// **Private**
fn axis_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        return (0.0, 0.0);
    }
    (min, max - min)
}

/// Bin index of a value, with boundary-rounding correction
///
/// **Private** - floating-point division can land a point one bin off its
/// declared range; the index is nudged so the point always falls within
/// `[edge(i), edge(i+1))` (the last bin is closed above).
fn bin_index(value: f64, min: f64, span: f64, bins: usize) -> usize {
    if span == 0.0 || bins <= 1 {
        return 0;
    }

    let width = span / bins as f64;
    let mut index = ((value - min) / width) as usize;
    if index >= bins {
        index = bins - 1;
    }

    let lower = min + index as f64 * width;
    if value < lower && index > 0 {
        index -= 1;
    } else {
        let upper = min + (index + 1) as f64 * width;
        if value >= upper && index + 1 < bins {
            index += 1;
        }
    }

    index
}

/// Assemble the clustering result from the selected bins
///
/// **Private** - each selected bin becomes one invocation set and one
/// cluster; outliers and unselected points become singleton noise sets.
fn build_result(
    invocations: &[MeasuredInvocation],
    selection: BinSelection,
) -> Result<ClusteringInformation, ClusterError> {
    let mut sets: Vec<Vec<usize>> = Vec::new();
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut clustered = vec![false; invocations.len()];

    for (_, members) in selection {
        for &index in &members {
            clustered[index] = true;
        }
        clusters.push(vec![sets.len()]);
        sets.push(members);
    }

    let mut noise: Vec<usize> = Vec::new();
    for index in 0..invocations.len() {
        if !clustered[index] {
            noise.push(sets.len());
            sets.push(vec![index]);
        }
    }

    let extra = evaluate_metric_clusters(invocations, &sets, &clusters, &noise);
    ClusteringInformation::new(None, sets, clusters, noise, Some(extra))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PerformanceMetrics;

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
    fn test_empty_input_rejected() {
        let result = instr_ipc_density(&[], &GridParams::default());
        assert!(matches!(result, Err(ClusterError::EmptyInput)));
    }

    #[test]
    fn test_zero_minimum_metric_rejected() {
        let invocations = vec![invocation(0, 0, 10), invocation(1, 100, 50)];
        let result = instr_ipc_density(&invocations, &GridParams::default());
        assert!(matches!(result, Err(ClusterError::ZeroMetricFloor { .. })));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let invocations = vec![invocation(0, 100, 50)];

        let mut params = GridParams::default();
        params.target_coverage_pct = 0.0;
        assert!(instr_ipc_density(&invocations, &params).is_err());

        let mut params = GridParams::default();
        params.max_clusters = 0;
        assert!(instr_ipc_density(&invocations, &params).is_err());
    }

    #[test]
    fn test_two_dense_blobs_form_two_clusters() {
        let mut invocations = Vec::new();
        let mut index = 0;
        // Blob A: ~200k instructions, IPC ~400; about 17% of the mass, so
        // the 90% coverage target needs both blobs
        for i in 0..40u64 {
            invocations.push(invocation(index, 200_000 + i, 500));
            index += 1;
        }
        // Blob B: ~1M instructions, IPC ~1
        for i in 0..40u64 {
            invocations.push(invocation(index, 1_000_000 + i, 1_000_000));
            index += 1;
        }

        let info = instr_ipc_density(&invocations, &GridParams::default()).unwrap();

        assert_eq!(info.cluster_count(), 2);
        assert_eq!(info.epsilon(), None);
        assert_eq!(info.invocation_count(), 80);
        let extra = info.extra().expect("density strategy attaches metadata");
        assert!(extra.instr_coverage > 0.99);
    }

    #[test]
    fn test_partition_covers_every_invocation() {
        let invocations: Vec<_> = (0..30)
            .map(|i| invocation(i, 100 + (i as u64 * 37) % 1000, 100))
            .collect();

        let info = instr_ipc_density(&invocations, &GridParams::default()).unwrap();

        let clustered: usize = (0..info.cluster_count())
            .map(|c| info.invocation_count_in_cluster(c))
            .sum();
        assert_eq!(clustered + info.noise_invocation_count(), 30);
    }

    #[test]
    fn test_outlier_trimming_marks_noise() {
        let mut params = GridParams::default();
        params.outlier_minsize_threshold = 10;
        params.outlier_pct = 5.0;

        let mut invocations: Vec<_> = (0..100)
            .map(|i| invocation(i, 10_000 + i as u64, 5_000))
            .collect();
        // One extreme outlier at each end
        invocations.push(invocation(100, 1, 1));
        invocations.push(invocation(101, 1_000_000_000, 1));

        let info = instr_ipc_density(&invocations, &params).unwrap();

        use crate::result::ClusterAssignment;
        assert_eq!(
            info.cluster_id_for_invocation(100),
            Some(ClusterAssignment::Noise)
        );
        assert_eq!(
            info.cluster_id_for_invocation(101),
            Some(ClusterAssignment::Noise)
        );
    }

    #[test]
    fn test_bin_index_acceptance() {
        // Every value must land in a bin whose declared range contains it
        let min = 0.0;
        let span = 10.0;
        let bins = 7;
        let width = span / bins as f64;

        let mut value = 0.0;
        while value <= 10.0 {
            let index = bin_index(value, min, span, bins);
            let lower = min + index as f64 * width;
            let upper = min + (index + 1) as f64 * width;
            assert!(
                value >= lower && (value < upper || index == bins - 1),
                "value {} landed outside bin {} [{}, {})",
                value,
                index,
                lower,
                upper
            );
            value += 0.037;
        }
    }

    #[test]
    fn test_bin_index_degenerate_axis() {
        assert_eq!(bin_index(5.0, 5.0, 0.0, 10), 0);
        assert_eq!(bin_index(1.0, 0.0, 2.0, 1), 0);
    }
}
