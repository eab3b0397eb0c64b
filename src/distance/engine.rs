//! Parallel pairwise distance-matrix construction.
//!
//! The matrix build is the numeric bottleneck of a run: O(n²) distance
//! evaluations. Row indices are split into `min(n, workers)` contiguous
//! chunks; each worker computes the full rows of its chunk against all n
//! columns and returns a dense sub-matrix, and the sub-matrices are
//! concatenated in dispatch order. Workers share nothing mutable.

use crate::distance::matrix::DistanceMatrix;
use crate::trace::InvocationSet;
use crate::utils::error::ClusterError;
use log::info;
use rayon::prelude::*;

/// Distance between two invocation sets, combining page-count difference
/// and set dissimilarity:
///
/// ```text
/// sqrt((|A| - |B|)² + |A △ B|²)
/// ```
///
/// Symmetric by construction and zero iff the page sets are equal.
pub fn disjoint_sets(a: &InvocationSet, b: &InvocationSet) -> f64 {
    let count_diff = a.page_count() as f64 - b.page_count() as f64;
    let sym_diff = symmetric_difference_len(&a.pages, &b.pages) as f64;
    (count_diff * count_diff + sym_diff * sym_diff).sqrt()
}

/// Size of the symmetric difference of two strictly-increasing slices
///
/// **Private** - linear merge walk; no allocation.
fn symmetric_difference_len(a: &[i64], b: &[i64]) -> usize {
    let mut count = 0;
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                count += 1;
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                count += 1;
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }

    count + (a.len() - i) + (b.len() - j)
}

/// Computes the distance matrix over a worker pool and caches the result.
///
/// The matrix is computed at most once per analysis run; repeated calls
/// return the cached matrix.
#[derive(Debug)]
pub struct DistanceEngine {
    workers: usize,
    matrix: Option<DistanceMatrix>,
}

impl DistanceEngine {
    /// Create an engine with a bounded worker count (at least 1)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            matrix: None,
        }
    }

    /// Whether the matrix has already been computed
    pub fn is_computed(&self) -> bool {
        self.matrix.is_some()
    }

    /// Compute (or return the cached) distance matrix
    ///
    /// **Public** - main entry point
    ///
    /// # Arguments
    /// * `items` - read-only item collection, shared with all workers
    /// * `distance` - symmetric pairwise distance function, `d(a,b) >= 0`
    ///
    /// # Errors
    /// * `ClusterError::EmptyInput` - no items
    /// * `ClusterError::WorkerPool` - the pool could not be built
    pub fn compute<T, F>(&mut self, items: &[T], distance: F) -> Result<&DistanceMatrix, ClusterError>
    where
        T: Sync,
        F: Fn(&T, &T) -> f64 + Sync,
    {
        if self.matrix.is_none() {
            self.matrix = Some(compute_matrix(items, distance, self.workers)?);
        }

        match &self.matrix {
            Some(matrix) => Ok(matrix),
            // The cache was filled just above; this arm cannot be reached
            None => Err(ClusterError::EmptyInput),
        }
    }

    /// Cached matrix, if any
    pub fn matrix(&self) -> Option<&DistanceMatrix> {
        self.matrix.as_ref()
    }
}

/// One-shot parallel matrix build
///
/// **Private** - used by the engine's cache-miss path.
fn compute_matrix<T, F>(items: &[T], distance: F, workers: usize) -> Result<DistanceMatrix, ClusterError>
where
    T: Sync,
    F: Fn(&T, &T) -> f64 + Sync,
{
    let n = items.len();
    if n == 0 {
        return Err(ClusterError::EmptyInput);
    }

    let workers = workers.min(n);
    let chunk = n.div_ceil(workers);

    info!("Generating {}x{} distance matrix with {} workers", n, n, workers);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| ClusterError::WorkerPool(e.to_string()))?;

    let chunk_starts: Vec<usize> = (0..n).step_by(chunk).collect();

    // Each worker returns its rows as an owned dense block; the parallel
    // collect preserves dispatch order, so concatenation reassembles the
    // matrix row-by-row.
    let submatrices: Vec<Vec<f64>> = pool.install(|| {
        chunk_starts
            .into_par_iter()
            .map(|start| {
                let end = (start + chunk).min(n);
                let mut rows = Vec::with_capacity((end - start) * n);
                for i in start..end {
                    for item in items {
                        rows.push(distance(&items[i], item));
                    }
                }
                rows
            })
            .collect()
    });

    let mut data = Vec::with_capacity(n * n);
    for submatrix in submatrices {
        data.extend(submatrix);
    }

    Ok(DistanceMatrix::from_row_major(n, data))
}
