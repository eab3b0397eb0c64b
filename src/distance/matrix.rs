//! Dense symmetric distance matrix.

/// n×n pairwise distance matrix, row-major, read-only after construction.
///
/// Invariants: `d(i,j) == d(j,i)` and `d(i,i) == 0` hold by construction
/// when built from a symmetric distance function.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Assemble a matrix from row-major data
    ///
    /// **Public (crate)** - built by the distance engine; `data` must hold
    /// exactly n² elements.
    pub(crate) fn from_row_major(n: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), n * n);
        Self { n, data }
    }

    /// Number of items (rows/columns)
    pub fn size(&self) -> usize {
        self.n
    }

    /// Distance between items `i` and `j`
    ///
    /// # Panics
    /// Panics if `i` or `j` is out of range.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    /// Full row of distances from item `i`
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Per-item distance to its nearest other item (row minimum excluding
    /// the diagonal). Requires at least two items to be meaningful; for a
    /// single item the result is empty.
    pub fn nearest_neighbor_distances(&self) -> Vec<f64> {
        if self.n < 2 {
            return Vec::new();
        }

        (0..self.n)
            .map(|i| {
                self.row(i)
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, d)| *d)
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }
}
