//! Density clustering strategies and their parameter estimation.
//!
//! Three strategies share the result model: precomputed-distance DBSCAN
//! for memory-access traces, adaptive scalar DBSCAN for instruction
//! counts, and fixed-grid 2D density binning for (instructions, IPC).

mod adaptive;
mod dbscan;
mod epsilon;
mod evaluate;
mod grid;
mod silhouette;

pub use adaptive::{dbscan_instr, AdaptiveParams};
pub use dbscan::{
    dbscan_precomputed, dbscan_precomputed_labels, dbscan_scalar_labels, labels_to_buckets, NOISE,
};
pub use epsilon::{estimate_epsilon_by_coverage, estimate_epsilon_by_knee};
pub use grid::{instr_ipc_density, GridParams};
pub use silhouette::silhouette_score;
