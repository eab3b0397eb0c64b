//! Pairwise distance computation over invocation sets.

mod engine;
mod matrix;

pub use engine::{disjoint_sets, DistanceEngine};
pub use matrix::DistanceMatrix;
