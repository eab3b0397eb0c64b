//! Optional evaluation metadata attached to a clustering result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-cluster evaluation metadata produced by the metric strategies.
///
/// All maps are keyed by the cluster id rendered as a string (JSON object
/// keys); the `coverage` map additionally carries a `"-1"` entry for the
/// noise share. Ordered maps keep serialization deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClusteringExtra {
    /// Fraction of total retired instructions covered by non-noise clusters
    pub instr_coverage: f64,

    /// Fraction of invocations assigned to a cluster (1 - noise fraction)
    pub inv_coverage: f64,

    /// Instruction-mass fraction per cluster id, plus the "-1" noise entry
    pub coverage: BTreeMap<String, f64>,

    /// Representative invocation-set index per cluster id
    pub centroids: BTreeMap<String, usize>,

    /// Average retired instructions per invocation, per cluster id
    pub instructions_metric: BTreeMap<String, f64>,

    /// Average cycles per invocation, per cluster id
    pub cycles_metric: BTreeMap<String, f64>,

    /// IPC computed from summed counters, per cluster id
    pub ipc_metric: BTreeMap<String, f64>,
}

impl ClusteringExtra {
    /// Look up a named per-cluster metric
    ///
    /// Known names: `instructions`, `cycles`, `ipc`.
    pub fn cluster_metric(&self, cluster: usize, name: &str) -> Option<f64> {
        let key = cluster.to_string();
        match name {
            "instructions" => self.instructions_metric.get(&key).copied(),
            "cycles" => self.cycles_metric.get(&key).copied(),
            "ipc" => self.ipc_metric.get(&key).copied(),
            _ => None,
        }
    }

    /// Instruction-mass fraction of one cluster
    pub fn cluster_coverage(&self, cluster: usize) -> Option<f64> {
        self.coverage.get(&cluster.to_string()).copied()
    }

    /// Centroid invocation-set index of one cluster
    pub fn centroid(&self, cluster: usize) -> Option<usize> {
        self.centroids.get(&cluster.to_string()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_metric_lookup() {
        let mut extra = ClusteringExtra::default();
        extra.instructions_metric.insert("0".to_string(), 1234.5);
        extra.ipc_metric.insert("0".to_string(), 1.5);

        assert_eq!(extra.cluster_metric(0, "instructions"), Some(1234.5));
        assert_eq!(extra.cluster_metric(0, "ipc"), Some(1.5));
        assert_eq!(extra.cluster_metric(0, "cycles"), None);
        assert_eq!(extra.cluster_metric(1, "instructions"), None);
        assert_eq!(extra.cluster_metric(0, "unknown"), None);
    }
}
