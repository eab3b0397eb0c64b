//! Clustering result model.
//!
//! [`ClusteringInformation`] is the immutable output of every clustering
//! strategy: invocation sets, their partition into clusters plus noise, the
//! epsilon used, and optional evaluation metadata. Construction validates
//! the partition, so a value of this type is always internally consistent.

mod extra;
mod io;

pub use extra::ClusteringExtra;

use crate::utils::error::ClusterError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Where a single invocation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterAssignment {
    /// Member of the cluster with this index
    Cluster(usize),

    /// Not assigned to any cluster
    Noise,
}

/// Validated partition of invocation sets into clusters and noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringInformation {
    epsilon: Option<f64>,
    invocation_sets: Vec<Vec<usize>>,
    clusters: Vec<Vec<usize>>,
    noise_invocations: Vec<usize>,
    extra: Option<ClusteringExtra>,
}

impl ClusteringInformation {
    /// Build a result, validating the partition invariant
    ///
    /// **Public** - constructor used by all clustering strategies
    ///
    /// # Arguments
    /// * `epsilon` - neighborhood radius used, if the strategy has one
    /// * `invocation_sets` - member invocation ids per set
    /// * `clusters` - invocation-set indices per cluster
    /// * `noise_invocations` - invocation-set indices not in any cluster
    /// * `extra` - optional evaluation metadata
    ///
    /// # Errors
    /// A partition violation is a defect in the calling clusterer, never a
    /// user error: overlapping clusters, duplicated or missing sets, empty
    /// clusters, and out-of-range set indices are all rejected.
    pub fn new(
        epsilon: Option<f64>,
        invocation_sets: Vec<Vec<usize>>,
        clusters: Vec<Vec<usize>>,
        noise_invocations: Vec<usize>,
        extra: Option<ClusteringExtra>,
    ) -> Result<Self, ClusterError> {
        let info = Self {
            epsilon,
            invocation_sets,
            clusters,
            noise_invocations,
            extra,
        };
        info.validate()?;
        Ok(info)
    }

    /// Check the partition invariant
    ///
    /// **Public (crate)** - also run after deserializing from a file.
    pub(crate) fn validate(&self) -> Result<(), ClusterError> {
        let n = self.invocation_sets.len();
        let mut owner: Vec<Option<usize>> = vec![None; n];

        for (cluster_id, cluster) in self.clusters.iter().enumerate() {
            if cluster.is_empty() {
                return Err(ClusterError::EmptyCluster(cluster_id));
            }
            for &set in cluster {
                if set >= n {
                    return Err(ClusterError::UnknownSet(set));
                }
                match owner[set] {
                    Some(first) => {
                        return Err(ClusterError::OverlappingClusters {
                            set,
                            first,
                            second: cluster_id,
                        })
                    }
                    None => owner[set] = Some(cluster_id),
                }
            }
        }

        let mut in_noise = vec![false; n];
        for &set in &self.noise_invocations {
            if set >= n {
                return Err(ClusterError::UnknownSet(set));
            }
            if owner[set].is_some() || in_noise[set] {
                return Err(ClusterError::DuplicateNoiseSet(set));
            }
            in_noise[set] = true;
        }

        for set in 0..n {
            if owner[set].is_none() && !in_noise[set] {
                return Err(ClusterError::UnassignedSet(set));
            }
        }

        Ok(())
    }

    /// Epsilon used by the producing strategy, if any
    pub fn epsilon(&self) -> Option<f64> {
        self.epsilon
    }

    /// Evaluation metadata, when the strategy produced it
    pub fn extra(&self) -> Option<&ClusteringExtra> {
        self.extra.as_ref()
    }

    /// Total number of invocations across all sets
    pub fn invocation_count(&self) -> usize {
        self.invocation_sets.iter().map(Vec::len).sum()
    }

    /// Number of invocations inside one cluster
    ///
    /// # Panics
    /// Panics if `cluster` is out of range.
    pub fn invocation_count_in_cluster(&self, cluster: usize) -> usize {
        self.clusters[cluster]
            .iter()
            .map(|&set| self.invocation_sets[set].len())
            .sum()
    }

    /// Number of invocation sets
    pub fn invocation_set_count(&self) -> usize {
        self.invocation_sets.len()
    }

    /// Number of clusters
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Member invocation ids of one set
    ///
    /// # Panics
    /// Panics if `set` is out of range.
    pub fn invocations_in_set(&self, set: usize) -> &[usize] {
        &self.invocation_sets[set]
    }

    /// All invocation ids in one cluster, in set order
    ///
    /// # Panics
    /// Panics if `cluster` is out of range.
    pub fn invocations_in_cluster(&self, cluster: usize) -> Vec<usize> {
        self.clusters[cluster]
            .iter()
            .flat_map(|&set| self.invocation_sets[set].iter().copied())
            .collect()
    }

    /// Invocation-set indices considered noise
    pub fn noise_invocation_sets(&self) -> &[usize] {
        &self.noise_invocations
    }

    /// Number of noise invocation sets
    pub fn noise_invocation_set_count(&self) -> usize {
        self.noise_invocations.len()
    }

    /// Total number of invocations in noise sets
    pub fn noise_invocation_count(&self) -> usize {
        self.noise_invocations
            .iter()
            .map(|&set| self.invocation_sets[set].len())
            .sum()
    }

    /// All invocation ids belonging to noise sets
    pub fn all_noise_invocations(&self) -> Vec<usize> {
        self.noise_invocations
            .iter()
            .flat_map(|&set| self.invocation_sets[set].iter().copied())
            .collect()
    }

    /// Locate an invocation id: its cluster, noise, or `None` when the id
    /// does not exist in any set
    pub fn cluster_id_for_invocation(&self, invocation_id: usize) -> Option<ClusterAssignment> {
        for &set in &self.noise_invocations {
            if self.invocation_sets[set].contains(&invocation_id) {
                return Some(ClusterAssignment::Noise);
            }
        }

        for (cluster_id, cluster) in self.clusters.iter().enumerate() {
            for &set in cluster {
                if self.invocation_sets[set].contains(&invocation_id) {
                    return Some(ClusterAssignment::Cluster(cluster_id));
                }
            }
        }

        None
    }

    /// Deterministic representative of a cluster: the first member of the
    /// first set that is not in `ignore`
    ///
    /// # Panics
    /// Panics if `cluster` is out of range.
    pub fn invocation_in_cluster(&self, cluster: usize, ignore: &[usize]) -> Option<usize> {
        self.clusters[cluster]
            .iter()
            .flat_map(|&set| self.invocation_sets[set].iter().copied())
            .find(|id| !ignore.contains(id))
    }

    /// Random representative of a cluster, drawn from a caller-supplied RNG
    ///
    /// # Panics
    /// Panics if `cluster` is out of range.
    pub fn random_invocation_in_cluster<R: Rng>(
        &self,
        cluster: usize,
        ignore: &[usize],
        rng: &mut R,
    ) -> Option<usize> {
        let candidates: Vec<usize> = self.clusters[cluster]
            .iter()
            .flat_map(|&set| self.invocation_sets[set].iter().copied())
            .filter(|id| !ignore.contains(id))
            .collect();

        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rng.gen_range(0..candidates.len())])
    }

    /// Deterministic representative per noise set: the first member not in
    /// `ignore`; sets with no eligible member are skipped
    pub fn noise_representatives(&self, ignore: &[usize]) -> Vec<usize> {
        self.noise_invocations
            .iter()
            .filter_map(|&set| {
                self.invocation_sets[set]
                    .iter()
                    .copied()
                    .find(|id| !ignore.contains(id))
            })
            .collect()
    }

    /// Random representative per noise set, drawn from a caller-supplied
    /// RNG; sets with no eligible member are skipped
    pub fn random_noise_invocations<R: Rng>(&self, ignore: &[usize], rng: &mut R) -> Vec<usize> {
        self.noise_invocations
            .iter()
            .filter_map(|&set| {
                let members: Vec<usize> = self.invocation_sets[set]
                    .iter()
                    .copied()
                    .filter(|id| !ignore.contains(id))
                    .collect();
                if members.is_empty() {
                    None
                } else {
                    Some(members[rng.gen_range(0..members.len())])
                }
            })
            .collect()
    }

    /// Instruction coverage as a percentage: whole run (`None`) or one
    /// cluster. Returns -1.0 when no evaluation metadata is present.
    pub fn instruction_coverage(&self, cluster: Option<usize>) -> f64 {
        let Some(extra) = &self.extra else {
            return -1.0;
        };

        match cluster {
            None => extra.instr_coverage * 100.0,
            Some(c) => extra.cluster_coverage(c).map_or(-1.0, |f| f * 100.0),
        }
    }

    /// Invocation coverage as a percentage: share of invocations assigned
    /// to any cluster (`None`) or to one cluster
    pub fn invocation_coverage(&self, cluster: Option<usize>) -> f64 {
        let total = self.invocation_count();
        if total == 0 {
            return 0.0;
        }

        let covered = match cluster {
            None => total - self.noise_invocation_count(),
            Some(c) => self.invocation_count_in_cluster(c),
        };

        covered as f64 / total as f64 * 100.0
    }

    /// Named per-cluster metric from the evaluation metadata; -1.0 when the
    /// metadata or the metric is absent
    pub fn extra_cluster_metric(&self, cluster: usize, name: &str) -> f64 {
        self.extra
            .as_ref()
            .and_then(|extra| extra.cluster_metric(cluster, name))
            .unwrap_or(-1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The reference fixture: 15 invocations in 5 sets of 3; clusters
    /// {1,3} and {0}; noise {2,4}.
    fn fixture() -> ClusteringInformation {
        ClusteringInformation::new(
            Some(0.5),
            vec![
                vec![0, 1, 2],
                vec![3, 4, 5],
                vec![6, 7, 8],
                vec![9, 10, 11],
                vec![12, 13, 14],
            ],
            vec![vec![1, 3], vec![0]],
            vec![2, 4],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_counts() {
        let ci = fixture();

        assert_eq!(ci.invocation_count(), 15);
        assert_eq!(ci.invocation_set_count(), 5);
        assert_eq!(ci.cluster_count(), 2);
        assert_eq!(ci.invocation_count_in_cluster(0), 6);
        assert_eq!(ci.noise_invocation_count(), 6);
        assert_eq!(ci.noise_invocation_set_count(), 2);
    }

    #[test]
    fn test_membership() {
        let ci = fixture();

        assert_eq!(ci.invocations_in_cluster(0), vec![3, 4, 5, 9, 10, 11]);
        assert_eq!(ci.invocations_in_set(1), &[3, 4, 5]);
        assert_eq!(ci.all_noise_invocations(), vec![6, 7, 8, 12, 13, 14]);
    }

    #[test]
    fn test_cluster_id_for_invocation() {
        let ci = fixture();

        assert_eq!(
            ci.cluster_id_for_invocation(1),
            Some(ClusterAssignment::Cluster(1))
        );
        assert_eq!(
            ci.cluster_id_for_invocation(3),
            Some(ClusterAssignment::Cluster(0))
        );
        assert_eq!(
            ci.cluster_id_for_invocation(7),
            Some(ClusterAssignment::Noise)
        );
        assert_eq!(ci.cluster_id_for_invocation(999), None);
    }

    #[test]
    fn test_representatives() {
        let ci = fixture();

        assert_eq!(ci.invocation_in_cluster(0, &[]), Some(3));
        assert_eq!(ci.invocation_in_cluster(0, &[3]), Some(4));
        assert_eq!(ci.noise_representatives(&[]), vec![6, 12]);
        assert_eq!(ci.noise_representatives(&[6, 7, 8]), vec![12]);
    }

    #[test]
    fn test_seeded_random_representatives_are_deterministic() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let ci = fixture();

        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);

        assert_eq!(
            ci.random_invocation_in_cluster(0, &[], &mut a),
            ci.random_invocation_in_cluster(0, &[], &mut b)
        );
        assert_eq!(
            ci.random_noise_invocations(&[], &mut a),
            ci.random_noise_invocations(&[], &mut b)
        );
    }

    #[test]
    fn test_overlapping_clusters_rejected() {
        let result = ClusteringInformation::new(
            Some(0.5),
            vec![vec![0], vec![1], vec![2]],
            vec![vec![0, 1], vec![1]],
            vec![2],
            None,
        );

        assert!(matches!(
            result,
            Err(ClusterError::OverlappingClusters { set: 1, .. })
        ));
    }

    #[test]
    fn test_unassigned_set_rejected() {
        let result = ClusteringInformation::new(
            Some(0.5),
            vec![vec![0], vec![1]],
            vec![vec![0]],
            vec![],
            None,
        );

        assert!(matches!(result, Err(ClusterError::UnassignedSet(1))));
    }

    #[test]
    fn test_set_in_cluster_and_noise_rejected() {
        let result = ClusteringInformation::new(
            Some(0.5),
            vec![vec![0], vec![1]],
            vec![vec![0]],
            vec![0, 1],
            None,
        );

        assert!(matches!(result, Err(ClusterError::DuplicateNoiseSet(0))));
    }

    #[test]
    fn test_empty_cluster_rejected() {
        let result = ClusteringInformation::new(
            Some(0.5),
            vec![vec![0]],
            vec![vec![]],
            vec![0],
            None,
        );

        assert!(matches!(result, Err(ClusterError::EmptyCluster(0))));
    }

    #[test]
    fn test_coverage_sentinels_without_extra() {
        let ci = fixture();

        assert_eq!(ci.instruction_coverage(None), -1.0);
        assert_eq!(ci.extra_cluster_metric(0, "instructions"), -1.0);
        // Invocation coverage is structural: 9 of 15 invocations clustered
        assert_eq!(ci.invocation_coverage(None), 60.0);
        assert_eq!(ci.invocation_coverage(Some(0)), 40.0);
    }
}
