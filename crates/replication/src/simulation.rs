//! One Monte Carlo trial: populate a cluster, fail a fraction of its nodes and check for lost chunks.

use std::collections::HashSet;

use itertools::Itertools;
use rand::seq::index;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{
    analytic::FAILURE_FRACTION,
    cluster::{Copyset, NodeId},
    error::Result,
    placement_generator::PlacementGenerator,
};

/// Fraction of the total cluster capacity filled with chunks in a simulated cluster.
pub const LOAD_FACTOR: f64 = 0.8;

/// Number of chunks placed in a simulated cluster.
pub fn total_chunks(num_nodes: usize, chunks_per_node: u32, replication_factor: u32) -> usize {
    (LOAD_FACTOR * chunks_per_node as f64 * num_nodes as f64 / replication_factor as f64).floor() as usize
}

/// Number of nodes which fail simultaneously in a cluster of `num_nodes` nodes.
pub fn failure_set_size(num_nodes: usize) -> usize {
    (FAILURE_FRACTION * num_nodes as f64).round() as usize
}

/// Sorted set of nodes failing at the same time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureSet(Vec<NodeId>);

impl FailureSet {
    /// Samples [failure_set_size] distinct nodes uniformly without replacement.
    pub fn sample(num_nodes: usize, rng: &mut Pcg64) -> Self {
        let size = failure_set_size(num_nodes).min(num_nodes);
        let mut nodes = index::sample(rng, num_nodes, size)
            .into_iter()
            .map(|i| i as NodeId)
            .collect::<Vec<_>>();
        nodes.sort_unstable();
        Self(nodes)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    /// Whether some `replication_factor` failed nodes form one of the `copysets`.
    pub fn hits_any(&self, copysets: &HashSet<Copyset>, replication_factor: u32) -> bool {
        self.0
            .iter()
            .copied()
            .combinations(replication_factor as usize)
            .any(|combination| copysets.contains(combination.as_slice()))
    }
}

/// Binary result of a single trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialOutcome {
    DataLoss,
    NoDataLoss,
}

impl TrialOutcome {
    /// `1.0` if data was lost, `0.0` otherwise.
    pub fn as_probability(&self) -> f64 {
        match self {
            TrialOutcome::DataLoss => 1.0,
            TrialOutcome::NoDataLoss => 0.0,
        }
    }
}

/// Shape of the cluster built during a trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Number of chunks placed.
    pub chunks_placed: usize,
    /// Number of distinct copysets among placed chunks.
    pub distinct_copysets: usize,
    /// Number of failed nodes.
    pub failed_nodes: usize,
    /// Unused capacity left in the cluster, in chunks.
    pub remaining_capacity: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trial {
    pub outcome: TrialOutcome,
    pub summary: ClusterSummary,
}

/// Runs one trial on a fresh cluster owned by `generator`.
///
/// Chunks that share the same set of nodes are stored as one copyset.
pub fn simulate_trial(
    num_nodes: usize,
    chunks_per_node: u32,
    replication_factor: u32,
    generator: &mut dyn PlacementGenerator,
    rng: &mut Pcg64,
) -> Result<Trial> {
    let chunks = total_chunks(num_nodes, chunks_per_node, replication_factor);
    let mut copysets = HashSet::with_capacity(chunks);
    for _ in 0..chunks {
        copysets.insert(generator.next_copyset(rng)?);
    }

    let failed = FailureSet::sample(num_nodes, rng);
    let outcome = if failed.hits_any(&copysets, replication_factor) {
        TrialOutcome::DataLoss
    } else {
        TrialOutcome::NoDataLoss
    };

    Ok(Trial {
        outcome,
        summary: ClusterSummary {
            chunks_placed: chunks,
            distinct_copysets: copysets.len(),
            failed_nodes: failed.nodes().len(),
            remaining_capacity: generator.cluster().total_remaining_capacity(),
        },
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::{
        error::ReplicationError,
        placement_generators::{buddy::BuddyPlacement, uniform::UniformPlacement},
    };

    #[test]
    fn sizes() {
        assert_eq!(total_chunks(100, 10, 3), 266);
        assert_eq!(total_chunks(5000, 1000, 3), 1_333_333);
        assert_eq!(failure_set_size(100), 1);
        assert_eq!(failure_set_size(160), 2);
        assert_eq!(failure_set_size(5000), 50);
        assert_eq!(failure_set_size(40), 0);
    }

    #[test]
    fn failure_set_is_sorted_and_distinct() {
        let mut rng = Pcg64::seed_from_u64(123);
        let failed = FailureSet::sample(1000, &mut rng);
        assert_eq!(failed.nodes().len(), 10);
        assert!(failed.nodes().windows(2).all(|a| a[0] < a[1]));
        assert!(failed.nodes().iter().all(|&n| n < 1000));
    }

    #[test]
    fn hits_only_stored_copysets() {
        let failed = FailureSet(vec![1, 4, 6, 9]);
        let mut copysets = HashSet::new();
        copysets.insert(Copyset::new(vec![1, 4, 5]));
        copysets.insert(Copyset::new(vec![2, 6, 9]));
        assert!(!failed.hits_any(&copysets, 3));
        copysets.insert(Copyset::new(vec![9, 1, 6]));
        assert!(failed.hits_any(&copysets, 3));
    }

    #[test]
    fn full_scatter_cluster_is_always_built() {
        let mut rng = Pcg64::seed_from_u64(123);
        for _ in 0..20 {
            let mut generator = UniformPlacement::new(100, 10, 3).unwrap();
            let trial = simulate_trial(100, 10, 3, &mut generator, &mut rng).unwrap();
            assert_eq!(trial.summary.chunks_placed, 266);
            assert_eq!(trial.summary.remaining_capacity, 1000 - 3 * 266);
            assert_eq!(trial.summary.failed_nodes, 1);
            assert_eq!(trial.outcome, TrialOutcome::NoDataLoss);
        }
    }

    #[test]
    fn buddy_cluster_reaches_load_factor() {
        let mut rng = Pcg64::seed_from_u64(123);
        let mut generator = BuddyPlacement::new(300, 10, 3, 10, 1000, &mut rng).unwrap();
        let trial = simulate_trial(300, 10, 3, &mut generator, &mut rng).unwrap();
        assert_eq!(trial.summary.failed_nodes, 3);
        assert!(trial.summary.distinct_copysets <= trial.summary.chunks_placed);
        assert_eq!(trial.summary.remaining_capacity, 3000 - 3 * 800);
    }

    #[test]
    fn exhaustion_is_not_an_outcome() {
        let mut rng = Pcg64::seed_from_u64(123);
        let mut generator = UniformPlacement::new(10, 1, 3).unwrap();
        let result = simulate_trial(10, 10, 3, &mut generator, &mut rng);
        assert!(matches!(result, Err(ReplicationError::CapacityExhausted { placed: 3, .. })));
    }
}
