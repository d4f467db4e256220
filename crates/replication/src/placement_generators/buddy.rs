use log::debug;
use rand::seq::{index, SliceRandom};
use rand_pcg::Pcg64;

use crate::{
    cluster::{BuddyGroups, ClusterState, Copyset, NodeId},
    error::{ReplicationError, Result},
    placement_generator::PlacementGenerator,
};

/// Places every chunk on a random primary node and `replication_factor - 1` nodes from its buddy group.
///
/// Primaries are drawn at random up to `max_attempts` times per chunk. After that the whole cluster is
/// scanned for primaries which can still be placed, and the placement fails only if there are none.
pub struct BuddyPlacement {
    cluster: ClusterState,
    buddies: BuddyGroups,
    replication_factor: usize,
    max_attempts: usize,
    placed: usize,
}

impl BuddyPlacement {
    /// Creates a cluster and samples buddy groups of size `scatter_width` for it.
    pub fn new(
        num_nodes: usize,
        chunks_per_node: u32,
        replication_factor: u32,
        scatter_width: usize,
        max_attempts: usize,
        rng: &mut Pcg64,
    ) -> Result<Self> {
        Self::with_buddies(
            ClusterState::new(num_nodes, chunks_per_node)?,
            BuddyGroups::sample(num_nodes, scatter_width, rng)?,
            replication_factor,
            max_attempts,
        )
    }

    /// Places chunks on an existing cluster with fixed buddy groups.
    pub fn with_buddies(
        cluster: ClusterState,
        buddies: BuddyGroups,
        replication_factor: u32,
        max_attempts: usize,
    ) -> Result<Self> {
        if replication_factor == 0 {
            return Err(ReplicationError::InvalidConfig(
                "replication factor must be at least 1".to_string(),
            ));
        }
        if cluster.num_nodes() != buddies.num_nodes() {
            return Err(ReplicationError::InvalidConfig(format!(
                "buddy groups cover {} nodes, cluster has {}",
                buddies.num_nodes(),
                cluster.num_nodes()
            )));
        }
        Ok(Self {
            cluster,
            buddies,
            replication_factor: replication_factor as usize,
            max_attempts,
            placed: 0,
        })
    }

    pub fn buddies(&self) -> &BuddyGroups {
        &self.buddies
    }

    fn buddies_with_room(&self, primary: NodeId) -> Vec<NodeId> {
        self.buddies
            .of(primary)
            .iter()
            .copied()
            .filter(|&buddy| self.cluster.has_room(buddy))
            .collect()
    }

    fn choose_primary(&self, rng: &mut Pcg64) -> Option<(NodeId, Vec<NodeId>)> {
        let needed = self.replication_factor - 1;
        for _ in 0..self.max_attempts {
            let primary = self.cluster.random_node_with_room(rng)?;
            let eligible = self.buddies_with_room(primary);
            if eligible.len() >= needed {
                return Some((primary, eligible));
            }
        }

        debug!(
            "No placeable primary after {} attempts, scanning {} nodes with room",
            self.max_attempts,
            self.cluster.nodes_with_room()
        );
        let candidates = self
            .cluster
            .iter_nodes_with_room()
            .filter(|&node| self.buddies_with_room(node).len() >= needed)
            .collect::<Vec<_>>();
        let primary = *candidates.choose(rng)?;
        Some((primary, self.buddies_with_room(primary)))
    }

    fn exhausted(&self) -> ReplicationError {
        ReplicationError::CapacityExhausted {
            placed: self.placed,
            nodes_with_room: self.cluster.nodes_with_room(),
        }
    }
}

impl PlacementGenerator for BuddyPlacement {
    fn next_copyset(&mut self, rng: &mut Pcg64) -> Result<Copyset> {
        if self.cluster.nodes_with_room() < self.replication_factor {
            return Err(self.exhausted());
        }
        let (primary, eligible) = self.choose_primary(rng).ok_or_else(|| self.exhausted())?;

        let mut nodes = Vec::with_capacity(self.replication_factor);
        nodes.push(primary);
        nodes.extend(
            index::sample(rng, eligible.len(), self.replication_factor - 1)
                .into_iter()
                .map(|i| eligible[i]),
        );

        self.cluster.consume(&nodes)?;
        self.placed += 1;
        Ok(Copyset::new(nodes))
    }

    fn cluster(&self) -> &ClusterState {
        &self.cluster
    }

    fn placed(&self) -> usize {
        self.placed
    }
}
