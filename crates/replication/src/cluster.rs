//! Model of a simulated cluster: node capacities, buddy groups and copysets.

use std::borrow::Borrow;

use indexmap::IndexSet;
use itertools::Itertools;
use rand::{seq::index, Rng};
use rand_pcg::Pcg64;

use crate::error::{ReplicationError, Result};

pub type NodeId = u32;

fn node_id(index: usize) -> Result<NodeId> {
    NodeId::try_from(index)
        .map_err(|_| ReplicationError::InvalidConfig(format!("{index} nodes do not fit into node ids")))
}

/// Set of nodes holding all replicas of one chunk, sorted by node id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Copyset(Vec<NodeId>);

impl Copyset {
    /// Creates a canonical copyset from nodes in any order.
    pub fn new(mut nodes: Vec<NodeId>) -> Self {
        nodes.sort_unstable();
        Self(nodes)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether all nodes of the copyset are different.
    pub fn has_distinct_nodes(&self) -> bool {
        self.0.windows(2).all(|a| a[0] < a[1])
    }
}

impl Borrow<[NodeId]> for Copyset {
    fn borrow(&self) -> &[NodeId] {
        &self.0
    }
}

/// Remaining capacity of every node of a simulated cluster.
///
/// Nodes with zero remaining capacity are never offered for placement again.
pub struct ClusterState {
    capacities: Vec<u32>,
    with_room: IndexSet<NodeId>,
    consumed: u64,
}

impl ClusterState {
    /// Creates a cluster of `num_nodes` empty nodes which can hold `chunks_per_node` chunks each.
    pub fn new(num_nodes: usize, chunks_per_node: u32) -> Result<Self> {
        let end = node_id(num_nodes)?;
        let with_room = if chunks_per_node > 0 {
            (0..end).collect()
        } else {
            IndexSet::new()
        };
        Ok(Self {
            capacities: vec![chunks_per_node; num_nodes],
            with_room,
            consumed: 0,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.capacities.len()
    }

    /// Remaining capacity of a node in chunks.
    pub fn remaining_capacity(&self, node: NodeId) -> u32 {
        self.capacities.get(node as usize).copied().unwrap_or(0)
    }

    /// Remaining capacity of the whole cluster in chunks.
    pub fn total_remaining_capacity(&self) -> u64 {
        self.capacities.iter().map(|&c| c as u64).sum()
    }

    /// Number of chunk replicas placed so far.
    pub fn consumed_capacity(&self) -> u64 {
        self.consumed
    }

    pub fn has_room(&self, node: NodeId) -> bool {
        self.with_room.contains(&node)
    }

    /// Number of nodes with remaining capacity.
    pub fn nodes_with_room(&self) -> usize {
        self.with_room.len()
    }

    pub fn iter_nodes_with_room(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.with_room.iter().copied()
    }

    /// Uniformly random node with remaining capacity.
    pub fn random_node_with_room(&self, rng: &mut Pcg64) -> Option<NodeId> {
        if self.with_room.is_empty() {
            return None;
        }
        self.with_room.get_index(rng.gen_range(0..self.with_room.len())).copied()
    }

    /// `amount` distinct uniformly random nodes with remaining capacity.
    pub fn sample_nodes_with_room(&self, rng: &mut Pcg64, amount: usize) -> Option<Vec<NodeId>> {
        if amount > self.with_room.len() {
            return None;
        }
        Some(
            index::sample(rng, self.with_room.len(), amount)
                .into_iter()
                .map(|i| self.with_room[i])
                .collect(),
        )
    }

    /// Takes one unit of capacity from every node of the copyset.
    ///
    /// Either all nodes are decremented or none are.
    pub fn consume(&mut self, nodes: &[NodeId]) -> Result<()> {
        if !nodes.iter().all_unique() {
            return Err(ReplicationError::InvalidPlacement(format!("nodes {nodes:?} are not distinct")));
        }
        if let Some(&node) = nodes.iter().find(|&&node| !self.has_room(node)) {
            return Err(ReplicationError::InvalidPlacement(format!("node {node} has no capacity left")));
        }
        for &node in nodes.iter() {
            let capacity = &mut self.capacities[node as usize];
            *capacity -= 1;
            if *capacity == 0 {
                self.with_room.swap_remove(&node);
            }
        }
        self.consumed += nodes.len() as u64;
        Ok(())
    }
}

/// Fixed set of candidate co-replica nodes for every node.
pub struct BuddyGroups {
    groups: Vec<Vec<NodeId>>,
}

impl BuddyGroups {
    /// Samples `min(scatter_width, num_nodes - 1)` distinct buddies for every node, never the node itself.
    pub fn sample(num_nodes: usize, scatter_width: usize, rng: &mut Pcg64) -> Result<Self> {
        node_id(num_nodes)?;
        let others = num_nodes.saturating_sub(1);
        let width = scatter_width.min(others);
        let groups = (0..num_nodes)
            .map(|node| {
                index::sample(rng, others, width)
                    .into_iter()
                    .map(|i| (if i >= node { i + 1 } else { i }) as NodeId)
                    .collect()
            })
            .collect();
        Ok(Self { groups })
    }

    /// Buddies of a node.
    pub fn of(&self, node: NodeId) -> &[NodeId] {
        self.groups.get(node as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_nodes(&self) -> usize {
        self.groups.len()
    }
}
