use rand_pcg::Pcg64;

use crate::{
    cluster::{ClusterState, Copyset},
    error::{ReplicationError, Result},
    placement_generator::PlacementGenerator,
};

/// Places every chunk on `replication_factor` distinct nodes chosen uniformly among nodes with room.
pub struct UniformPlacement {
    cluster: ClusterState,
    replication_factor: usize,
    placed: usize,
}

impl UniformPlacement {
    pub fn new(num_nodes: usize, chunks_per_node: u32, replication_factor: u32) -> Result<Self> {
        if replication_factor == 0 {
            return Err(ReplicationError::InvalidConfig(
                "replication factor must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            cluster: ClusterState::new(num_nodes, chunks_per_node)?,
            replication_factor: replication_factor as usize,
            placed: 0,
        })
    }
}

impl PlacementGenerator for UniformPlacement {
    fn next_copyset(&mut self, rng: &mut Pcg64) -> Result<Copyset> {
        let nodes = self
            .cluster
            .sample_nodes_with_room(rng, self.replication_factor)
            .ok_or(ReplicationError::CapacityExhausted {
                placed: self.placed,
                nodes_with_room: self.cluster.nodes_with_room(),
            })?;
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

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn fills_cluster_until_exhausted() {
        let mut rng = Pcg64::seed_from_u64(123);
        let mut generator = UniformPlacement::new(3, 3, 3).unwrap();
        for _ in 0..3 {
            let copyset = generator.next_copyset(&mut rng).unwrap();
            assert_eq!(copyset.len(), 3);
            assert_eq!(copyset.nodes(), &[0, 1, 2]);
        }
        assert_eq!(generator.cluster().total_remaining_capacity(), 0);
        assert_eq!(
            generator.next_copyset(&mut rng),
            Err(ReplicationError::CapacityExhausted {
                placed: 3,
                nodes_with_room: 0
            })
        );
    }

    #[test]
    fn zero_replicas_are_rejected() {
        assert!(matches!(
            UniformPlacement::new(10, 5, 0),
            Err(ReplicationError::InvalidConfig(_))
        ));
    }
}
