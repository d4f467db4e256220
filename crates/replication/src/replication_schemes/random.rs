use rand_pcg::Pcg64;

use crate::{
    analytic::random_replication_data_loss,
    error::Result,
    placement_generator::PlacementGenerator,
    placement_generators::uniform::UniformPlacement,
    replication_scheme::ReplicationScheme,
};

/// Every chunk is replicated on nodes chosen independently and uniformly at random.
pub struct RandomReplication {
    replication_factor: u32,
    chunks_per_node: u32,
}

impl RandomReplication {
    pub fn new(replication_factor: u32, chunks_per_node: u32) -> Self {
        Self {
            replication_factor,
            chunks_per_node,
        }
    }
}

impl ReplicationScheme for RandomReplication {
    fn name(&self) -> String {
        "Random".to_string()
    }

    fn analytic_probability(&self, num_nodes: usize) -> Result<f64> {
        random_replication_data_loss(num_nodes, self.chunks_per_node, self.replication_factor)
    }

    fn placement_generator(&self, num_nodes: usize, _rng: &mut Pcg64) -> Result<Box<dyn PlacementGenerator>> {
        Ok(Box::new(UniformPlacement::new(
            num_nodes,
            self.chunks_per_node,
            self.replication_factor,
        )?))
    }
}
