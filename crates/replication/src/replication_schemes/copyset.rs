use rand_pcg::Pcg64;

use crate::{
    analytic::copyset_replication_data_loss,
    error::Result,
    placement_generator::PlacementGenerator,
    placement_generators::{buddy::BuddyPlacement, uniform::UniformPlacement},
    replication_scheme::ReplicationScheme,
};

/// Every chunk is replicated on its primary node and nodes from the primary's buddy group.
///
/// When the scatter width covers the whole cluster the buddy constraint disappears and chunks are
/// placed like in [RandomReplication](super::random::RandomReplication).
pub struct CopysetReplication {
    replication_factor: u32,
    chunks_per_node: u32,
    scatter_width: usize,
    max_placement_attempts: usize,
}

impl CopysetReplication {
    pub fn new(
        replication_factor: u32,
        chunks_per_node: u32,
        scatter_width: usize,
        max_placement_attempts: usize,
    ) -> Self {
        Self {
            replication_factor,
            chunks_per_node,
            scatter_width,
            max_placement_attempts,
        }
    }

    pub fn scatter_width(&self) -> usize {
        self.scatter_width
    }
}

impl ReplicationScheme for CopysetReplication {
    fn name(&self) -> String {
        format!("Copyset[scatter_width={}]", self.scatter_width)
    }

    fn analytic_probability(&self, num_nodes: usize) -> Result<f64> {
        copyset_replication_data_loss(
            num_nodes,
            self.chunks_per_node,
            self.replication_factor,
            self.scatter_width,
        )
    }

    fn placement_generator(&self, num_nodes: usize, rng: &mut Pcg64) -> Result<Box<dyn PlacementGenerator>> {
        if self.scatter_width >= num_nodes.saturating_sub(1) {
            return Ok(Box::new(UniformPlacement::new(
                num_nodes,
                self.chunks_per_node,
                self.replication_factor,
            )?));
        }
        Ok(Box::new(BuddyPlacement::new(
            num_nodes,
            self.chunks_per_node,
            self.replication_factor,
            self.scatter_width,
            self.max_placement_attempts,
            rng,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn full_scatter_drops_buddy_groups() {
        let mut rng = Pcg64::seed_from_u64(123);
        let scheme = CopysetReplication::new(3, 10, 99, 1000);
        let mut generator = scheme.placement_generator(100, &mut rng).unwrap();
        for _ in 0..266 {
            let copyset = generator.next_copyset(&mut rng).unwrap();
            assert_eq!(copyset.len(), 3);
            assert!(copyset.has_distinct_nodes());
        }
        assert_eq!(generator.cluster().consumed_capacity(), 3 * 266);
    }

    #[test]
    fn widest_scatter_width_uses_whole_cluster() {
        let mut rng = Pcg64::seed_from_u64(123);
        let scheme = CopysetReplication::new(3, 10, usize::MAX, 1000);
        let mut generator = scheme.placement_generator(10, &mut rng).unwrap();
        for _ in 0..26 {
            assert!(generator.next_copyset(&mut rng).unwrap().has_distinct_nodes());
        }
        assert_eq!(scheme.analytic_probability(1000).unwrap(), 1.0);
    }

    #[test]
    fn name_includes_scatter_width() {
        assert_eq!(CopysetReplication::new(3, 10, 20, 1000).name(), "Copyset[scatter_width=20]");
    }
}
