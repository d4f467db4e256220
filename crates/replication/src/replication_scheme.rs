//! Trait for a replication scheme.

use rand_pcg::Pcg64;

use crate::{
    error::{ReplicationError, Result},
    placement_generator::PlacementGenerator,
};

/// Replication scheme which can estimate its probability of data loss.
///
/// A scheme provides a closed-form estimate and a placement generator for simulated clusters. Missing
/// either of them is reported as [NotImplemented](ReplicationError::NotImplemented) when it is used.
pub trait ReplicationScheme: Send + Sync {
    /// Human-readable name used in logs and results.
    fn name(&self) -> String;

    /// Closed-form probability of data loss when 1% of `num_nodes` nodes fail.
    fn analytic_probability(&self, num_nodes: usize) -> Result<f64> {
        let _ = num_nodes;
        Err(ReplicationError::NotImplemented {
            scheme: self.name(),
            operation: "analytic_probability",
        })
    }

    /// Creates a fresh cluster of `num_nodes` nodes and a generator filling it.
    fn placement_generator(&self, num_nodes: usize, rng: &mut Pcg64) -> Result<Box<dyn PlacementGenerator>> {
        let _ = (num_nodes, rng);
        Err(ReplicationError::NotImplemented {
            scheme: self.name(),
            operation: "placement_generator",
        })
    }
}
