//! Trait for a generator of chunk placements.

use rand_pcg::Pcg64;

use crate::{
    cluster::{ClusterState, Copyset},
    error::Result,
};

/// Produces copysets one at a time for a single simulated cluster, consuming its capacity.
pub trait PlacementGenerator: Send {
    /// Places the next chunk and returns its canonical copyset.
    ///
    /// Fails with [CapacityExhausted](crate::error::ReplicationError::CapacityExhausted) when no valid
    /// placement is left in the cluster.
    fn next_copyset(&mut self, rng: &mut Pcg64) -> Result<Copyset>;

    /// Current state of the cluster.
    fn cluster(&self) -> &ClusterState;

    /// Number of copysets placed so far.
    fn placed(&self) -> usize;
}
