//! Implementations of replication schemes.

use std::sync::Arc;

use crate::{
    config::{SchemeConfig, Strategy},
    replication_scheme::ReplicationScheme,
};

pub mod copyset;
pub mod random;

/// Creates the scheme implementing `strategy`.
pub fn resolve(strategy: Strategy, config: &SchemeConfig) -> Arc<dyn ReplicationScheme> {
    match strategy {
        Strategy::Random => Arc::new(random::RandomReplication::new(
            config.replication_factor,
            config.chunks_per_node,
        )),
        Strategy::Copyset { scatter_width } => Arc::new(copyset::CopysetReplication::new(
            config.replication_factor,
            config.chunks_per_node,
            scatter_width,
            config.max_placement_attempts,
        )),
    }
}
