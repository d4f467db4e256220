//! Implementations of placement generators.

pub mod buddy;
pub mod uniform;
