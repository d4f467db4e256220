#![doc = include_str!("../../../README.md")]

pub mod analytic;
pub mod cluster;
pub mod config;
pub mod error;
pub mod estimate;
pub mod estimator;
pub mod placement_generator;
pub mod placement_generators;
pub mod replication_scheme;
pub mod replication_schemes;
pub mod simulation;
