//! Configuration of a data-loss estimator.

use serde::{Deserialize, Serialize};

use crate::error::{ReplicationError, Result};

fn default_trials() -> usize {
    100
}

fn default_replication_factor() -> u32 {
    3
}

fn default_seed() -> u64 {
    123
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn default_max_placement_attempts() -> usize {
    1000
}

/// Parameters shared by all replication schemes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemeConfig {
    /// Log every estimate at info level.
    #[serde(default)]
    pub debug: bool,
    /// Use Monte Carlo simulation instead of the closed-form approximation.
    #[serde(default)]
    pub simulation: bool,
    /// Number of simulated trials per estimate.
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Number of replicas of every chunk.
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,
    /// Capacity of every node, in chunks.
    pub chunks_per_node: u32,
    /// Seed of the first trial; trial `i` uses `seed + i`.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of worker threads running trials.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Number of random primary draws per chunk before scanning the whole cluster.
    #[serde(default = "default_max_placement_attempts")]
    pub max_placement_attempts: usize,
}

impl SchemeConfig {
    /// Closed-form configuration with default trial settings.
    pub fn new(replication_factor: u32, chunks_per_node: u32) -> Self {
        Self {
            debug: false,
            simulation: false,
            trials: default_trials(),
            replication_factor,
            chunks_per_node,
            seed: default_seed(),
            threads: default_threads(),
            max_placement_attempts: default_max_placement_attempts(),
        }
    }

    /// Switches to Monte Carlo simulation with the given number of trials.
    pub fn simulated(mut self, trials: usize) -> Self {
        self.simulation = true;
        self.trials = trials;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_max_placement_attempts(mut self, max_placement_attempts: usize) -> Self {
        self.max_placement_attempts = max_placement_attempts;
        self
    }

    /// Rejects parameters which can not produce an estimate.
    pub fn validate(&self) -> Result<()> {
        if self.replication_factor < 1 {
            return Err(ReplicationError::InvalidConfig(
                "replication factor must be at least 1".to_string(),
            ));
        }
        if self.chunks_per_node == 0 {
            return Err(ReplicationError::InvalidConfig(
                "chunks per node must be positive".to_string(),
            ));
        }
        if self.trials == 0 {
            return Err(ReplicationError::InvalidConfig("trials must be positive".to_string()));
        }
        if self.threads == 0 {
            return Err(ReplicationError::InvalidConfig("threads must be positive".to_string()));
        }
        if self.max_placement_attempts == 0 {
            return Err(ReplicationError::InvalidConfig(
                "max placement attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Rejects cluster sizes which can not hold a single copyset.
    pub fn validate_num_nodes(&self, num_nodes: usize) -> Result<()> {
        if num_nodes == 0 {
            return Err(ReplicationError::InvalidConfig("cluster must have nodes".to_string()));
        }
        if num_nodes < self.replication_factor as usize {
            return Err(ReplicationError::InvalidConfig(format!(
                "{} nodes can not hold {} replicas",
                num_nodes, self.replication_factor
            )));
        }
        if u32::try_from(num_nodes).is_err() {
            return Err(ReplicationError::InvalidConfig(format!("{num_nodes} nodes is too many")));
        }
        Ok(())
    }
}

/// Data placement strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Strategy {
    /// Every chunk is placed on independent random nodes.
    Random,
    /// Every chunk is placed within the buddy group of its primary node.
    Copyset { scatter_width: usize },
}

impl Strategy {
    pub fn scatter_width(&self) -> Option<usize> {
        match self {
            Strategy::Random => None,
            Strategy::Copyset { scatter_width } => Some(*scatter_width),
        }
    }

    /// Rejects strategy parameters which can not work with `config`.
    pub fn validate(&self, config: &SchemeConfig) -> Result<()> {
        match *self {
            Strategy::Random => Ok(()),
            Strategy::Copyset { scatter_width } => {
                let buddies_needed = config.replication_factor.saturating_sub(1) as usize;
                if config.simulation && scatter_width < buddies_needed {
                    return Err(ReplicationError::InvalidConfig(format!(
                        "scatter width {} is too small for replication factor {}",
                        scatter_width, config.replication_factor
                    )));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_yaml() {
        let config: SchemeConfig = serde_yaml::from_str("chunks_per_node: 1000").unwrap();
        assert_eq!(config.replication_factor, 3);
        assert_eq!(config.trials, 100);
        assert_eq!(config.seed, 123);
        assert!(!config.simulation);
        assert!(config.threads >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn strategy_from_yaml() {
        let strategy: Strategy = serde_yaml::from_str("type: Copyset\nscatter_width: 10").unwrap();
        assert_eq!(strategy, Strategy::Copyset { scatter_width: 10 });
        let strategy: Strategy = serde_yaml::from_str("type: Random").unwrap();
        assert_eq!(strategy.scatter_width(), None);
    }

    #[test]
    fn invalid_configs() {
        assert!(SchemeConfig::new(0, 10).validate().is_err());
        assert!(SchemeConfig::new(3, 0).validate().is_err());
        assert!(SchemeConfig::new(3, 10).simulated(0).validate().is_err());
        assert!(SchemeConfig::new(3, 10).with_threads(0).validate().is_err());
        assert!(SchemeConfig::new(3, 10).with_max_placement_attempts(0).validate().is_err());

        let config = SchemeConfig::new(3, 10);
        assert!(config.validate_num_nodes(0).is_err());
        assert!(config.validate_num_nodes(2).is_err());
        assert!(config.validate_num_nodes(3).is_ok());

        let copyset = Strategy::Copyset { scatter_width: 1 };
        assert!(copyset.validate(&config).is_ok());
        assert!(copyset.validate(&config.clone().simulated(10)).is_err());

        let widest = Strategy::Copyset {
            scatter_width: usize::MAX,
        };
        assert!(widest.validate(&config.simulated(10)).is_ok());
        assert!(widest.validate(&SchemeConfig::new(0, 10).simulated(10)).is_ok());
    }
}
