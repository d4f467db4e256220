//! Estimator of the probability of data loss for a replication scheme.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};

use log::{debug, info, trace, warn};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use threadpool::ThreadPool;

use crate::{
    analytic::FAILURE_FRACTION,
    config::{SchemeConfig, Strategy},
    error::{ReplicationError, Result},
    estimate::DataLossEstimate,
    replication_scheme::ReplicationScheme,
    replication_schemes,
    simulation::{simulate_trial, Trial},
};

/// Estimates the probability of data loss of a replication scheme, either with a closed-form formula or
/// by averaging simulated trials.
///
/// Simulated trials run on a thread pool. Trial `i` uses its own generator seeded with `seed + i`, so an
/// estimate does not depend on the number of threads.
pub struct DataLossEstimator {
    config: SchemeConfig,
    scheme: Arc<dyn ReplicationScheme>,
    cancelled: Arc<AtomicBool>,
}

impl DataLossEstimator {
    pub fn new(config: SchemeConfig, strategy: Strategy) -> Result<Self> {
        config.validate()?;
        strategy.validate(&config)?;
        let scheme = replication_schemes::resolve(strategy, &config);
        Self::with_scheme(config, scheme)
    }

    /// Creates an estimator for a custom scheme.
    pub fn with_scheme(config: SchemeConfig, scheme: Arc<dyn ReplicationScheme>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scheme,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &SchemeConfig {
        &self.config
    }

    pub fn scheme(&self) -> &dyn ReplicationScheme {
        self.scheme.as_ref()
    }

    /// Flag which abandons the remaining trials when set. It stays set for later estimates.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Probability of data loss when 1% of `num_nodes` nodes fail simultaneously.
    pub fn probability_of_data_loss(&self, num_nodes: usize) -> Result<f64> {
        Ok(self.estimate(num_nodes)?.probability)
    }

    /// Same as [probability_of_data_loss](Self::probability_of_data_loss), with trial statistics.
    pub fn estimate(&self, num_nodes: usize) -> Result<DataLossEstimate> {
        self.config.validate_num_nodes(num_nodes)?;

        let estimate = if self.config.replication_factor == 1 {
            // every failed node loses its own chunks
            DataLossEstimate::analytic(FAILURE_FRACTION)?
        } else if self.config.simulation {
            self.simulate(num_nodes)?
        } else {
            DataLossEstimate::analytic(self.scheme.analytic_probability(num_nodes)?)?
        };

        if self.config.debug {
            info!(
                "Average for {} nodes in {}: {}",
                num_nodes,
                self.scheme.name(),
                estimate.probability
            );
        } else {
            debug!(
                "Average for {} nodes in {}: {}",
                num_nodes,
                self.scheme.name(),
                estimate.probability
            );
        }
        Ok(estimate)
    }

    fn simulate(&self, num_nodes: usize) -> Result<DataLossEstimate> {
        let start_time = Instant::now();
        let results: Vec<Option<Result<Trial>>> = if self.config.threads == 1 {
            (0..self.config.trials)
                .map(|trial| run_trial(self.scheme.as_ref(), &self.config, &self.cancelled, num_nodes, trial))
                .collect()
        } else {
            self.run_parallel(num_nodes)?
        };

        let mut estimate = DataLossEstimate::simulated();
        for (trial, result) in results.into_iter().enumerate() {
            match result {
                None => return Err(ReplicationError::Cancelled),
                Some(Ok(Trial { outcome, summary })) => {
                    trace!("Trial {}: {:?}, {:?}", trial, outcome, summary);
                    estimate.register_trial(outcome);
                }
                Some(Err(error @ ReplicationError::CapacityExhausted { .. })) => {
                    warn!("Trial {} for {} nodes in {}: {}", trial, num_nodes, self.scheme.name(), error);
                    estimate.register_exhausted(error);
                }
                Some(Err(error)) => return Err(error),
            }
        }

        debug!(
            "Finished {} trials for {} nodes in {:.2?}",
            self.config.trials,
            num_nodes,
            start_time.elapsed()
        );
        estimate.finalize()
    }

    fn run_parallel(&self, num_nodes: usize) -> Result<Vec<Option<Result<Trial>>>> {
        let total_trials = self.config.trials;
        let config = Arc::new(self.config.clone());
        let finished_trials_atomic = Arc::new(AtomicUsize::new(0));
        let results = Arc::new(Mutex::new(Vec::with_capacity(total_trials)));

        let pool = ThreadPool::new(self.config.threads.min(total_trials));
        for trial in 0..total_trials {
            let scheme = Arc::clone(&self.scheme);
            let config = Arc::clone(&config);
            let cancelled = Arc::clone(&self.cancelled);
            let finished_trials_atomic = Arc::clone(&finished_trials_atomic);
            let results = Arc::clone(&results);
            pool.execute(move || {
                let result = run_trial(scheme.as_ref(), &config, &cancelled, num_nodes, trial);
                if let Ok(mut results) = results.lock() {
                    results.push((trial, result));
                }
                let finished_trials = finished_trials_atomic.fetch_add(1, Ordering::SeqCst) + 1;
                if finished_trials % 100 == 0 {
                    trace!("Finished {}/{} trials", finished_trials, total_trials);
                }
            });
        }
        pool.join();

        if pool.panic_count() > 0 {
            return Err(ReplicationError::Computation(format!(
                "{} trial workers panicked",
                pool.panic_count()
            )));
        }
        let mut results = results
            .lock()
            .map(|mut results| std::mem::take(&mut *results))
            .map_err(|_| ReplicationError::Computation("trial results are poisoned".to_string()))?;
        if results.len() != total_trials {
            return Err(ReplicationError::Computation(format!(
                "collected {} of {} trial results",
                results.len(),
                total_trials
            )));
        }
        results.sort_by_key(|(trial, _)| *trial);
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }
}

/// Runs trial number `trial` on a fresh cluster, or returns `None` if the estimate was cancelled.
fn run_trial(
    scheme: &dyn ReplicationScheme,
    config: &SchemeConfig,
    cancelled: &AtomicBool,
    num_nodes: usize,
    trial: usize,
) -> Option<Result<Trial>> {
    if cancelled.load(Ordering::Relaxed) {
        return None;
    }
    let mut rng = Pcg64::seed_from_u64(config.seed.wrapping_add(trial as u64));
    Some(
        scheme
            .placement_generator(num_nodes, &mut rng)
            .and_then(|mut generator| {
                simulate_trial(
                    num_nodes,
                    config.chunks_per_node,
                    config.replication_factor,
                    generator.as_mut(),
                    &mut rng,
                )
            }),
    )
}
