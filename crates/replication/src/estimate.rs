//! Result of a data-loss estimate.

use serde::{Deserialize, Serialize};

use crate::{
    analytic::clamp_probability,
    error::{ReplicationError, Result},
    simulation::TrialOutcome,
};

/// Probability of data loss together with the statistics of the trials behind it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataLossEstimate {
    /// Estimated probability of data loss.
    pub probability: f64,
    /// Whether the estimate comes from simulated trials.
    pub simulated: bool,
    /// Number of trials which produced an outcome.
    pub completed_trials: usize,
    /// Number of completed trials which lost data.
    pub data_loss_trials: usize,
    /// Number of trials whose cluster could not be populated.
    pub exhausted_trials: usize,
    /// Standard error of the estimate, `sqrt(p * (1 - p) / completed_trials)`. Zero for closed-form estimates.
    pub standard_error: f64,

    #[serde(skip)]
    last_exhaustion: Option<ReplicationError>,
}

impl DataLossEstimate {
    /// Estimate computed by a formula.
    pub fn analytic(probability: f64) -> Result<Self> {
        Ok(Self {
            probability: clamp_probability(probability)?,
            simulated: false,
            completed_trials: 0,
            data_loss_trials: 0,
            exhausted_trials: 0,
            standard_error: 0.0,
            last_exhaustion: None,
        })
    }

    /// Empty estimate to be filled with trial outcomes.
    pub fn simulated() -> Self {
        Self {
            probability: 0.0,
            simulated: true,
            completed_trials: 0,
            data_loss_trials: 0,
            exhausted_trials: 0,
            standard_error: 0.0,
            last_exhaustion: None,
        }
    }

    /// Register completed trial.
    pub fn register_trial(&mut self, outcome: TrialOutcome) {
        self.completed_trials += 1;
        if outcome == TrialOutcome::DataLoss {
            self.data_loss_trials += 1;
        }
    }

    /// Register trial which ran out of capacity while building its cluster.
    pub fn register_exhausted(&mut self, error: ReplicationError) {
        self.exhausted_trials += 1;
        self.last_exhaustion = Some(error);
    }

    /// Computes the mean of completed trials and its standard error.
    pub fn finalize(mut self) -> Result<Self> {
        if self.completed_trials == 0 {
            return Err(self.last_exhaustion.take().unwrap_or_else(|| {
                ReplicationError::Computation("no trials were run".to_string())
            }));
        }
        let n = self.completed_trials as f64;
        let p = self.data_loss_trials as f64 / n;
        self.probability = clamp_probability(p)?;
        self.standard_error = (p * (1.0 - p) / n).sqrt();
        Ok(self)
    }

    /// Half-width of the interval of `sigmas` standard errors around the estimate.
    pub fn tolerance(&self, sigmas: f64) -> f64 {
        sigmas * self.standard_error
    }
}
