//! Closed-form approximations of the probability of data loss.
//!
//! Both formulas assume that a fixed fraction ([FAILURE_FRACTION]) of the cluster fails at once.

use crate::error::{ReplicationError, Result};

/// Fraction of nodes which fail simultaneously.
pub const FAILURE_FRACTION: f64 = 0.01;

const PROBABILITY_TOLERANCE: f64 = 1e-12;

/// Generalized binomial coefficient `C(n, k)` for real `n` and integer `k`.
///
/// Equals zero when `k > n`, which matches the gamma-function definition for the arguments used here.
pub fn binomial(n: f64, k: u32) -> Result<f64> {
    if !n.is_finite() || n < 0.0 {
        return Err(ReplicationError::Computation(format!(
            "binomial coefficient is undefined for n = {n}"
        )));
    }
    if k as f64 > n {
        return Ok(0.0);
    }
    let mut result = 1.0;
    for i in 0..k {
        result *= (n - i as f64) / (k - i) as f64;
    }
    if !result.is_finite() {
        return Err(ReplicationError::Computation(format!(
            "binomial coefficient C({n}, {k}) overflowed"
        )));
    }
    Ok(result)
}

/// Checks that `value` is a probability, absorbing rounding noise at the bounds.
pub fn clamp_probability(value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(ReplicationError::Computation(format!("probability is not finite: {value}")));
    }
    if !(-PROBABILITY_TOLERANCE..=1.0 + PROBABILITY_TOLERANCE).contains(&value) {
        return Err(ReplicationError::Computation(format!("probability out of range: {value}")));
    }
    Ok(value.clamp(0.0, 1.0))
}

/// Probability that at least one of `trials` independent events with probability `p` happens,
/// i.e. `1 - (1 - p) ^ trials`.
pub fn probability_of_any(p: f64, trials: f64) -> Result<f64> {
    let p = clamp_probability(p)?;
    if !trials.is_finite() || trials < 0.0 {
        return Err(ReplicationError::Computation(format!("invalid number of trials: {trials}")));
    }
    if trials == 0.0 || p == 0.0 {
        return Ok(0.0);
    }
    if p == 1.0 {
        return Ok(1.0);
    }
    clamp_probability(-(trials * (-p).ln_1p()).exp_m1())
}

fn check_replication_factor(replication_factor: u32) -> Result<()> {
    if replication_factor < 2 {
        return Err(ReplicationError::InvalidConfig(format!(
            "closed-form estimate needs replication factor >= 2, got {replication_factor}"
        )));
    }
    Ok(())
}

/// Probability of data loss under random replication.
///
/// Every one of the `num_nodes * chunks_per_node` chunks is lost independently with probability
/// `C(failed, r) / C(num_nodes, r)`.
pub fn random_replication_data_loss(num_nodes: usize, chunks_per_node: u32, replication_factor: u32) -> Result<f64> {
    check_replication_factor(replication_factor)?;
    let num_failed_nodes = FAILURE_FRACTION * num_nodes as f64;
    let failed_combos = binomial(num_failed_nodes, replication_factor)?;
    let total_combos = binomial(num_nodes as f64, replication_factor)?;
    if total_combos == 0.0 {
        return Err(ReplicationError::Computation(format!(
            "no copysets of size {replication_factor} exist among {num_nodes} nodes"
        )));
    }
    let prob_of_losing_chunk = failed_combos / total_combos;
    probability_of_any(prob_of_losing_chunk, num_nodes as f64 * chunks_per_node as f64)
}

/// Probability of data loss under copyset replication with the given scatter width.
///
/// The number of distinct copysets is approximated by `((S + 1) / (r - 1)) * num_nodes / r`, and each
/// combination of failed nodes hits one of them independently.
pub fn copyset_replication_data_loss(
    num_nodes: usize,
    _chunks_per_node: u32,
    replication_factor: u32,
    scatter_width: usize,
) -> Result<f64> {
    check_replication_factor(replication_factor)?;
    let num_failed_nodes = FAILURE_FRACTION * num_nodes as f64;
    let failed_combos = binomial(num_failed_nodes, replication_factor)?;
    let total_copysets = binomial(num_nodes as f64, replication_factor)?;
    if total_copysets == 0.0 {
        return Err(ReplicationError::Computation(format!(
            "no copysets of size {replication_factor} exist among {num_nodes} nodes"
        )));
    }
    let num_copysets = (scatter_width as f64 + 1.0) / (replication_factor - 1) as f64 * num_nodes as f64
        / replication_factor as f64;
    let prob_of_hitting_copyset = (num_copysets / total_copysets).min(1.0);
    probability_of_any(prob_of_hitting_copyset, failed_combos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binomial_values() {
        assert_eq!(binomial(5.0, 2).unwrap(), 10.0);
        assert_eq!(binomial(10.0, 0).unwrap(), 1.0);
        assert_eq!(binomial(2.5, 3).unwrap(), 0.0);
        assert!((binomial(4.5, 2).unwrap() - 7.875).abs() < 1e-12);
        assert!(binomial(f64::NAN, 2).is_err());
        assert!(binomial(-1.0, 2).is_err());
    }

    #[test]
    fn probability_of_any_edges() {
        assert_eq!(probability_of_any(0.0, 1e9).unwrap(), 0.0);
        assert_eq!(probability_of_any(1.0, 3.0).unwrap(), 1.0);
        assert_eq!(probability_of_any(0.5, 0.0).unwrap(), 0.0);
        assert!((probability_of_any(0.5, 2.0).unwrap() - 0.75).abs() < 1e-12);
        assert!(probability_of_any(1.5, 2.0).is_err());
    }

    #[test]
    fn tiny_probabilities_keep_precision() {
        let p = probability_of_any(1e-18, 1e3).unwrap();
        assert!((p - 1e-15).abs() < 1e-20);
    }

    #[test]
    fn known_values() {
        let random = random_replication_data_loss(1000, 1000, 3).unwrap();
        assert!((random - 0.514_300_574).abs() < 1e-6);
        let copyset = copyset_replication_data_loss(1000, 1000, 3, 10).unwrap();
        assert!((copyset - 0.001_323_100).abs() < 1e-6);
    }

    #[test]
    fn too_few_failed_nodes_lose_nothing() {
        assert_eq!(random_replication_data_loss(100, 1000, 3).unwrap(), 0.0);
        assert_eq!(copyset_replication_data_loss(100, 1000, 3, 10).unwrap(), 0.0);
    }

    #[test]
    fn replication_factor_one_is_rejected() {
        assert!(matches!(
            random_replication_data_loss(1000, 10, 1),
            Err(ReplicationError::InvalidConfig(_))
        ));
        assert!(matches!(
            copyset_replication_data_loss(1000, 10, 1, 10),
            Err(ReplicationError::InvalidConfig(_))
        ));
    }
}
