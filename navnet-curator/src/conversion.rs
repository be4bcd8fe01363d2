//! Strategies that turn a utility vector into a distribution over the next node.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, CuratorConfig};

pub trait ProbabilityConversion {
    /// Maps one utility per candidate to one probability per candidate.
    fn convert(&self, utilities: &[f64]) -> Vec<f64>;
}

impl<F> ProbabilityConversion for F
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn convert(&self, utilities: &[f64]) -> Vec<f64> {
        self(utilities)
    }
}

/// True model: probabilities proportional to utility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalize;

impl ProbabilityConversion for Normalize {
    fn convert(&self, utilities: &[f64]) -> Vec<f64> {
        // Scaled by the peak so the sum cannot overflow for huge finite utilities.
        let peak = utilities.iter().copied().fold(0.0, f64::max);
        if peak <= 0.0 || !peak.is_finite() {
            return uniform(utilities.len());
        }
        let scaled: Vec<f64> = utilities.iter().map(|utility| utility / peak).collect();
        let total: f64 = scaled.iter().sum();
        scaled.into_iter().map(|weight| weight / total).collect()
    }
}

/// Exponential mechanism: weights `exp(0.5 * epsilon * utility)`, normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExponentialMechanism {
    epsilon: f64,
}

impl ExponentialMechanism {
    /// Fails unless `epsilon` is finite and strictly positive.
    pub fn new(epsilon: f64) -> Result<Self, ConfigError> {
        CuratorConfig { epsilon }.validate()?;
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl ProbabilityConversion for ExponentialMechanism {
    fn convert(&self, utilities: &[f64]) -> Vec<f64> {
        // Shifting by the max cancels in the ratio and keeps exp() finite.
        let peak = utilities
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !peak.is_finite() {
            return uniform(utilities.len());
        }
        let weights: Vec<f64> = utilities
            .iter()
            .map(|utility| (0.5 * self.epsilon * (utility - peak)).exp())
            .collect();
        let total: f64 = weights.iter().sum();
        weights.into_iter().map(|weight| weight / total).collect()
    }
}

fn uniform(len: usize) -> Vec<f64> {
    vec![1.0 / len as f64; len]
}
