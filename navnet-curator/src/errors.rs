use rand::distributions::WeightedError;
use thiserror::Error;

use crate::config::ConfigError;

pub type CuratorResult<T> = Result<T, CuratorError>;

#[derive(Debug, Error)]
pub enum CuratorError {
    /// The curator was used before a network was bound to it.
    #[error("curator has no network bound")]
    Unbound,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("preference {preference} at node {node} is outside [0, {interactivity})")]
    PreferenceOutOfRange {
        node: usize,
        preference: usize,
        interactivity: usize,
    },
    #[error("expected {expected} preferences (one per node), got {actual}")]
    PreferenceCountMismatch { expected: usize, actual: usize },
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("enumerating {base}^{exponent} entries exceeds the limit of {limit}")]
    EnumerationTooLarge {
        base: usize,
        exponent: usize,
        limit: usize,
    },
    /// Fatal: the conversion or the enumeration is not a probability distribution.
    #[error("sequence probabilities sum to {total}, outside 1 ± {tolerance}")]
    ProbabilityInvariant { total: f64, tolerance: f64 },
    #[error(transparent)]
    Sampling(#[from] WeightedError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CuratorError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
