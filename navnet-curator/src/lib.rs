//! NavNet curator – a privacy-preserving navigation simulator. A curator holds
//! a weighted, preference-dependent content network and answers sequential
//! navigation queries by sampling each step through the exponential
//! mechanism. The exact probability engine enumerates every sequence of a
//! given length so sampled answers can be checked against ground truth.

pub mod analysis;
pub mod config;
pub mod conversion;
pub mod curator;
pub mod errors;
pub mod graph;
pub mod probability;
pub mod progress;

pub use analysis::{empirical_distribution, kl_divergence, top_sequences_error, NetworkReport};
pub use config::{
    ConfigError, CuratorConfig, EngineConfig, LinkGeneration, NetworkConfig, SimulationConfig,
};
pub use conversion::{ExponentialMechanism, Normalize, ProbabilityConversion};
pub use curator::Curator;
pub use errors::{CuratorError, CuratorResult};
pub use graph::{Link, Network, Node, NodeIndex, Preference};
pub use probability::{SequenceDistribution, PROBABILITY_TOLERANCE};
pub use progress::{ProgressObserver, TracingProgress};
