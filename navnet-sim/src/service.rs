//! Experiment runs against one curated network.
//!
//! # Example
//! ```
//! use navnet_sim::config::Config;
//! use navnet_sim::service::SimulationService;
//!
//! let cfg = Config::sample();
//! let service = SimulationService::from_config(&cfg).unwrap();
//! let report = service.run_queries(cfg.experiment.queries).unwrap();
//! assert_eq!(report.sequences.len(), cfg.experiment.queries);
//! ```

use navnet_curator::{
    empirical_distribution, kl_divergence, top_sequences_error, Curator, CuratorError, Network,
    NetworkReport, NodeIndex, Preference, ProgressObserver, SequenceDistribution,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{Config, ExperimentSection};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Curator(#[from] CuratorError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    pub preferences: Vec<Preference>,
    pub sequences: Vec<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedSequence {
    pub nodes: Vec<String>,
    pub probability: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub preferences: Vec<Preference>,
    pub sequences: usize,
    pub total: f64,
    pub top: Vec<RankedSequence>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CutoffError {
    pub cutoff_fraction: f64,
    pub error: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePoint {
    /// Total queries observed so far.
    pub queries: usize,
    /// `D(exact || empirical)`; infinite (serialized as null) while some
    /// possible sequence has not been observed yet.
    pub kl_divergence: f64,
    pub top_errors: Vec<CutoffError>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub preferences: Vec<Preference>,
    pub epsilon: f64,
    pub points: Vec<ConvergencePoint>,
}

pub struct SimulationService {
    config: Config,
    network: Network,
    preferences: Vec<Preference>,
}

impl SimulationService {
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let simulation = &config.simulation;
        let mut network = Network::from_config(&simulation.network, &simulation.engine)?;
        let mut link_rng = ChaCha20Rng::from_seed(simulation.stream_seed("links"));
        network.generate_links(&simulation.links, &mut link_rng)?;
        let preferences = match &config.experiment.preferences {
            Some(preferences) => preferences.clone(),
            None => {
                let mut rng = ChaCha20Rng::from_seed(simulation.stream_seed("preferences"));
                network.get_random_preferences(&mut rng)
            }
        };
        network.validate_preferences(&preferences)?;
        info!(
            nodes = network.size(),
            interactivity = network.interactivity(),
            links = network.link_count(),
            "network ready"
        );
        Ok(Self {
            config: config.clone(),
            network,
            preferences,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn preferences(&self) -> &[Preference] {
        &self.preferences
    }

    fn experiment(&self) -> &ExperimentSection {
        &self.config.experiment
    }

    fn sequence_length(&self) -> usize {
        self.config.simulation.sequence_length
    }

    /// Fresh curator bound to this network; every run starts from the same
    /// seeded random stream.
    fn curator(&self) -> Result<Curator<'_>, ServiceError> {
        let simulation = &self.config.simulation;
        Ok(
            Curator::new(simulation.curator.clone(), simulation.stream_seed("curator"))?
                .bound_to(&self.network),
        )
    }

    pub fn run_queries(&self, count: usize) -> Result<QueryReport, ServiceError> {
        let mut curator = self.curator()?;
        let sequences = curator.query_batch(count, self.sequence_length(), &self.preferences)?;
        info!(count, "queries answered");
        Ok(QueryReport {
            preferences: self.preferences.clone(),
            sequences,
        })
    }

    pub fn distribution<P>(&self, observer: &mut P) -> Result<DistributionReport, ServiceError>
    where
        P: ProgressObserver + ?Sized,
    {
        let curator = self.curator()?;
        let distribution = curator.private_distribution_with_progress(
            &self.preferences,
            self.sequence_length(),
            observer,
        )?;
        let top = distribution
            .ranked()
            .into_iter()
            .take(self.experiment().top)
            .filter_map(|(rank, probability)| {
                distribution.sequence_at(rank).map(|sequence| RankedSequence {
                    nodes: self.names(&sequence),
                    probability,
                })
            })
            .collect();
        Ok(DistributionReport {
            preferences: self.preferences.clone(),
            sequences: distribution.len(),
            total: distribution.total(),
            top,
        })
    }

    pub fn network_report<P>(&self, observer: &mut P) -> Result<NetworkReport, ServiceError>
    where
        P: ProgressObserver + ?Sized,
    {
        let curator = self.curator()?;
        let distribution = curator.private_distribution_with_progress(
            &self.preferences,
            self.sequence_length(),
            observer,
        )?;
        Ok(NetworkReport::from_distribution(
            &curator,
            &self.preferences,
            &distribution,
        )?)
    }

    /// Issues queries in batches up to each configured cumulative count and
    /// measures how well their empirical frequencies match the exact private
    /// distribution.
    pub fn convergence<P>(&self, observer: &mut P) -> Result<ConvergenceReport, ServiceError>
    where
        P: ProgressObserver + ?Sized,
    {
        let mut curator = self.curator()?;
        let length = self.sequence_length();
        let exact =
            curator.private_distribution_with_progress(&self.preferences, length, observer)?;
        let mut observed: Vec<Vec<String>> = Vec::new();
        let mut points = Vec::with_capacity(self.experiment().query_counts.len());
        for &target in &self.experiment().query_counts {
            let missing = target.saturating_sub(observed.len());
            observed.extend(curator.query_batch(missing, length, &self.preferences)?);
            if observed.is_empty() {
                continue;
            }
            let empirical = empirical_distribution(&self.network, length, &observed)?;
            let point = self.measure(&exact, &empirical, observed.len())?;
            info!(
                queries = point.queries,
                kl_divergence = point.kl_divergence,
                "convergence point"
            );
            points.push(point);
        }
        Ok(ConvergenceReport {
            preferences: self.preferences.clone(),
            epsilon: curator.epsilon(),
            points,
        })
    }

    fn measure(
        &self,
        exact: &SequenceDistribution,
        empirical: &SequenceDistribution,
        queries: usize,
    ) -> Result<ConvergencePoint, ServiceError> {
        let kl = kl_divergence(exact.probabilities(), empirical.probabilities())?;
        let top_errors = self
            .experiment()
            .cutoff_fractions
            .iter()
            .map(|&cutoff_fraction| {
                top_sequences_error(exact, empirical, cutoff_fraction).map(|error| CutoffError {
                    cutoff_fraction,
                    error,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ConvergencePoint {
            queries,
            kl_divergence: kl,
            top_errors,
        })
    }

    fn names(&self, sequence: &[NodeIndex]) -> Vec<String> {
        sequence
            .iter()
            .filter_map(|index| self.network.node(*index))
            .map(|node| node.name.clone())
            .collect()
    }
}
