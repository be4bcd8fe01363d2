//! Measurements that compare an estimated sequence distribution with the
//! curator's exact one.

use serde::{Deserialize, Serialize};

use crate::curator::Curator;
use crate::errors::{CuratorError, CuratorResult};
use crate::graph::{enumeration_size, Network, Preference};
use crate::probability::SequenceDistribution;

/// Relative frequency of each observed sequence, laid out in the same order
/// as [`Network::sequence_probabilities`].
pub fn empirical_distribution(
    network: &Network,
    length: usize,
    sequences: &[Vec<String>],
) -> CuratorResult<SequenceDistribution> {
    if length == 0 {
        return Err(CuratorError::invalid("sequence length must be at least 1"));
    }
    if sequences.is_empty() {
        return Err(CuratorError::invalid("no sequences observed"));
    }
    let size = network.size();
    let count = enumeration_size(size, length, network.max_enumeration())?;
    let mut tallies = vec![0usize; count];
    for sequence in sequences {
        if sequence.len() != length {
            return Err(CuratorError::invalid(format!(
                "observed sequence of length {}, expected {length}",
                sequence.len()
            )));
        }
        let mut rank = 0;
        for name in sequence {
            rank = rank * size + network.index_of(name)?.get();
        }
        tallies[rank] += 1;
    }
    let observed = sequences.len() as f64;
    Ok(SequenceDistribution::from_parts(
        size,
        length,
        tallies
            .into_iter()
            .map(|tally| tally as f64 / observed)
            .collect(),
    ))
}

/// Kullback-Leibler divergence `D(reference || approximation)` in nats.
///
/// Terms with zero reference mass contribute nothing; reference mass on a
/// zero-probability approximation makes the divergence infinite.
pub fn kl_divergence(reference: &[f64], approximation: &[f64]) -> CuratorResult<f64> {
    if reference.len() != approximation.len() {
        return Err(CuratorError::invalid(format!(
            "distributions differ in length: {} vs {}",
            reference.len(),
            approximation.len()
        )));
    }
    let mut divergence = 0.0;
    for (&p, &q) in reference.iter().zip(approximation) {
        if p <= 0.0 {
            continue;
        }
        if q <= 0.0 {
            return Ok(f64::INFINITY);
        }
        divergence += p * (p / q).ln();
    }
    Ok(divergence)
}

/// Share of the reference's top `cutoff_fraction` sequences that are missing
/// from the estimate's top set of the same size.
pub fn top_sequences_error(
    reference: &SequenceDistribution,
    estimate: &SequenceDistribution,
    cutoff_fraction: f64,
) -> CuratorResult<f64> {
    if reference.len() != estimate.len() {
        return Err(CuratorError::invalid("distributions cover different sequence spaces"));
    }
    if !(cutoff_fraction > 0.0 && cutoff_fraction <= 1.0) {
        return Err(CuratorError::invalid(format!(
            "cutoff fraction must be within (0, 1], got {cutoff_fraction}"
        )));
    }
    let cutoff = (cutoff_fraction * reference.len() as f64) as usize;
    if cutoff == 0 {
        return Err(CuratorError::invalid("cutoff selects no sequences"));
    }
    let mut in_estimate = vec![false; estimate.len()];
    for (rank, _) in estimate.ranked().into_iter().take(cutoff) {
        in_estimate[rank] = true;
    }
    let missing = reference
        .ranked()
        .into_iter()
        .take(cutoff)
        .filter(|(rank, _)| !in_estimate[*rank])
        .count();
    Ok(missing as f64 / cutoff as f64)
}

/// Link-utility and sequence-probability profile of one curated network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkReport {
    pub nodes: usize,
    pub interactivity: usize,
    pub epsilon: f64,
    pub sequence_length: usize,
    pub preferences: Vec<Preference>,
    /// Defined link utilities, largest first.
    pub link_utilities: Vec<f64>,
    /// Private sequence probabilities above `10^-sequence_length`, largest first.
    pub sequence_probabilities: Vec<f64>,
}

impl NetworkReport {
    pub fn build(
        curator: &Curator<'_>,
        preferences: &[Preference],
        sequence_length: usize,
    ) -> CuratorResult<Self> {
        let distribution = curator.private_distribution(preferences, sequence_length)?;
        Self::from_distribution(curator, preferences, &distribution)
    }

    /// Builds the report from an already computed private distribution.
    pub fn from_distribution(
        curator: &Curator<'_>,
        preferences: &[Preference],
        distribution: &SequenceDistribution,
    ) -> CuratorResult<Self> {
        let network = curator.network()?;
        let sequence_length = distribution.length();
        let floor = 10f64.powi(-i32::try_from(sequence_length).unwrap_or(i32::MAX));
        Ok(Self {
            nodes: network.size(),
            interactivity: network.interactivity(),
            epsilon: curator.epsilon(),
            sequence_length,
            preferences: preferences.to_vec(),
            link_utilities: network.sorted_link_utilities(),
            sequence_probabilities: distribution.above(floor),
        })
    }
}
