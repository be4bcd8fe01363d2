//! Exact probability of every fixed-length node sequence under a one-step
//! Markov walk: uniform start, then one conversion of the outgoing utilities
//! per step.
//!
//! The sequence space has `|nodes|^length` entries, so this is only usable
//! for small networks and short sequences. The enumeration limit on the
//! [`Network`] is checked before anything is allocated.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::conversion::ProbabilityConversion;
use crate::errors::{CuratorError, CuratorResult};
use crate::graph::{decode_rank, enumeration_size, Network, NodeIndex, Preference};
use crate::progress::{ProgressObserver, Ticker};

/// Allowed deviation of the summed distribution from 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-4;

const PROGRESS_TICKS: usize = 38;

/// Probabilities of all sequences of one length, in lexicographic order of
/// node indices (first position most significant).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceDistribution {
    node_count: usize,
    length: usize,
    probabilities: Vec<f64>,
}

impl SequenceDistribution {
    pub(crate) fn from_parts(node_count: usize, length: usize, probabilities: Vec<f64>) -> Self {
        Self {
            node_count,
            length,
            probabilities,
        }
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Nodes per sequence.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn into_probabilities(self) -> Vec<f64> {
        self.probabilities
    }

    pub fn total(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    pub fn rank_of(&self, sequence: &[NodeIndex]) -> Option<usize> {
        if sequence.len() != self.length {
            return None;
        }
        sequence.iter().try_fold(0usize, |rank, node| {
            (node.get() < self.node_count).then(|| rank * self.node_count + node.get())
        })
    }

    pub fn sequence_at(&self, rank: usize) -> Option<Vec<NodeIndex>> {
        if rank >= self.len() {
            return None;
        }
        let mut digits = vec![0; self.length];
        decode_rank(rank, self.node_count, &mut digits);
        Some(digits.into_iter().map(NodeIndex).collect())
    }

    pub fn probability_of(&self, sequence: &[NodeIndex]) -> Option<f64> {
        self.rank_of(sequence)
            .map(|rank| self.probabilities[rank])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Vec<NodeIndex>, f64)> + '_ {
        let mut digits = vec![0; self.length];
        self.probabilities
            .iter()
            .enumerate()
            .map(move |(rank, probability)| {
                decode_rank(rank, self.node_count, &mut digits);
                (digits.iter().copied().map(NodeIndex).collect(), *probability)
            })
    }

    /// `(rank, probability)` pairs, most likely first. Ties keep rank order.
    pub fn ranked(&self) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> =
            self.probabilities.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Probabilities strictly above `threshold`, largest first.
    pub fn above(&self, threshold: f64) -> Vec<f64> {
        let mut kept: Vec<f64> = self
            .probabilities
            .iter()
            .copied()
            .filter(|probability| *probability > threshold)
            .collect();
        kept.sort_by(|a, b| b.total_cmp(a));
        kept
    }
}

impl Network {
    pub fn sequence_probabilities<C>(
        &self,
        preferences: &[Preference],
        length: usize,
        conversion: &C,
    ) -> CuratorResult<SequenceDistribution>
    where
        C: ProbabilityConversion + ?Sized,
    {
        self.sequence_probabilities_with_progress(preferences, length, conversion, &mut ())
    }

    pub fn sequence_probabilities_with_progress<C, P>(
        &self,
        preferences: &[Preference],
        length: usize,
        conversion: &C,
        observer: &mut P,
    ) -> CuratorResult<SequenceDistribution>
    where
        C: ProbabilityConversion + ?Sized,
        P: ProgressObserver + ?Sized,
    {
        self.validate_preferences(preferences)?;
        if length == 0 {
            return Err(CuratorError::invalid("sequence length must be at least 1"));
        }
        let node_count = self.size();
        let count = enumeration_size(node_count, length, self.max_enumeration())?;

        // Each node has a single preference, so its transition row is fixed.
        let rows = self.transition_rows(preferences, conversion)?;

        let start = 1.0 / node_count as f64;
        let mut probabilities = Vec::with_capacity(count);
        let mut digits = vec![0; length];
        let mut ticker = Ticker::new(observer, count, PROGRESS_TICKS);
        for rank in 0..count {
            ticker.advance(rank);
            decode_rank(rank, node_count, &mut digits);
            let probability = digits
                .windows(2)
                .fold(start, |running, step| running * rows[step[0]][step[1]]);
            probabilities.push(probability);
        }
        ticker.finish();

        let distribution = SequenceDistribution::from_parts(node_count, length, probabilities);
        let total = distribution.total();
        if !((1.0 - PROBABILITY_TOLERANCE)..=(1.0 + PROBABILITY_TOLERANCE)).contains(&total) {
            error!(total, sequences = count, "sequence probabilities do not sum to 1");
            return Err(CuratorError::ProbabilityInvariant {
                total,
                tolerance: PROBABILITY_TOLERANCE,
            });
        }
        debug!(sequences = count, length, total, "computed sequence probabilities");
        Ok(distribution)
    }

    fn transition_rows<C>(
        &self,
        preferences: &[Preference],
        conversion: &C,
    ) -> CuratorResult<Vec<Vec<f64>>>
    where
        C: ProbabilityConversion + ?Sized,
    {
        preferences
            .iter()
            .enumerate()
            .map(|(source, &preference)| {
                let utilities = self.outgoing_utilities(NodeIndex(source), preference)?;
                let row = conversion.convert(&utilities);
                if row.len() != utilities.len() {
                    return Err(CuratorError::invalid(format!(
                        "conversion produced {} probabilities for {} candidates",
                        row.len(),
                        utilities.len()
                    )));
                }
                Ok(row)
            })
            .collect()
    }
}
