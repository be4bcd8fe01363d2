//! The curator answers navigation queries over a private network. Each step
//! of a query is drawn through the exponential mechanism, so the sampled walk
//! leaks utilities only to the degree epsilon allows.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::config::CuratorConfig;
use crate::conversion::{ExponentialMechanism, ProbabilityConversion};
use crate::errors::{CuratorError, CuratorResult};
use crate::graph::{Network, NodeIndex, Preference};
use crate::probability::SequenceDistribution;
use crate::progress::ProgressObserver;

pub struct Curator<'n> {
    mechanism: ExponentialMechanism,
    network: Option<&'n Network>,
    rng: ChaCha20Rng,
}

impl<'n> Curator<'n> {
    pub fn new(config: CuratorConfig, seed: [u8; 32]) -> CuratorResult<Self> {
        Ok(Self {
            mechanism: ExponentialMechanism::new(config.epsilon)?,
            network: None,
            rng: ChaCha20Rng::from_seed(seed),
        })
    }

    pub fn from_entropy(config: CuratorConfig) -> CuratorResult<Self> {
        let mut seed = [0u8; 32];
        StdRng::from_entropy().fill_bytes(&mut seed);
        Self::new(config, seed)
    }

    /// Attaches the network every later query runs against.
    pub fn bind(&mut self, network: &'n Network) {
        self.network = Some(network);
    }

    pub fn bound_to(mut self, network: &'n Network) -> Self {
        self.bind(network);
        self
    }

    pub fn network(&self) -> CuratorResult<&'n Network> {
        self.network.ok_or(CuratorError::Unbound)
    }

    pub fn epsilon(&self) -> f64 {
        self.mechanism.epsilon()
    }

    pub fn mechanism(&self) -> ExponentialMechanism {
        self.mechanism
    }

    pub fn exponential_mechanism(&self, utilities: &[f64]) -> Vec<f64> {
        self.mechanism.convert(utilities)
    }

    /// Samples one walk of `sequence_length` nodes and returns their names.
    ///
    /// The first node is uniform. Every following node is drawn from the
    /// exponential mechanism over the current node's outgoing utilities for
    /// the preference recorded at that node.
    pub fn query(
        &mut self,
        sequence_length: usize,
        preferences: &[Preference],
    ) -> CuratorResult<Vec<String>> {
        let network = self.network()?;
        network.validate_preferences(preferences)?;
        if sequence_length == 0 {
            return Err(CuratorError::invalid("sequence length must be at least 1"));
        }
        let mut current = network
            .nodes()
            .choose(&mut self.rng)
            .map(|node| node.index)
            .ok_or_else(|| CuratorError::invalid("network has no nodes"))?;
        let mut sequence = Vec::with_capacity(sequence_length);
        sequence.push(current);
        for _ in 1..sequence_length {
            let utilities = network.outgoing_utilities(current, preferences[current.get()])?;
            let probabilities = self.exponential_mechanism(&utilities);
            current = NodeIndex(tie_break_draw(&probabilities, &mut self.rng)?);
            sequence.push(current);
        }
        trace!(length = sequence_length, "answered query");
        Ok(sequence
            .into_iter()
            .map(|index| network.name_of(index).to_owned())
            .collect())
    }

    pub fn query_batch(
        &mut self,
        count: usize,
        sequence_length: usize,
        preferences: &[Preference],
    ) -> CuratorResult<Vec<Vec<String>>> {
        (0..count)
            .map(|_| self.query(sequence_length, preferences))
            .collect()
    }

    /// Exact distribution of [`Curator::query`] outputs for these preferences.
    pub fn private_distribution(
        &self,
        preferences: &[Preference],
        sequence_length: usize,
    ) -> CuratorResult<SequenceDistribution> {
        self.private_distribution_with_progress(preferences, sequence_length, &mut ())
    }

    pub fn private_distribution_with_progress<P>(
        &self,
        preferences: &[Preference],
        sequence_length: usize,
        observer: &mut P,
    ) -> CuratorResult<SequenceDistribution>
    where
        P: ProgressObserver + ?Sized,
    {
        self.network()?.sequence_probabilities_with_progress(
            preferences,
            sequence_length,
            &self.mechanism,
            observer,
        )
    }
}

/// Draws an index from `probabilities` without favouring early positions on
/// ties: a value is drawn from a shuffled copy weighted by itself, then one
/// of the original indices holding exactly that value is picked uniformly.
pub(crate) fn tie_break_draw<R: Rng + ?Sized>(
    probabilities: &[f64],
    rng: &mut R,
) -> CuratorResult<usize> {
    let mut shuffled = probabilities.to_vec();
    shuffled.shuffle(rng);
    let weighted = WeightedIndex::new(&shuffled)?;
    let drawn = shuffled[weighted.sample(rng)];
    let matching: Vec<usize> = probabilities
        .iter()
        .enumerate()
        .filter(|(_, probability)| **probability == drawn)
        .map(|(index, _)| index)
        .collect();
    matching
        .choose(rng)
        .copied()
        .ok_or_else(|| CuratorError::invalid("drawn probability not present in distribution"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curator<'n>(epsilon: f64) -> Curator<'n> {
        Curator::new(CuratorConfig { epsilon }, [7u8; 32]).unwrap()
    }

    #[test]
    fn rejects_invalid_epsilon() {
        assert!(matches!(
            Curator::new(CuratorConfig { epsilon: -1.0 }, [0u8; 32]),
            Err(CuratorError::Config(_))
        ));
    }

    #[test]
    fn unbound_curator_refuses_queries() {
        let mut curator = curator(100.0);
        assert!(matches!(curator.query(3, &[0]), Err(CuratorError::Unbound)));
        assert!(matches!(
            curator.private_distribution(&[0], 2),
            Err(CuratorError::Unbound)
        ));
    }

    #[test]
    fn mechanism_is_available_without_network() {
        let curator = curator(100.0);
        assert_eq!(curator.exponential_mechanism(&[0.0]), vec![1.0]);
        let uniform = curator.exponential_mechanism(&[0.0; 4]);
        assert!(uniform.iter().all(|p| (p - 0.25).abs() < 1e-9));
    }

    #[test]
    fn query_returns_requested_length_of_known_names() {
        let mut network = Network::new(4, 2).unwrap();
        network.make_all_links();
        let mut curator = curator(1.0).bound_to(&network);
        for length in 1..6 {
            let sequence = curator.query(length, &[0, 1, 1, 0]).unwrap();
            assert_eq!(sequence.len(), length);
            for name in &sequence {
                network.index_of(name).unwrap();
            }
        }
    }

    #[test]
    fn query_validates_arguments() {
        let network = Network::new(2, 2).unwrap();
        let mut curator = curator(1.0).bound_to(&network);
        assert!(matches!(
            curator.query(2, &[0, 2]),
            Err(CuratorError::PreferenceOutOfRange { .. })
        ));
        assert!(matches!(
            curator.query(2, &[0]),
            Err(CuratorError::PreferenceCountMismatch { .. })
        ));
        assert!(curator.query(0, &[0, 0]).is_err());
    }

    #[test]
    fn same_seed_same_answers() {
        let mut network = Network::new(5, 1).unwrap();
        network.make_all_links();
        let mut a = curator(2.0).bound_to(&network);
        let mut b = curator(2.0).bound_to(&network);
        assert_eq!(
            a.query_batch(20, 4, &[0; 5]).unwrap(),
            b.query_batch(20, 4, &[0; 5]).unwrap()
        );
    }

    #[test]
    fn strongly_preferred_link_dominates_at_high_epsilon() {
        let mut network = Network::new(3, 1).unwrap();
        for source in 0..3 {
            network
                .insert_link(NodeIndex(source), NodeIndex(2), 0, 1.0)
                .unwrap();
        }
        let mut curator = curator(100.0).bound_to(&network);
        for sequence in curator.query_batch(50, 3, &[0; 3]).unwrap() {
            assert_eq!(sequence[1], "Node3");
            assert_eq!(sequence[2], "Node3");
        }
    }

    #[test]
    fn tie_break_is_uniform_over_equal_probabilities() {
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        let mut counts = [0usize; 4];
        let trials = 40_000;
        for _ in 0..trials {
            counts[tie_break_draw(&[0.25; 4], &mut rng).unwrap()] += 1;
        }
        for count in counts {
            let share = count as f64 / trials as f64;
            assert!((share - 0.25).abs() < 0.02, "{counts:?}");
        }
    }

    #[test]
    fn tie_break_follows_unequal_weights() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let probabilities = [0.1, 0.6, 0.1, 0.2];
        let mut counts = [0usize; 4];
        let trials = 40_000;
        for _ in 0..trials {
            counts[tie_break_draw(&probabilities, &mut rng).unwrap()] += 1;
        }
        for (count, expected) in counts.iter().zip(probabilities) {
            let share = *count as f64 / trials as f64;
            assert!((share - expected).abs() < 0.02, "{counts:?}");
        }
    }

    #[test]
    fn tie_break_rejects_zero_mass() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!(matches!(
            tie_break_draw(&[0.0, 0.0], &mut rng),
            Err(CuratorError::Sampling(_))
        ));
    }
}
