//! Weighted content network: nodes, preference-dependent links, and the
//! preference spaces the engines enumerate.
//!
//! Links live in a sparse map keyed by `(source, destination, preference)`.
//! A missing key is not an error: it is a link of utility 0. A preference
//! outside `[0, interactivity)` is always an error.

use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EngineConfig, LinkGeneration, NetworkConfig};
use crate::errors::{CuratorError, CuratorResult};

/// User input recorded at a node, in `[0, interactivity)`.
pub type Preference = usize;

/// Stable position of a node in its network, assigned at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl NodeIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub index: NodeIndex,
    pub name: String,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeIndex,
    pub destination: NodeIndex,
    pub preference: Preference,
    pub utility: f64,
}

type LinkKey = (NodeIndex, NodeIndex, Preference);

#[derive(Clone, Debug)]
pub struct Network {
    interactivity: usize,
    nodes: Vec<Node>,
    names: HashMap<String, NodeIndex>,
    links: HashMap<LinkKey, Link>,
    max_enumeration: usize,
}

impl Network {
    pub fn new(size: usize, interactivity: usize) -> CuratorResult<Self> {
        if interactivity == 0 {
            return Err(CuratorError::invalid("interactivity must be greater than zero"));
        }
        let mut network = Self {
            interactivity,
            nodes: Vec::new(),
            names: HashMap::new(),
            links: HashMap::new(),
            max_enumeration: EngineConfig::default().max_enumeration,
        };
        network.make_nodes(size)?;
        Ok(network)
    }

    pub fn from_config(network: &NetworkConfig, engine: &EngineConfig) -> CuratorResult<Self> {
        network.validate()?;
        Ok(Self::new(network.size, network.interactivity)?
            .with_enumeration_limit(engine.max_enumeration))
    }

    /// Caps how many sequences or preference tuples may be enumerated.
    pub fn with_enumeration_limit(mut self, limit: usize) -> Self {
        self.max_enumeration = limit.max(1);
        self
    }

    /// Replaces the node list with `count` nodes named `Node1..NodeN`.
    /// Existing links refer to the old nodes and are dropped.
    pub fn make_nodes(&mut self, count: usize) -> CuratorResult<()> {
        if count == 0 {
            return Err(CuratorError::invalid("network size must be greater than zero"));
        }
        self.nodes = (0..count)
            .map(|n| Node {
                index: NodeIndex(n),
                name: format!("Node{}", n + 1),
            })
            .collect();
        self.names = self
            .nodes
            .iter()
            .map(|node| (node.name.clone(), node.index))
            .collect();
        self.links.clear();
        Ok(())
    }

    /// Defines every (source, destination, response) link with utility 1,
    /// self-links included.
    pub fn make_all_links(&mut self) {
        let size = self.size();
        for source in 0..size {
            for destination in 0..size {
                for preference in 0..self.interactivity {
                    self.put(NodeIndex(source), NodeIndex(destination), preference, 1.0);
                }
            }
        }
        debug!(links = self.links.len(), "defined every link with unit utility");
    }

    /// Keeps each possible link with probability `density` and draws its
    /// utility as `U^skew_power` for `U` uniform on `[0, 1)`.
    pub fn make_random_links<R: Rng + ?Sized>(
        &mut self,
        density: f64,
        skew_power: f64,
        rng: &mut R,
    ) -> CuratorResult<()> {
        LinkGeneration::Random {
            density,
            skew_power,
        }
        .validate()?;
        self.links.clear();
        let size = self.size();
        for source in 0..size {
            for destination in 0..size {
                for preference in 0..self.interactivity {
                    if rng.gen::<f64>() > density {
                        continue;
                    }
                    let utility = rng.gen::<f64>().powf(skew_power);
                    self.put(NodeIndex(source), NodeIndex(destination), preference, utility);
                }
            }
        }
        debug!(
            links = self.links.len(),
            density, skew_power, "generated random links"
        );
        Ok(())
    }

    pub fn generate_links<R: Rng + ?Sized>(
        &mut self,
        generation: &LinkGeneration,
        rng: &mut R,
    ) -> CuratorResult<()> {
        match *generation {
            LinkGeneration::All => {
                self.make_all_links();
                Ok(())
            }
            LinkGeneration::Random {
                density,
                skew_power,
            } => self.make_random_links(density, skew_power, rng),
        }
    }

    pub fn insert_link(
        &mut self,
        source: NodeIndex,
        destination: NodeIndex,
        preference: Preference,
        utility: f64,
    ) -> CuratorResult<()> {
        self.check_node(source)?;
        self.check_node(destination)?;
        self.check_preference(source, preference)?;
        if !utility.is_finite() || utility < 0.0 {
            return Err(CuratorError::invalid(format!(
                "link utility must be finite and >= 0, got {utility}"
            )));
        }
        self.put(source, destination, preference, utility);
        Ok(())
    }

    fn put(
        &mut self,
        source: NodeIndex,
        destination: NodeIndex,
        preference: Preference,
        utility: f64,
    ) {
        self.links.insert(
            (source, destination, preference),
            Link {
                source,
                destination,
                preference,
                utility,
            },
        );
    }

    /// Every preference tuple, one response per node, in lexicographic order.
    pub fn get_all_preferences(&self) -> CuratorResult<Vec<Vec<Preference>>> {
        let count = enumeration_size(self.interactivity, self.size(), self.max_enumeration)?;
        let mut digits = vec![0; self.size()];
        let mut all = Vec::with_capacity(count);
        for rank in 0..count {
            decode_rank(rank, self.interactivity, &mut digits);
            all.push(digits.clone());
        }
        Ok(all)
    }

    pub fn get_random_preferences<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Preference> {
        (0..self.size())
            .map(|_| rng.gen_range(0..self.interactivity))
            .collect()
    }

    pub fn validate_preferences(&self, preferences: &[Preference]) -> CuratorResult<()> {
        if preferences.len() != self.size() {
            return Err(CuratorError::PreferenceCountMismatch {
                expected: self.size(),
                actual: preferences.len(),
            });
        }
        for (node, &preference) in preferences.iter().enumerate() {
            self.check_preference(NodeIndex(node), preference)?;
        }
        Ok(())
    }

    /// Utility of the link, 0 when it is not defined.
    pub fn utility(
        &self,
        source: NodeIndex,
        destination: NodeIndex,
        preference: Preference,
    ) -> CuratorResult<f64> {
        self.check_node(source)?;
        self.check_node(destination)?;
        self.check_preference(source, preference)?;
        Ok(self
            .links
            .get(&(source, destination, preference))
            .map_or(0.0, |link| link.utility))
    }

    /// Utilities from `source` to every node, in node order.
    pub fn outgoing_utilities(
        &self,
        source: NodeIndex,
        preference: Preference,
    ) -> CuratorResult<Vec<f64>> {
        self.check_node(source)?;
        self.check_preference(source, preference)?;
        Ok(self
            .nodes
            .iter()
            .map(|node| {
                self.links
                    .get(&(source, node.index, preference))
                    .map_or(0.0, |link| link.utility)
            })
            .collect())
    }

    pub fn link(
        &self,
        source: NodeIndex,
        destination: NodeIndex,
        preference: Preference,
    ) -> Option<&Link> {
        self.links.get(&(source, destination, preference))
    }

    /// Defined links in no particular order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn sorted_link_utilities(&self) -> Vec<f64> {
        let mut utilities: Vec<f64> = self.links.values().map(|link| link.utility).collect();
        utilities.sort_by(|a, b| b.total_cmp(a));
        utilities
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn interactivity(&self) -> usize {
        self.interactivity
    }

    pub fn max_enumeration(&self) -> usize {
        self.max_enumeration
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.0)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> CuratorResult<NodeIndex> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| CuratorError::UnknownNode(name.to_owned()))
    }

    pub(crate) fn name_of(&self, index: NodeIndex) -> &str {
        &self.nodes[index.0].name
    }

    fn check_node(&self, index: NodeIndex) -> CuratorResult<()> {
        if index.0 >= self.size() {
            return Err(CuratorError::UnknownNode(format!("#{}", index.0)));
        }
        Ok(())
    }

    fn check_preference(&self, node: NodeIndex, preference: Preference) -> CuratorResult<()> {
        if preference >= self.interactivity {
            return Err(CuratorError::PreferenceOutOfRange {
                node: node.0,
                preference,
                interactivity: self.interactivity,
            });
        }
        Ok(())
    }
}

/// `base^exponent`, rejected when it overflows or exceeds `limit`.
pub(crate) fn enumeration_size(base: usize, exponent: usize, limit: usize) -> CuratorResult<usize> {
    u32::try_from(exponent)
        .ok()
        .and_then(|exp| base.checked_pow(exp))
        .filter(|count| *count <= limit)
        .ok_or(CuratorError::EnumerationTooLarge {
            base,
            exponent,
            limit,
        })
}

/// Writes the base-`base` digits of `rank` into `digits`, most significant first.
pub(crate) fn decode_rank(mut rank: usize, base: usize, digits: &mut [usize]) {
    for digit in digits.iter_mut().rev() {
        *digit = rank % base;
        rank /= base;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn names_nodes_from_one() {
        let network = Network::new(3, 2).unwrap();
        let names: Vec<&str> = network.node_names().collect();
        assert_eq!(names, ["Node1", "Node2", "Node3"]);
        assert_eq!(network.index_of("Node2").unwrap(), NodeIndex(1));
        assert_eq!(network.node(NodeIndex(2)).unwrap().to_string(), "Node3");
        assert!(matches!(
            network.index_of("Node4"),
            Err(CuratorError::UnknownNode(_))
        ));
    }

    #[test]
    fn rejects_empty_network() {
        assert!(Network::new(0, 2).is_err());
        assert!(Network::new(2, 0).is_err());
    }

    #[test]
    fn all_links_cover_every_pair_and_response() {
        let mut network = Network::new(4, 3).unwrap();
        network.make_all_links();
        assert_eq!(network.link_count(), 4 * 4 * 3);
        assert!(network.links().all(|link| link.utility == 1.0));
        assert_eq!(
            network.utility(NodeIndex(2), NodeIndex(2), 1).unwrap(),
            1.0
        );
    }

    #[test]
    fn remaking_nodes_drops_links() {
        let mut network = Network::new(2, 1).unwrap();
        network.make_all_links();
        network.make_nodes(5).unwrap();
        assert_eq!(network.size(), 5);
        assert_eq!(network.link_count(), 0);
    }

    #[test]
    fn random_link_density_extremes() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let mut network = Network::new(5, 2).unwrap();
        network.make_random_links(0.0, 1.0, &mut rng).unwrap();
        assert_eq!(network.link_count(), 0);
        network.make_random_links(1.0, 3.0, &mut rng).unwrap();
        assert_eq!(network.link_count(), 5 * 5 * 2);
        assert!(network
            .links()
            .all(|link| (0.0..1.0).contains(&link.utility)));
    }

    #[test]
    fn random_links_are_reproducible_from_seed() {
        let build = || {
            let mut rng = ChaCha20Rng::seed_from_u64(5);
            let mut network = Network::new(6, 2).unwrap();
            network.make_random_links(0.5, 2.0, &mut rng).unwrap();
            network.sorted_link_utilities()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn random_links_reject_bad_parameters() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut network = Network::new(2, 1).unwrap();
        assert!(network.make_random_links(-0.1, 1.0, &mut rng).is_err());
        assert!(network.make_random_links(0.5, 0.0, &mut rng).is_err());
    }

    #[test]
    fn missing_link_has_zero_utility_but_bad_preference_errors() {
        let mut network = Network::new(3, 2).unwrap();
        network
            .insert_link(NodeIndex(0), NodeIndex(2), 1, 0.75)
            .unwrap();
        assert_eq!(
            network.outgoing_utilities(NodeIndex(0), 1).unwrap(),
            vec![0.0, 0.0, 0.75]
        );
        let link = network.link(NodeIndex(0), NodeIndex(2), 1).unwrap();
        assert_eq!(link.utility, 0.75);
        assert_eq!(link.destination, NodeIndex(2));
        assert!(network.link(NodeIndex(0), NodeIndex(2), 0).is_none());
        assert_eq!(network.utility(NodeIndex(0), NodeIndex(1), 0).unwrap(), 0.0);
        assert!(matches!(
            network.utility(NodeIndex(0), NodeIndex(1), 2),
            Err(CuratorError::PreferenceOutOfRange {
                preference: 2,
                interactivity: 2,
                ..
            })
        ));
    }

    #[test]
    fn insert_link_rejects_negative_utility() {
        let mut network = Network::new(2, 1).unwrap();
        assert!(network
            .insert_link(NodeIndex(0), NodeIndex(1), 0, -1.0)
            .is_err());
        assert!(network
            .insert_link(NodeIndex(0), NodeIndex(7), 0, 1.0)
            .is_err());
    }

    #[test]
    fn enumerates_all_preferences_in_product_order() {
        let network = Network::new(3, 2).unwrap();
        let all = network.get_all_preferences().unwrap();
        assert_eq!(all.len(), 8);
        assert_eq!(all[0], vec![0, 0, 0]);
        assert_eq!(all[1], vec![0, 0, 1]);
        assert_eq!(all[6], vec![1, 1, 0]);
        assert_eq!(all[7], vec![1, 1, 1]);
    }

    #[test]
    fn preference_enumeration_respects_limit() {
        let network = Network::new(10, 2).unwrap().with_enumeration_limit(512);
        assert!(matches!(
            network.get_all_preferences(),
            Err(CuratorError::EnumerationTooLarge { base: 2, exponent: 10, .. })
        ));
    }

    #[test]
    fn validates_preference_tuples() {
        let network = Network::new(3, 2).unwrap();
        network.validate_preferences(&[0, 1, 1]).unwrap();
        assert!(matches!(
            network.validate_preferences(&[0, 1]),
            Err(CuratorError::PreferenceCountMismatch { expected: 3, actual: 2 })
        ));
        assert!(matches!(
            network.validate_preferences(&[0, 2, 1]),
            Err(CuratorError::PreferenceOutOfRange { node: 1, .. })
        ));
    }

    #[test]
    fn random_preferences_stay_in_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let network = Network::new(8, 3).unwrap();
        for _ in 0..50 {
            let preferences = network.get_random_preferences(&mut rng);
            network.validate_preferences(&preferences).unwrap();
        }
    }
}
