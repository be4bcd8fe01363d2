use blake3::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration invalid: {0}")]
    Validation(String),
}

const fn default_size() -> usize {
    10
}

const fn default_interactivity() -> usize {
    2
}

const fn default_epsilon() -> f64 {
    100.0
}

const fn default_density() -> f64 {
    0.1
}

const fn default_skew_power() -> f64 {
    1.0
}

const fn default_max_enumeration() -> usize {
    4_194_304
}

const fn default_sequence_length() -> usize {
    4
}

/// Shape of the content network.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Number of nodes.
    #[serde(default = "default_size")]
    pub size: usize,
    /// Number of user responses possible at every node.
    #[serde(default = "default_interactivity")]
    pub interactivity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            interactivity: default_interactivity(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::Validation(
                "network size must be greater than zero".into(),
            ));
        }
        if self.interactivity == 0 {
            return Err(ConfigError::Validation(
                "interactivity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CuratorConfig {
    /// Privacy budget. Larger values follow utilities more closely.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
        }
    }
}

impl CuratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "epsilon must be finite and > 0, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// How links are populated after the nodes are created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum LinkGeneration {
    /// Every (source, destination, response) link with utility 1.
    All,
    /// Each link kept with probability `density`, utility `U^skew_power`.
    Random {
        #[serde(default = "default_density")]
        density: f64,
        #[serde(rename = "skew-power", default = "default_skew_power")]
        skew_power: f64,
    },
}

impl Default for LinkGeneration {
    fn default() -> Self {
        Self::Random {
            density: default_density(),
            skew_power: default_skew_power(),
        }
    }
}

impl LinkGeneration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::All => Ok(()),
            Self::Random {
                density,
                skew_power,
            } => {
                if !(0.0..=1.0).contains(&density) {
                    return Err(ConfigError::Validation(format!(
                        "link density must be within [0, 1], got {density}"
                    )));
                }
                if !skew_power.is_finite() || skew_power <= 0.0 {
                    return Err(ConfigError::Validation(format!(
                        "skew power must be finite and > 0, got {skew_power}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Limits for exhaustive enumeration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Largest sequence or preference space the exact engine will enumerate.
    #[serde(default = "default_max_enumeration")]
    pub max_enumeration: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_enumeration: default_max_enumeration(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SimulationConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub curator: CuratorConfig,
    #[serde(default)]
    pub links: LinkGeneration,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Root seed; every random stream is derived from it.
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            curator: CuratorConfig::default(),
            links: LinkGeneration::default(),
            engine: EngineConfig::default(),
            seed: 0,
            sequence_length: default_sequence_length(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        self.curator.validate()?;
        self.links.validate()?;
        if self.engine.max_enumeration == 0 {
            return Err(ConfigError::Validation(
                "max enumeration must be greater than zero".into(),
            ));
        }
        if self.sequence_length == 0 {
            return Err(ConfigError::Validation(
                "sequence length must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Small fully-linked network, handy for demos and tests.
    pub fn sample() -> Self {
        Self {
            network: NetworkConfig {
                size: 3,
                interactivity: 2,
            },
            links: LinkGeneration::All,
            seed: 7,
            sequence_length: 3,
            ..Self::default()
        }
    }

    /// Derives an independent 32-byte seed for the stream named `label`.
    pub fn stream_seed(&self, label: &str) -> [u8; 32] {
        let mut hasher = Hasher::new();
        hasher.update(b"navnet/");
        hasher.update(label.as_bytes());
        hasher.update(&self.seed.to_le_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(hasher.finalize().as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        SimulationConfig::default().validate().unwrap();
        SimulationConfig::sample().validate().unwrap();
    }

    #[test]
    fn rejects_non_positive_epsilon() {
        let mut config = SimulationConfig::default();
        config.curator.epsilon = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.curator.epsilon = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_density_outside_unit_interval() {
        let mut config = SimulationConfig::default();
        config.links = LinkGeneration::Random {
            density: 1.5,
            skew_power: 1.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn stream_seeds_differ_by_label_and_root() {
        let config = SimulationConfig::default();
        assert_ne!(config.stream_seed("links"), config.stream_seed("curator"));
        let other = SimulationConfig {
            seed: 1,
            ..SimulationConfig::default()
        };
        assert_ne!(config.stream_seed("links"), other.stream_seed("links"));
        assert_eq!(config.stream_seed("links"), config.stream_seed("links"));
    }

    #[test]
    fn parses_tagged_link_generation() {
        let json = r#"{"mode": "random", "density": 0.4, "skew-power": 2.0}"#;
        let links: LinkGeneration = serde_json::from_str(json).unwrap();
        assert_eq!(
            links,
            LinkGeneration::Random {
                density: 0.4,
                skew_power: 2.0
            }
        );
        let all: LinkGeneration = serde_json::from_str(r#"{"mode": "all"}"#).unwrap();
        assert_eq!(all, LinkGeneration::All);
    }
}
