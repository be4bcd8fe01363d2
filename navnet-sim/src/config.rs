use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use navnet_curator::{Preference, SimulationConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConfigFormat {
    Auto,
    Toml,
    Yaml,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format:?} config: {details}")]
    Parse {
        format: ConfigFormat,
        details: String,
    },
    #[error(transparent)]
    Simulation(#[from] navnet_curator::ConfigError),
    #[error("configuration invalid: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub experiment: ExperimentSection,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ExperimentSection {
    /// Queries issued by the `query` command.
    #[serde(default = "default_queries")]
    pub queries: usize,
    /// Sequences listed by the `distribution` command.
    #[serde(default = "default_top")]
    pub top: usize,
    #[serde(default = "default_cutoff_fractions")]
    pub cutoff_fractions: Vec<f64>,
    /// Cumulative query totals at which convergence is measured.
    #[serde(default = "default_query_counts")]
    pub query_counts: Vec<usize>,
    /// Fixed user preferences; drawn at random when absent.
    #[serde(default)]
    pub preferences: Option<Vec<Preference>>,
}

const fn default_queries() -> usize {
    1_000
}

const fn default_top() -> usize {
    10
}

fn default_cutoff_fractions() -> Vec<f64> {
    vec![0.1, 0.5]
}

fn default_query_counts() -> Vec<usize> {
    vec![10, 100, 1_000, 10_000]
}

impl Default for ExperimentSection {
    fn default() -> Self {
        Self {
            queries: default_queries(),
            top: default_top(),
            cutoff_fractions: default_cutoff_fractions(),
            query_counts: default_query_counts(),
            preferences: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        if self
            .experiment
            .cutoff_fractions
            .iter()
            .any(|fraction| !(*fraction > 0.0 && *fraction <= 1.0))
        {
            return Err(ConfigError::Validation(
                "cutoff fractions must lie within (0, 1]".into(),
            ));
        }
        if !self
            .experiment
            .query_counts
            .windows(2)
            .all(|pair| pair[0] < pair[1])
        {
            return Err(ConfigError::Validation(
                "query counts must be strictly increasing".into(),
            ));
        }
        if let Some(preferences) = &self.experiment.preferences {
            if preferences.len() != self.simulation.network.size {
                return Err(ConfigError::Validation(format!(
                    "expected {} preferences, got {}",
                    self.simulation.network.size,
                    preferences.len()
                )));
            }
        }
        Ok(())
    }

    pub fn sample() -> Self {
        Self {
            simulation: SimulationConfig::sample(),
            experiment: ExperimentSection {
                queries: 100,
                top: 5,
                query_counts: vec![10, 100, 1_000],
                ..ExperimentSection::default()
            },
        }
    }
}

pub fn load_config(path: &Path, format: ConfigFormat) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&contents, resolve_format(path, format))?;
    config.validate()?;
    Ok(config)
}

pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    match format {
        ConfigFormat::Toml | ConfigFormat::Auto => {
            toml::from_str(contents).map_err(|err| ConfigError::Parse {
                format: ConfigFormat::Toml,
                details: err.to_string(),
            })
        }
        ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse {
            format,
            details: err.to_string(),
        }),
    }
}

fn resolve_format(path: &Path, format: ConfigFormat) -> ConfigFormat {
    match format {
        ConfigFormat::Auto => match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        },
        _ => format,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use navnet_curator::LinkGeneration;

    use super::*;

    #[test]
    fn sample_is_valid() {
        Config::sample().validate().unwrap();
    }

    #[test]
    fn rejects_mismatched_preferences() {
        let mut config = Config::sample();
        config.experiment.preferences = Some(vec![0]);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_unordered_query_counts() {
        let mut config = Config::sample();
        config.experiment.query_counts = vec![100, 10];
        assert!(config.validate().is_err());
    }

    #[test]
    fn surfaces_simulation_errors() {
        let mut config = Config::sample();
        config.simulation.curator.epsilon = -2.0;
        assert!(matches!(config.validate(), Err(ConfigError::Simulation(_))));
    }

    #[test]
    fn parses_toml_config() {
        let contents = r#"
            [simulation]
            seed = 11
            sequence-length = 3

            [simulation.network]
            size = 4
            interactivity = 3

            [simulation.links]
            mode = "random"
            density = 0.25
            skew-power = 2.0

            [experiment]
            queries = 50
            preferences = [0, 2, 1, 0]
        "#;
        let config = parse_config(contents, ConfigFormat::Toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.simulation.network.size, 4);
        assert_eq!(config.simulation.curator.epsilon, 100.0);
        assert_eq!(
            config.simulation.links,
            LinkGeneration::Random {
                density: 0.25,
                skew_power: 2.0
            }
        );
        assert_eq!(config.experiment.queries, 50);
        assert_eq!(config.experiment.top, 10);
    }

    #[test]
    fn parses_yaml_config() {
        let contents = r#"
            simulation:
              seed: 3
              network:
                size: 2
                interactivity: 1
              curator:
                epsilon: 0.5
              links:
                mode: all
        "#;
        let config = parse_config(contents, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.simulation.links, LinkGeneration::All);
        assert_eq!(config.simulation.curator.epsilon, 0.5);
    }

    #[test]
    fn loads_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "simulation:\n  seed: 5").unwrap();
        let config = load_config(file.path(), ConfigFormat::Auto).unwrap();
        assert_eq!(config.simulation.seed, 5);
    }

    #[test]
    fn reports_missing_file() {
        let err = load_config(Path::new("/nonexistent/navnet.toml"), ConfigFormat::Auto)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
