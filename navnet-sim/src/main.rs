use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use navnet_curator::{ProgressObserver, TracingProgress};
use navnet_sim::config::{load_config, Config, ConfigFormat};
use navnet_sim::progress::TerminalProgress;
use navnet_sim::service::SimulationService;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(
    name = "navnet-sim",
    version,
    about = "Runs privacy-preserving navigation experiments against a curated network"
)]
struct Cli {
    /// Path to configuration file (TOML or YAML). Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Explicit configuration format override.
    #[arg(long, value_enum, default_value_t = ConfigFormat::Auto)]
    config_format: ConfigFormat,
    /// Override the root seed from the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Override the privacy budget from the configuration.
    #[arg(long)]
    epsilon: Option<f64>,
    /// Draw a progress bar on stderr while enumerating sequences.
    #[arg(long)]
    progress: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sample navigation sequences through the curator.
    Query {
        #[arg(long)]
        count: Option<usize>,
    },
    /// Exact private distribution, most likely sequences first.
    Distribution,
    /// Link utilities and sequence probabilities of the network.
    Report,
    /// Empirical query frequencies against the exact private distribution.
    Convergence,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => load_config(path, cli.config_format)?,
        None => Config::default(),
    };
    if let Some(seed) = cli.seed {
        config.simulation.seed = seed;
    }
    if let Some(epsilon) = cli.epsilon {
        config.simulation.curator.epsilon = epsilon;
    }
    config.validate()?;

    let service = SimulationService::from_config(&config)?;
    let mut observer: Box<dyn ProgressObserver> = if cli.progress {
        Box::new(TerminalProgress::stderr(
            "Calculating every sequence probability",
        ))
    } else {
        Box::new(TracingProgress::default())
    };

    match cli.command {
        Command::Query { count } => {
            let count = count.unwrap_or(config.experiment.queries);
            emit(&service.run_queries(count)?)
        }
        Command::Distribution => emit(&service.distribution(observer.as_mut())?),
        Command::Report => emit(&service.network_report(observer.as_mut())?),
        Command::Convergence => emit(&service.convergence(observer.as_mut())?),
    }
}

fn emit<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
