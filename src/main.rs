//! CLI Entry Point for the load-transient sequencer
//!
//! Runs the test sequence against the mock bench, or validates a
//! configuration file without touching any instrument.
//!
//! # Usage
//!
//! Run a test:
//! ```bash
//! load-transient run --config config/load_transient.toml
//! ```
//!
//! Validate configuration only:
//! ```bash
//! load-transient check --config config/load_transient.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use load_transient::config::{ConvergencePolicy, SequencerConfig, DEFAULT_CONFIG_PATH};
use load_transient::hardware::Bench;
use load_transient::{logging, Sequencer};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "load-transient")]
#[command(about = "Load-transient test sequencer for PSU, electronic load and thermal chamber", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the test sequence on the simulated bench
    Run {
        /// Configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Override the convergence policy
        #[arg(long, value_enum)]
        policy: Option<ConvergencePolicy>,
    },

    /// Validate a configuration file and print the effective settings
    Check {
        /// Configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, policy } => run(config, policy).await,
        Commands::Check { config } => check(config),
    }
}

async fn run(path: PathBuf, policy: Option<ConvergencePolicy>) -> Result<()> {
    let mut config = SequencerConfig::load_from(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    if let Some(policy) = policy {
        config.convergence.policy = policy;
    }
    config
        .convergence
        .validate()
        .with_context(|| format!("Invalid convergence settings in {}", path.display()))?;
    logging::init_from_config(&config)?;

    let mut sequencer = Sequencer::from_config(&config, Bench::mock());
    let summary = sequencer.run().await?;

    println!();
    print!("{summary}");
    println!("Test completed. Thank you!");
    Ok(())
}

fn check(path: PathBuf) -> Result<()> {
    let config = SequencerConfig::load_from(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    println!("{}", config.to_toml()?);
    println!("Configuration OK");
    Ok(())
}
