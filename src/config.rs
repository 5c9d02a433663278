//! Sequencer configuration using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults (the reference bench values)
//! 2. A TOML file (`config/load_transient.toml` by default)
//! 3. Environment variables prefixed with `LOAD_TRANSIENT_`, nested keys
//!    separated by `__`
//!
//! # Example
//! ```no_run
//! use load_transient::config::SequencerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SequencerConfig::load()?;
//! config.validate()?;
//! println!("Test: {}", config.test.name);
//! # Ok(())
//! # }
//! ```
//!
//! Environment override example:
//! `LOAD_TRANSIENT_TEST__INITIAL_CURRENT_A=2.5`

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{AppResult, DaqError};
use crate::parameters::TestParameters;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/load_transient.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "LOAD_TRANSIENT_";

/// Top-level sequencer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Test parameter set
    pub test: TestParameters,
    /// Loop and settle timing
    pub timing: TimingConfig,
    /// Handling of the output power convergence check
    pub convergence: ConvergenceConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Timing of the orchestration loop and instrument settling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay between FSM steps
    #[serde(with = "humantime_serde")]
    pub step_interval: Duration,
    /// Wait after programming the supply or the load
    #[serde(with = "humantime_serde")]
    pub settle_interval: Duration,
    /// Granularity of the chamber stabilization poll
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            step_interval: Duration::from_millis(100),
            settle_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl TimingConfig {
    /// No waits at all. Intended for simulation and tests.
    pub fn immediate() -> Self {
        Self {
            step_interval: Duration::ZERO,
            settle_interval: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}

/// What `SHOW_OUTPUT` does with the power convergence check.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ConvergencePolicy {
    /// Record the check and always move on to the next temperature step.
    #[default]
    Advance,
    /// Repeat `CONFIG_ELOAD` with a higher current until output power reaches
    /// the target, failing once the final current is exhausted.
    Require,
}

/// Convergence check settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Policy applied after each measurement pass
    pub policy: ConvergencePolicy,
    /// Current increment per retry under the `require` policy (A)
    pub current_step_a: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            policy: ConvergencePolicy::Advance,
            current_step_a: 1.0,
        }
    }
}

impl ConvergenceConfig {
    /// Check that the ramp step can make progress.
    pub fn validate(&self) -> AppResult<()> {
        let step = self.current_step_a;
        if !(step > 0.0 && step.is_finite()) {
            return Err(DaqError::Configuration(format!(
                "Invalid current_step_a {}. Must be a positive number",
                step
            )));
        }
        Ok(())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored output for interactive use
    #[default]
    Pretty,
    /// Single-line output without colors
    Compact,
    /// JSON lines for log aggregation
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl SequencerConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment variables
    /// still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        self.convergence.validate()?;
        self.test.validate()
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self).map_err(|e| DaqError::Configuration(e.to_string()))
    }
}
