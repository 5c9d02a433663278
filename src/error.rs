//! Custom error types for the sequencer.
//!
//! This module defines the primary error type, `DaqError`, shared by the
//! protocol engine, the instrument capability traits and the test sequencer.
//! Using the `thiserror` crate, it provides a centralized and consistent way
//! to surface everything that can abort a test run.
//!
//! ## Error Hierarchy
//!
//! - **`ParameterOutOfRange`**: A test parameter (temperature, current or timing)
//!   violated its declared bound. Raised before the instrument command that
//!   would have used the value.
//! - **`UnrecognizedCommand`** / **`MalformedValue`**: The electronic-load command
//!   protocol rejected a command string, atomically and without side effects.
//! - **`NoPendingResponse`**: `read` was called with an empty response buffer.
//! - **`InvalidState`**: The FSM was asked to do something its transition table
//!   does not allow, or a state tag failed to parse.
//! - **`StabilizationTimeout`**: The thermal chamber did not report its setpoint
//!   within the validated stabilization time.
//! - **`ConvergenceNotReached`**: Under the `require` convergence policy the load
//!   current ramp was exhausted without reaching the target output power.
//! - **`Config`** / **`Configuration`**: Loading or semantic validation of the
//!   configuration failed.
//!
//! None of these are recovered locally. Every variant aborts the run.

use std::fmt;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// Which side of an inclusive range a value fell outside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Value was below the minimum.
    Lower,
    /// Value was above the maximum.
    Upper,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Lower => write!(f, "lower"),
            Bound::Upper => write!(f, "upper"),
        }
    }
}

/// Everything that can abort a test run.
#[derive(Error, Debug)]
pub enum DaqError {
    /// A parameter violated its inclusive range.
    #[error("{parameter} out of range: {value} violates {bound} bound of [{min}, {max}]")]
    ParameterOutOfRange {
        /// Parameter name
        parameter: &'static str,
        /// Offending value
        value: f64,
        /// Range minimum
        min: f64,
        /// Range maximum
        max: f64,
        /// Side that was crossed
        bound: Bound,
    },

    /// The load does not know the command header.
    #[error("Not recognized command: '{0}'")]
    UnrecognizedCommand(String),

    /// A known command carried a bad payload.
    #[error("Malformed value '{payload}' in command '{command}'")]
    MalformedValue {
        /// Full command string
        command: String,
        /// Rejected payload
        payload: String,
    },

    /// `read` found the response buffer empty.
    #[error("No pending response to read")]
    NoPendingResponse,

    /// A transition or state tag the FSM does not allow.
    #[error("Invalid state in FSM: {0}")]
    InvalidState(String),

    /// The chamber never reported its setpoint.
    #[error(
        "Chamber did not stabilize at {target} °C within {timeout_s} s (last reading {last} °C)"
    )]
    StabilizationTimeout {
        /// Setpoint in °C
        target: f64,
        /// Last reading in °C
        last: f64,
        /// Timeout in s
        timeout_s: f64,
    },

    /// The current ramp ended below the target output power.
    #[error(
        "Output power {power_w} W did not reach target {target} at the final current of {current_a} A"
    )]
    ConvergenceNotReached {
        /// Last measured power in W
        power_w: f64,
        /// Convergence target
        target: f64,
        /// Load current at the last measurement in A
        current_a: f64,
    },

    /// Loading the layered configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// A configuration value is semantically invalid.
    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

impl DaqError {
    /// Name of the offending parameter for range violations.
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            DaqError::ParameterOutOfRange { parameter, .. } => Some(*parameter),
            _ => None,
        }
    }
}
