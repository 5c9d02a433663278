//! # Load Transient Sequencer
//!
//! Hardware-in-the-loop test sequencer that characterizes a load-transient
//! scenario across a list of ambient temperatures. A finite state machine
//! coordinates a power supply, a programmable electronic load and a thermal
//! chamber, and reports the measured output at each temperature.
//!
//! ## Crate Structure
//!
//! - **`config`**: Figment-based configuration (defaults, TOML file, environment).
//! - **`error`**: The `DaqError` enum shared by every layer.
//! - **`hardware`**: Capability traits, the electronic load command protocol and
//!   mock instruments.
//! - **`logging`**: `tracing-subscriber` setup.
//! - **`parameters`**: The test parameter set and its validation.
//! - **`sequencer`**: The FSM, its session state and the orchestration loop.
//! - **`validation`**: Range guards producing `ParameterOutOfRange` errors.

pub mod config;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod parameters;
pub mod sequencer;
pub mod validation;

pub use error::{AppResult, DaqError};
pub use parameters::TestParameters;
pub use sequencer::{Sequencer, TestState};
