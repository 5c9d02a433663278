//! Test states and the transition table.
//!
//! ```text
//! START ──> CONFIG_EQUITY ──> CONFIG_PSU ──> CONFIG_ELOAD ──> SHOW_OUTPUT
//!   ▲                                             ▲               │
//!   │                                             └── (retry) ────┤
//!   │                                                             ▼
//!   └──────────── (more temperatures) ──── VERIFY_TEMPERATURE_STEP
//!                                                   │
//!                                                   ▼
//!                                                  END
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DaqError;

/// Stage of a load-transient test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestState {
    /// Select and validate the temperature step, program the load voltage.
    Start,
    /// Command the chamber and wait for it to stabilize.
    ConfigEquity,
    /// Program the power supply.
    ConfigPsu,
    /// Program the load current.
    ConfigEload,
    /// Measure and report outputs.
    ShowOutput,
    /// Advance to the next temperature or finish.
    VerifyTemperatureStep,
    /// Zero all outputs and stop.
    End,
}

impl TestState {
    /// All states in sequence order.
    pub const ALL: [TestState; 7] = [
        TestState::Start,
        TestState::ConfigEquity,
        TestState::ConfigPsu,
        TestState::ConfigEload,
        TestState::ShowOutput,
        TestState::VerifyTemperatureStep,
        TestState::End,
    ];

    /// Tag used in logs and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestState::Start => "START",
            TestState::ConfigEquity => "CONFIG_EQUITY",
            TestState::ConfigPsu => "CONFIG_PSU",
            TestState::ConfigEload => "CONFIG_ELOAD",
            TestState::ShowOutput => "SHOW_OUTPUT",
            TestState::VerifyTemperatureStep => "VERIFY_TEMPERATURE_STEP",
            TestState::End => "END",
        }
    }

    /// States reachable in one step.
    pub fn successors(&self) -> &'static [TestState] {
        match self {
            TestState::Start => &[TestState::ConfigEquity],
            TestState::ConfigEquity => &[TestState::ConfigPsu],
            TestState::ConfigPsu => &[TestState::ConfigEload],
            TestState::ConfigEload => &[TestState::ShowOutput],
            TestState::ShowOutput => &[TestState::VerifyTemperatureStep, TestState::ConfigEload],
            TestState::VerifyTemperatureStep => &[TestState::Start, TestState::End],
            TestState::End => &[],
        }
    }

    /// Check if `next` is a legal successor.
    pub fn can_transition_to(&self, next: TestState) -> bool {
        self.successors().contains(&next)
    }

    /// Check if this is the terminal state.
    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestState {
    type Err = DaqError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        TestState::ALL
            .into_iter()
            .find(|state| state.as_str() == tag)
            .ok_or_else(|| DaqError::InvalidState(format!("unknown state tag '{tag}'")))
    }
}
