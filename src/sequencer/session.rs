//! Mutable state of one test run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parameters::TestParameters;
use crate::sequencer::state::TestState;

/// One pass through `SHOW_OUTPUT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Chamber setpoint of the step (°C)
    pub temperature_c: f64,
    /// Load current reported by `MEAS:CURR?` (A)
    pub load_current_a: f64,
    /// Load voltage reported by `MEAS:VOLT?` (V)
    pub load_voltage_v: f64,
    /// Supply output current (A)
    pub psu_current_a: f64,
    /// Supply output voltage (V)
    pub psu_voltage_v: f64,
    /// Load power reported by `MEAS:POW?` (W)
    pub output_power_w: f64,
    /// Whether output power reached the target voltage criterion
    pub power_converged: bool,
    /// Time of measurement
    pub timestamp: DateTime<Utc>,
}

/// State of a test run, owned and mutated by the sequencer.
#[derive(Debug, Clone)]
pub struct TestSession {
    pub(crate) run_id: Uuid,
    pub(crate) params: TestParameters,
    pub(crate) state: TestState,
    pub(crate) temperature_index: usize,
    pub(crate) current_temperature: Option<f64>,
    pub(crate) actual_current: f64,
    pub(crate) output_power: Option<f64>,
    pub(crate) stop: bool,
    pub(crate) steps_executed: u64,
    pub(crate) measurements: Vec<MeasurementRecord>,
    pub(crate) started_at: DateTime<Utc>,
}

impl TestSession {
    /// Create a session at `START` with the first temperature step pending.
    ///
    /// Parameters are not validated here; each bound is checked by the
    /// sequencer before the instrument command that depends on it.
    pub fn new(params: TestParameters) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            actual_current: params.initial_current_a,
            params,
            state: TestState::Start,
            temperature_index: 0,
            current_temperature: None,
            output_power: None,
            stop: false,
            steps_executed: 0,
            measurements: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Unique identifier of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Parameters the run was created with.
    pub fn params(&self) -> &TestParameters {
        &self.params
    }

    /// Current FSM state.
    pub fn state(&self) -> TestState {
        self.state
    }

    /// Index into the temperature list.
    pub fn temperature_index(&self) -> usize {
        self.temperature_index
    }

    /// Temperature selected for the current step, once `START` has run.
    pub fn current_temperature(&self) -> Option<f64> {
        self.current_temperature
    }

    /// Current programmed into the load on the next `CONFIG_ELOAD`.
    pub fn actual_current(&self) -> f64 {
        self.actual_current
    }

    /// Last measured output power.
    pub fn output_power(&self) -> Option<f64> {
        self.output_power
    }

    /// Whether `END` has run.
    pub fn is_stopped(&self) -> bool {
        self.stop
    }

    /// Number of FSM steps executed so far.
    pub fn steps_executed(&self) -> u64 {
        self.steps_executed
    }

    /// Measurements in the order they were taken.
    pub fn measurements(&self) -> &[MeasurementRecord] {
        &self.measurements
    }

    /// Start time of the run.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_at_start() {
        let session = TestSession::new(TestParameters::with_temperatures(vec![25.0]));
        assert_eq!(session.state(), TestState::Start);
        assert_eq!(session.temperature_index(), 0);
        assert_eq!(session.current_temperature(), None);
        assert_eq!(session.actual_current(), 3.0);
        assert!(!session.is_stopped());
        assert!(session.measurements().is_empty());
    }

    #[test]
    fn construction_does_not_validate() {
        let session = TestSession::new(TestParameters::default());
        assert_eq!(session.params().temperatures_c[0], -10.0);
    }
}
