//! Test parameter set for one load-transient run.
//!
//! The parameters are fixed for the lifetime of a run. The sequencer checks
//! each bound right before the instrument command that consumes the value;
//! [`TestParameters::validate`] runs every check up front so a bad
//! configuration file is rejected before any instrument is touched.

use serde::{Deserialize, Serialize};

use crate::error::{AppResult, DaqError};
use crate::validation::{
    check_final_current, check_initial_current, check_stabilization_timeout, check_temperature,
};

/// Parameters of a load-transient test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestParameters {
    /// Numeric test identifier.
    pub id: u32,
    /// Human-readable test name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Ambient temperatures to characterize, in order (°C).
    pub temperatures_c: Vec<f64>,
    /// Load current applied at each temperature step (A).
    pub initial_current_a: f64,
    /// Upper end of the load current ramp (A).
    pub final_current_a: f64,
    /// Voltage programmed on the supply and the load (V).
    pub target_voltage_v: f64,
    /// Maximum time to wait for the chamber to reach a setpoint (s).
    pub stabilization_timeout_s: f64,
    /// Accepted difference between chamber reading and setpoint (°C).
    pub temperature_tolerance_c: f64,
}

impl Default for TestParameters {
    /// The reference bench values.
    ///
    /// The temperature list includes -10 °C and 85 °C, both outside the valid
    /// chamber range, so a run with these defaults stops at the first `START`.
    fn default() -> Self {
        Self {
            id: 1000,
            name: "Load Transient".to_string(),
            description: "None".to_string(),
            temperatures_c: vec![-10.0, 25.0, 85.0],
            initial_current_a: 3.0,
            final_current_a: 6.0,
            target_voltage_v: 20.0,
            stabilization_timeout_s: 40.0 * 60.0,
            temperature_tolerance_c: 0.0,
        }
    }
}

impl TestParameters {
    /// Default parameters with a different temperature list.
    pub fn with_temperatures(temperatures_c: Vec<f64>) -> Self {
        Self {
            temperatures_c,
            ..Self::default()
        }
    }

    /// Check the scalar bounds used at every `START`.
    ///
    /// Order matches the sequencer: stabilization timeout, initial current,
    /// final current.
    pub fn validate_bounds(&self) -> AppResult<()> {
        check_stabilization_timeout(self.stabilization_timeout_s)?;
        check_initial_current(self.initial_current_a)?;
        check_final_current(self.final_current_a)?;
        Ok(())
    }

    /// Check every parameter, including all temperatures.
    pub fn validate(&self) -> AppResult<()> {
        if self.temperatures_c.is_empty() {
            return Err(DaqError::Configuration(
                "temperature list must not be empty".to_string(),
            ));
        }
        for &temperature in &self.temperatures_c {
            check_temperature(temperature)?;
        }
        self.validate_bounds()?;
        if !self.target_voltage_v.is_finite() {
            return Err(DaqError::Configuration(format!(
                "target voltage must be finite, got {}",
                self.target_voltage_v
            )));
        }
        if !(self.temperature_tolerance_c >= 0.0 && self.temperature_tolerance_c.is_finite()) {
            return Err(DaqError::Configuration(format!(
                "temperature tolerance must be a non-negative number, got {}",
                self.temperature_tolerance_c
            )));
        }
        Ok(())
    }
}
