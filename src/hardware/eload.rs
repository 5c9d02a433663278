//! Electronic load protocol engine.
//!
//! A stateful interpreter for the command vocabulary in [`crate::hardware::scpi`].
//! It holds the programmed voltage and current and a single-slot response
//! buffer that query commands arm and `read` drains.
//!
//! # Contract
//! - `write` either applies a set command, arms the buffer for a query, or
//!   fails without touching any state
//! - the buffer holds at most one value; a newer query replaces an unread one
//! - `read` returns and clears the buffered value, or fails with
//!   `NoPendingResponse` when nothing is armed
//! - `query` returns exactly what `write` + `read` would for the same query
//!   command, without disturbing a value already waiting in the buffer

use crate::error::{AppResult, DaqError};
use crate::hardware::scpi::{format_value, Quantity, ScpiCommand};

/// Protocol state of a single electronic load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadProtocolEngine {
    voltage: f64,
    current: f64,
    pending: Option<f64>,
}

impl LoadProtocolEngine {
    /// Create an engine with zero voltage, zero current and an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Programmed voltage in V.
    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    /// Programmed current in A.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Derived power in W.
    pub fn power(&self) -> f64 {
        self.current * self.voltage
    }

    /// Whether a query response is waiting to be read.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Execute a set or query command.
    pub fn write(&mut self, command: &str) -> AppResult<()> {
        match ScpiCommand::parse(command)? {
            ScpiCommand::SetCurrent(value) => self.current = value,
            ScpiCommand::SetVoltage(value) => self.voltage = value,
            ScpiCommand::Query(quantity) => self.pending = Some(self.value_of(quantity)),
        }
        Ok(())
    }

    /// Take the buffered response.
    pub fn read(&mut self) -> AppResult<String> {
        self.pending
            .take()
            .map(format_value)
            .ok_or(DaqError::NoPendingResponse)
    }

    /// Evaluate a query command in one step.
    ///
    /// Set commands are not query forms and are rejected as unrecognized.
    pub fn query(&self, command: &str) -> AppResult<String> {
        match ScpiCommand::parse(command)? {
            ScpiCommand::Query(quantity) => Ok(format_value(self.value_of(quantity))),
            ScpiCommand::SetCurrent(_) | ScpiCommand::SetVoltage(_) => {
                Err(DaqError::UnrecognizedCommand(command.to_string()))
            }
        }
    }

    fn value_of(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Current => self.current,
            Quantity::Voltage => self.voltage,
            Quantity::Power => self.power(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERIES: [&str; 5] = ["CURR?", "MEAS:CURR?", "VOLT?", "MEAS:VOLT?", "MEAS:POW?"];

    #[test]
    fn set_then_query_voltage() {
        let mut eload = LoadProtocolEngine::new();
        eload.write("VOLT 20.0").unwrap();
        assert_eq!(eload.query("VOLT?").unwrap(), "20.0");
    }

    #[test]
    fn power_is_current_times_voltage() {
        let mut eload = LoadProtocolEngine::new();
        eload.write("CURR 3.0").unwrap();
        eload.write("VOLT 20.0").unwrap();
        assert_eq!(eload.query("MEAS:POW?").unwrap(), "60.0");

        eload.write("CURR 0.3").unwrap();
        eload.write("VOLT 0.7").unwrap();
        assert_eq!(
            eload.query("MEAS:POW?").unwrap(),
            format_value(0.3 * 0.7)
        );
    }

    #[test]
    fn write_read_matches_query() {
        let mut eload = LoadProtocolEngine::new();
        eload.write("CURR 2.5").unwrap();
        eload.write("VOLT 12.25").unwrap();

        for cmd in QUERIES {
            eload.write(cmd).unwrap();
            let buffered = eload.read().unwrap();
            assert_eq!(buffered, eload.query(cmd).unwrap(), "mismatch for {}", cmd);
        }
    }

    #[test]
    fn read_drains_the_buffer() {
        let mut eload = LoadProtocolEngine::new();
        eload.write("CURR?").unwrap();
        assert!(eload.has_pending());
        assert_eq!(eload.read().unwrap(), "0.0");
        assert!(!eload.has_pending());
        assert!(matches!(eload.read(), Err(DaqError::NoPendingResponse)));
    }

    #[test]
    fn read_without_query_fails() {
        let mut eload = LoadProtocolEngine::new();
        eload.write("VOLT 5").unwrap();
        assert!(matches!(eload.read(), Err(DaqError::NoPendingResponse)));
    }

    #[test]
    fn newer_query_replaces_unread_response() {
        let mut eload = LoadProtocolEngine::new();
        eload.write("CURR 1.5").unwrap();
        eload.write("VOLT 4.0").unwrap();
        eload.write("CURR?").unwrap();
        eload.write("VOLT?").unwrap();
        assert_eq!(eload.read().unwrap(), "4.0");
        assert!(!eload.has_pending());
    }

    #[test]
    fn query_leaves_pending_response_alone() {
        let mut eload = LoadProtocolEngine::new();
        eload.write("CURR 1.0").unwrap();
        eload.write("CURR?").unwrap();
        assert_eq!(eload.query("MEAS:POW?").unwrap(), "0.0");
        assert_eq!(eload.read().unwrap(), "1.0");
    }

    #[test]
    fn rejected_commands_do_not_mutate() {
        let mut eload = LoadProtocolEngine::new();
        eload.write("CURR 2.0").unwrap();
        eload.write("VOLT 10.0").unwrap();
        let before = eload.clone();

        assert!(matches!(
            eload.write("CURR abc"),
            Err(DaqError::MalformedValue { .. })
        ));
        assert!(matches!(
            eload.write("POW 3"),
            Err(DaqError::UnrecognizedCommand(_))
        ));
        assert!(matches!(
            eload.query("FOO?"),
            Err(DaqError::UnrecognizedCommand(_))
        ));
        assert_eq!(eload, before);
    }

    #[test]
    fn query_rejects_set_commands() {
        let eload = LoadProtocolEngine::new();
        assert!(matches!(
            eload.query("VOLT 20.0"),
            Err(DaqError::UnrecognizedCommand(_))
        ));
    }
}
