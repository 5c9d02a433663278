//! SCPI-like command grammar for the electronic load.
//!
//! Commands follow `<KEYWORD>[:<SUBKEYWORD>] [<numeric-value>]`, with a trailing
//! `?` on the header marking a query. The supported vocabulary is:
//!
//! | Command          | Meaning                           |
//! |------------------|-----------------------------------|
//! | `CURR <value>`   | set load current (A)              |
//! | `VOLT <value>`   | set load voltage (V)              |
//! | `CURR?`          | programmed current                |
//! | `MEAS:CURR?`     | measured current                  |
//! | `VOLT?`          | programmed voltage                |
//! | `MEAS:VOLT?`     | measured voltage                  |
//! | `MEAS:POW?`      | measured power (current × voltage)|
//!
//! Headers are matched exactly (upper case, long forms are not accepted).

use crate::error::{AppResult, DaqError};

/// Quantity reported by a query command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Load current in A.
    Current,
    /// Load voltage in V.
    Voltage,
    /// Derived power in W.
    Power,
}

/// A parsed electronic-load command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScpiCommand {
    /// `CURR <value>`
    SetCurrent(f64),
    /// `VOLT <value>`
    SetVoltage(f64),
    /// Any of the query forms.
    Query(Quantity),
}

impl ScpiCommand {
    /// Parse a command string.
    ///
    /// Surrounding whitespace (including line terminators) is ignored.
    ///
    /// # Errors
    ///
    /// - `UnrecognizedCommand` if the header is not part of the vocabulary
    /// - `MalformedValue` if a set command has a missing, non-numeric or
    ///   non-finite payload, or a query carries a payload
    pub fn parse(command: &str) -> AppResult<Self> {
        let trimmed = command.trim();
        let (header, payload) = match trimmed.split_once(char::is_whitespace) {
            Some((header, rest)) => (header, Some(rest.trim())),
            None => (trimmed, None),
        };

        if let Some(query_header) = header.strip_suffix('?') {
            let quantity = match query_header {
                "CURR" | "MEAS:CURR" => Quantity::Current,
                "VOLT" | "MEAS:VOLT" => Quantity::Voltage,
                "MEAS:POW" => Quantity::Power,
                _ => return Err(DaqError::UnrecognizedCommand(command.to_string())),
            };
            if let Some(payload) = payload {
                return Err(DaqError::MalformedValue {
                    command: command.to_string(),
                    payload: payload.to_string(),
                });
            }
            return Ok(ScpiCommand::Query(quantity));
        }

        let setter: fn(f64) -> ScpiCommand = match header {
            "CURR" => ScpiCommand::SetCurrent,
            "VOLT" => ScpiCommand::SetVoltage,
            _ => return Err(DaqError::UnrecognizedCommand(command.to_string())),
        };
        let value = parse_value(command, payload.unwrap_or(""))?;
        Ok(setter(value))
    }
}

/// Parse a numeric payload.
fn parse_value(command: &str, payload: &str) -> AppResult<f64> {
    let malformed = || DaqError::MalformedValue {
        command: command.to_string(),
        payload: payload.to_string(),
    };
    if payload.is_empty() || payload.contains(char::is_whitespace) {
        return Err(malformed());
    }
    let value = payload.parse::<f64>().map_err(|_| malformed())?;
    if !value.is_finite() {
        return Err(malformed());
    }
    Ok(value)
}

/// Render a value the way the instrument reports it.
///
/// Integral values keep a trailing `.0` (`20.0`, `60.0`) and every output
/// parses back to the same `f64`.
pub fn format_value(value: f64) -> String {
    format!("{value:?}")
}

/// Parse a response string produced by [`format_value`].
pub fn parse_response(command: &str, response: &str) -> AppResult<f64> {
    response
        .trim()
        .parse::<f64>()
        .map_err(|_| DaqError::MalformedValue {
            command: command.to_string(),
            payload: response.to_string(),
        })
}
