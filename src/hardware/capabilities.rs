//! Instrument Capabilities
//!
//! This module defines the capability traits the test sequencer drives. Each
//! instrument on the bench implements exactly one of them:
//!
//! - An electronic load implements: `ElectronicLoad` (text command protocol)
//! - A power supply implements: `PowerSupply` (typed voltage/current access)
//! - A thermal chamber implements: `ThermalChamber` (typed temperature access)
//!
//! The sequencer only ever sees `Arc<dyn Trait>` handles, so a VISA- or
//! serial-backed driver can replace the mocks in [`crate::hardware::mock`]
//! without touching the state machine.
//!
//! # Design Philosophy
//!
//! Each capability trait:
//! - Is async (uses #[async_trait])
//! - Is thread-safe (requires Send + Sync)
//! - Uses `AppResult` so protocol and range errors stay typed
//! - Takes `&self`; implementations use interior mutability
//!
//! # Example
//!
//! ```rust,ignore
//! async fn measured_power(load: &dyn ElectronicLoad) -> AppResult<f64> {
//!     load.write("CURR 3.0").await?;
//!     load.write("VOLT 20.0").await?;
//!     load.query_f64("MEAS:POW?").await
//! }
//! ```

use crate::error::AppResult;
use crate::hardware::scpi::parse_response;
use async_trait::async_trait;

/// Capability: Electronic Load command protocol
///
/// Devices that sink a programmed current and speak the SCPI-like vocabulary
/// documented in [`crate::hardware::scpi`].
///
/// # Contract
/// - `write` applies a set command or arms the response buffer for a query
/// - `read` drains the response buffer (`NoPendingResponse` when empty)
/// - `query` is `write` followed by `read` in one atomic call, for query
///   forms only
/// - Rejected commands leave the instrument unchanged
#[async_trait]
pub trait ElectronicLoad: Send + Sync {
    /// Send a command.
    ///
    /// # Returns
    /// - Ok(()) if the command was accepted
    /// - Err(UnrecognizedCommand | MalformedValue) otherwise
    async fn write(&self, command: &str) -> AppResult<()>;

    /// Read the pending query response.
    async fn read(&self) -> AppResult<String>;

    /// Send a query command and return its response.
    async fn query(&self, command: &str) -> AppResult<String>;

    /// Send a query command and parse the response as a number.
    async fn query_f64(&self, command: &str) -> AppResult<f64> {
        let response = self.query(command).await?;
        parse_response(command, &response)
    }
}

/// Capability: Current-limited power supply
///
/// # Contract
/// - Voltage is settable in V
/// - Current is fixed by the supply's limit and read-only
/// - Power is derived as voltage × current
#[async_trait]
pub trait PowerSupply: Send + Sync {
    /// Program the output voltage.
    async fn set_voltage(&self, volts: f64) -> AppResult<()>;

    /// Programmed output voltage in V.
    async fn voltage(&self) -> AppResult<f64>;

    /// Output current in A.
    async fn current(&self) -> AppResult<f64>;

    /// Output power in W.
    async fn power(&self) -> AppResult<f64> {
        Ok(self.voltage().await? * self.current().await?)
    }
}

/// Capability: Thermal chamber
///
/// # Contract
/// - `set_temperature` commands a new setpoint and returns immediately
/// - `temperature` reports the current chamber reading, which may lag the
///   setpoint; callers poll until it converges
#[async_trait]
pub trait ThermalChamber: Send + Sync {
    /// Command a new setpoint in °C.
    async fn set_temperature(&self, celsius: f64) -> AppResult<()>;

    /// Current chamber reading in °C.
    async fn temperature(&self) -> AppResult<f64>;
}
