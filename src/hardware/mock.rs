//! Mock Hardware Implementations
//!
//! Provides simulated bench instruments for running a test sequence without
//! physical hardware. All mocks are async-safe (tokio locks, no blocking).
//!
//! # Available Mocks
//!
//! - `MockElectronicLoad` - protocol engine plus a log of every accepted command
//! - `MockPowerSupply` - settable voltage, fixed 1.0 A current limit
//! - `MockThermalChamber` - instant, ramping or stuck temperature response

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

use crate::error::AppResult;
use crate::hardware::capabilities::{ElectronicLoad, PowerSupply, ThermalChamber};
use crate::hardware::eload::LoadProtocolEngine;

// =============================================================================
// MockElectronicLoad - Simulated Electronic Load
// =============================================================================

/// Mock electronic load backed by [`LoadProtocolEngine`]
///
/// Measurements equal the programmed values, so `MEAS:CURR?` and `CURR?`
/// always agree.
///
/// # Example
///
/// ```rust,ignore
/// let eload = MockElectronicLoad::new();
/// eload.write("VOLT 20.0").await?;
/// assert_eq!(eload.query("VOLT?").await?, "20.0");
/// ```
#[derive(Default)]
pub struct MockElectronicLoad {
    engine: Mutex<LoadProtocolEngine>,
    command_log: Mutex<Vec<String>>,
}

impl MockElectronicLoad {
    /// Create a new mock load at 0 V, 0 A.
    pub fn new() -> Self {
        Self::default()
    }

    /// Programmed voltage in V.
    pub async fn programmed_voltage(&self) -> f64 {
        self.engine.lock().await.voltage()
    }

    /// Programmed current in A.
    pub async fn programmed_current(&self) -> f64 {
        self.engine.lock().await.current()
    }

    /// Every command accepted by `write` or `query`, in order.
    pub async fn commands(&self) -> Vec<String> {
        self.command_log.lock().await.clone()
    }
}

#[async_trait]
impl ElectronicLoad for MockElectronicLoad {
    async fn write(&self, command: &str) -> AppResult<()> {
        self.engine.lock().await.write(command)?;
        tracing::debug!(command, "MockElectronicLoad: write");
        self.command_log.lock().await.push(command.to_string());
        Ok(())
    }

    async fn read(&self) -> AppResult<String> {
        self.engine.lock().await.read()
    }

    async fn query(&self, command: &str) -> AppResult<String> {
        let response = self.engine.lock().await.query(command)?;
        tracing::debug!(command, %response, "MockElectronicLoad: query");
        self.command_log.lock().await.push(command.to_string());
        Ok(response)
    }
}

// =============================================================================
// MockPowerSupply - Simulated Current-Limited Supply
// =============================================================================

/// Mock power supply with a settable voltage and a fixed current limit
pub struct MockPowerSupply {
    voltage: RwLock<f64>,
    current_limit: f64,
}

impl MockPowerSupply {
    /// Create a supply at 0 V with a 1.0 A limit.
    pub fn new() -> Self {
        Self::with_current_limit(1.0)
    }

    /// Create a supply at 0 V with a custom current limit.
    ///
    /// # Arguments
    /// * `amps` - Fixed output current in A
    pub fn with_current_limit(amps: f64) -> Self {
        Self {
            voltage: RwLock::new(0.0),
            current_limit: amps,
        }
    }
}

impl Default for MockPowerSupply {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PowerSupply for MockPowerSupply {
    async fn set_voltage(&self, volts: f64) -> AppResult<()> {
        tracing::debug!(volts, "MockPowerSupply: set voltage");
        *self.voltage.write().await = volts;
        Ok(())
    }

    async fn voltage(&self) -> AppResult<f64> {
        Ok(*self.voltage.read().await)
    }

    async fn current(&self) -> AppResult<f64> {
        Ok(self.current_limit)
    }
}

// =============================================================================
// MockThermalChamber - Simulated Thermal Chamber
// =============================================================================

/// How the mock chamber's reading follows its setpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChamberResponse {
    /// Reading jumps to the setpoint immediately.
    Instant,
    /// Reading moves toward the setpoint by at most `step_c` per read.
    Ramp {
        /// Maximum change per `temperature()` call in °C.
        step_c: f64,
    },
    /// Reading never changes.
    Stuck,
}

/// Mock thermal chamber
///
/// Starts at 25 °C. The `Ramp` response approximates a real chamber that
/// needs several polls to settle; `Stuck` models a chamber that never reaches
/// its setpoint.
pub struct MockThermalChamber {
    reading: RwLock<f64>,
    setpoint: RwLock<f64>,
    response: ChamberResponse,
    set_count: AtomicU64,
}

impl MockThermalChamber {
    /// Ambient start temperature of the mock in °C.
    pub const AMBIENT_C: f64 = 25.0;

    /// Create an ideal chamber that settles instantly.
    pub fn new() -> Self {
        Self::with_response(ChamberResponse::Instant)
    }

    /// Create a chamber with the given response model.
    pub fn with_response(response: ChamberResponse) -> Self {
        Self {
            reading: RwLock::new(Self::AMBIENT_C),
            setpoint: RwLock::new(Self::AMBIENT_C),
            response,
            set_count: AtomicU64::new(0),
        }
    }

    /// Number of times a setpoint was commanded.
    pub fn set_count(&self) -> u64 {
        self.set_count.load(Ordering::SeqCst)
    }

    /// Last commanded setpoint in °C.
    pub async fn setpoint(&self) -> f64 {
        *self.setpoint.read().await
    }
}

impl Default for MockThermalChamber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThermalChamber for MockThermalChamber {
    async fn set_temperature(&self, celsius: f64) -> AppResult<()> {
        self.set_count.fetch_add(1, Ordering::SeqCst);
        *self.setpoint.write().await = celsius;
        if self.response == ChamberResponse::Instant {
            *self.reading.write().await = celsius;
        }
        tracing::debug!(celsius, "MockThermalChamber: setpoint");
        Ok(())
    }

    async fn temperature(&self) -> AppResult<f64> {
        let setpoint = *self.setpoint.read().await;
        let mut reading = self.reading.write().await;
        if let ChamberResponse::Ramp { step_c } = self.response {
            let delta = setpoint - *reading;
            if delta.abs() <= step_c {
                *reading = setpoint;
            } else {
                *reading += step_c.copysign(delta);
            }
        }
        Ok(*reading)
    }
}
