//! Bench instrument layer.
//!
//! - [`capabilities`]: the traits the sequencer drives
//! - [`scpi`]: command grammar of the electronic load
//! - [`eload`]: the electronic load protocol engine
//! - [`mock`]: simulated instruments

pub mod capabilities;
pub mod eload;
pub mod mock;
pub mod scpi;

pub use capabilities::{ElectronicLoad, PowerSupply, ThermalChamber};
pub use eload::LoadProtocolEngine;
pub use scpi::{format_value, Quantity, ScpiCommand};

use std::sync::Arc;

/// Shared handles to the three instruments of a load-transient bench.
///
/// The sequencer configures these instruments but does not own them beyond
/// the lifetime of a run.
#[derive(Clone)]
pub struct Bench {
    /// Electronic load under protocol control.
    pub eload: Arc<dyn ElectronicLoad>,
    /// Supply feeding the device under test.
    pub psu: Arc<dyn PowerSupply>,
    /// Ambient temperature chamber.
    pub chamber: Arc<dyn ThermalChamber>,
}

impl Bench {
    /// Group three instrument handles.
    pub fn new(
        eload: Arc<dyn ElectronicLoad>,
        psu: Arc<dyn PowerSupply>,
        chamber: Arc<dyn ThermalChamber>,
    ) -> Self {
        Self {
            eload,
            psu,
            chamber,
        }
    }

    /// A bench made of ideal mock instruments.
    pub fn mock() -> Self {
        Self::new(
            Arc::new(mock::MockElectronicLoad::new()),
            Arc::new(mock::MockPowerSupply::new()),
            Arc::new(mock::MockThermalChamber::new()),
        )
    }
}
