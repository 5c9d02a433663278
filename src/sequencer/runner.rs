//! Orchestration loop.
//!
//! Presets the load and supply on a fresh session, then runs one FSM step,
//! sleeps the configured step interval, and repeats until the session's stop
//! flag is set. The first error aborts the loop; the load
//! and supply are returned to zero output before the error is handed back.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::time::sleep;
use tracing::{error, info};
use uuid::Uuid;

use super::session::MeasurementRecord;
use super::Sequencer;
use crate::error::AppResult;
use crate::hardware::format_value;

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Run identifier
    pub run_id: Uuid,
    /// Test identifier from the parameters
    pub test_id: u32,
    /// Test name from the parameters
    pub test_name: String,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// End of the run
    pub finished_at: DateTime<Utc>,
    /// Number of FSM steps executed
    pub steps_executed: u64,
    /// All measurements taken
    pub measurements: Vec<MeasurementRecord>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} (#{}) run {}: {} steps in {} ms",
            self.test_name,
            self.test_id,
            self.run_id,
            self.steps_executed,
            (self.finished_at - self.started_at).num_milliseconds()
        )?;
        for record in &self.measurements {
            writeln!(
                f,
                "  {} °C: {} A x {} V = {} W{}",
                format_value(record.temperature_c),
                format_value(record.load_current_a),
                format_value(record.load_voltage_v),
                format_value(record.output_power_w),
                if record.power_converged {
                    ""
                } else {
                    " (below target)"
                }
            )?;
        }
        Ok(())
    }
}

impl Sequencer {
    /// Drive the test to completion.
    pub async fn run(&mut self) -> AppResult<RunSummary> {
        info!(
            run_id = %self.session().run_id(),
            test = %self.session().params().name,
            temperatures = ?self.session().params().temperatures_c,
            "Starting test"
        );

        if let Err(e) = self.drive().await {
            error!(state = %self.state(), error = %e, "Test aborted");
            self.safe_state().await;
            return Err(e);
        }

        Ok(self.summary())
    }

    async fn drive(&mut self) -> AppResult<()> {
        if self.session().steps_executed() == 0 {
            self.prepare().await?;
        }
        while !self.is_finished() {
            self.step().await?;
            sleep(self.timing.step_interval).await;
        }
        Ok(())
    }

    /// Snapshot of the session as a summary.
    pub fn summary(&self) -> RunSummary {
        let session = self.session();
        RunSummary {
            run_id: session.run_id(),
            test_id: session.params().id,
            test_name: session.params().name.clone(),
            started_at: session.started_at(),
            finished_at: Utc::now(),
            steps_executed: session.steps_executed(),
            measurements: session.measurements().to_vec(),
        }
    }
}
