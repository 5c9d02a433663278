//! Sequencer - State machine for the load-transient test
//!
//! The sequencer owns a [`TestSession`] and drives the three bench instruments
//! through the states in [`TestState`]. Each call to [`Sequencer::step`] runs
//! exactly one state handler, which returns the next state; the transition is
//! checked against the table in [`state`] before it is committed.
//!
//! # Per-state behavior
//!
//! | State                     | Action                                              |
//! |---------------------------|-----------------------------------------------------|
//! | `START`                   | validate temperature and bounds, `VOLT <target>`    |
//! | `CONFIG_EQUITY`           | command chamber, wait for it within the timeout     |
//! | `CONFIG_PSU`              | program supply voltage, settle                      |
//! | `CONFIG_ELOAD`            | `CURR <actual>`, settle                             |
//! | `SHOW_OUTPUT`             | measure, print, apply convergence policy            |
//! | `VERIFY_TEMPERATURE_STEP` | next temperature or finish                          |
//! | `END`                     | zero load and supply, set stop flag                 |
//!
//! # Usage
//!
//! ```rust,ignore
//! let params = TestParameters::with_temperatures(vec![25.0]);
//! let mut sequencer = Sequencer::new(params, Bench::mock())
//!     .with_timing(TimingConfig::immediate());
//! let summary = sequencer.run().await?;
//! assert_eq!(sequencer.state(), TestState::End);
//! ```

pub mod runner;
pub mod session;
pub mod state;

pub use runner::RunSummary;
pub use session::{MeasurementRecord, TestSession};
pub use state::TestState;

use chrono::Utc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

use crate::config::{ConvergenceConfig, ConvergencePolicy, SequencerConfig, TimingConfig};
use crate::error::{AppResult, DaqError};
use crate::hardware::{format_value, Bench};
use crate::parameters::TestParameters;
use crate::validation::check_temperature;

/// Drives one load-transient test run.
pub struct Sequencer {
    session: TestSession,
    bench: Bench,
    timing: TimingConfig,
    convergence: ConvergenceConfig,
}

impl Sequencer {
    /// Create a sequencer with default timing and the `advance` policy.
    pub fn new(params: TestParameters, bench: Bench) -> Self {
        Self {
            session: TestSession::new(params),
            bench,
            timing: TimingConfig::default(),
            convergence: ConvergenceConfig::default(),
        }
    }

    /// Create a sequencer from a loaded configuration.
    pub fn from_config(config: &SequencerConfig, bench: Bench) -> Self {
        Self::new(config.test.clone(), bench)
            .with_timing(config.timing.clone())
            .with_convergence(config.convergence.clone())
    }

    /// Override loop and settle timing.
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Override the convergence policy.
    pub fn with_convergence(mut self, convergence: ConvergenceConfig) -> Self {
        self.convergence = convergence;
        self
    }

    /// The session being driven.
    pub fn session(&self) -> &TestSession {
        &self.session
    }

    /// Current FSM state.
    pub fn state(&self) -> TestState {
        self.session.state
    }

    /// Whether `END` has completed.
    pub fn is_finished(&self) -> bool {
        self.session.stop
    }

    /// Put the load and supply into a known idle state before the first step.
    ///
    /// The chamber is left alone; it is first commanded in `CONFIG_EQUITY`.
    pub async fn prepare(&self) -> AppResult<()> {
        self.bench.eload.write("CURR 0").await?;
        self.bench.psu.set_voltage(0.0).await?;
        debug!("Load and supply preset to zero");
        Ok(())
    }

    /// Run the handler of the current state and commit the transition.
    ///
    /// # Errors
    ///
    /// Any handler error is returned unchanged and leaves the state where it
    /// was. Stepping a finished session fails with `InvalidState`.
    #[instrument(skip(self), fields(state = %self.session.state, run_id = %self.session.run_id))]
    pub async fn step(&mut self) -> AppResult<TestState> {
        if self.session.stop {
            return Err(DaqError::InvalidState(
                "test already finished, END has no outgoing transition".to_string(),
            ));
        }

        let current = self.session.state;
        let next = match current {
            TestState::Start => self.initialize_test().await?,
            TestState::ConfigEquity => self.configure_equity_chamber().await?,
            TestState::ConfigPsu => self.configure_power_supply().await?,
            TestState::ConfigEload => self.configure_electronic_load().await?,
            TestState::ShowOutput => self.display_output_measurements().await?,
            TestState::VerifyTemperatureStep => self.check_temperature_steps(),
            TestState::End => self.finish_test().await?,
        };

        if !current.is_terminal() && !current.can_transition_to(next) {
            return Err(DaqError::InvalidState(format!(
                "no transition from {current} to {next}"
            )));
        }

        self.session.steps_executed += 1;
        self.session.state = next;
        if next != current {
            debug!(from = %current, to = %next, "Transition");
        }
        Ok(next)
    }

    async fn initialize_test(&mut self) -> AppResult<TestState> {
        let index = self.session.temperature_index;
        let temperature = *self
            .session
            .params
            .temperatures_c
            .get(index)
            .ok_or_else(|| {
                DaqError::Configuration(format!("no temperature defined for step {index}"))
            })?;

        check_temperature(temperature)?;
        self.session.params.validate_bounds()?;
        self.session.current_temperature = Some(temperature);

        let target = self.session.params.target_voltage_v;
        self.bench
            .eload
            .write(&format!("VOLT {}", format_value(target)))
            .await?;

        info!(
            step = index + 1,
            of = self.session.params.temperatures_c.len(),
            temperature_c = temperature,
            "Temperature step initialized"
        );
        Ok(TestState::ConfigEquity)
    }

    async fn configure_equity_chamber(&mut self) -> AppResult<TestState> {
        self.session.actual_current = self.session.params.initial_current_a;

        let target = self.selected_temperature()?;
        self.bench.chamber.set_temperature(target).await?;
        self.wait_for_chamber(target).await?;

        Ok(TestState::ConfigPsu)
    }

    /// Poll the chamber until it reports `target` or the stabilization
    /// timeout elapses.
    async fn wait_for_chamber(&self, target: f64) -> AppResult<()> {
        let timeout_s = self.session.params.stabilization_timeout_s;
        let timeout = Duration::try_from_secs_f64(timeout_s).map_err(|e| {
            DaqError::Configuration(format!("invalid stabilization timeout {timeout_s}: {e}"))
        })?;
        let tolerance = self.session.params.temperature_tolerance_c;
        let started = Instant::now();

        loop {
            let reading = self.bench.chamber.temperature().await?;
            if (reading - target).abs() <= tolerance {
                info!(
                    temperature_c = reading,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Chamber stabilized"
                );
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(DaqError::StabilizationTimeout {
                    target,
                    last: reading,
                    timeout_s,
                });
            }
            debug!(reading_c = reading, target_c = target, "Waiting for chamber");
            sleep(self.timing.poll_interval).await;
        }
    }

    async fn configure_power_supply(&mut self) -> AppResult<TestState> {
        let volts = self.session.params.target_voltage_v;
        self.bench.psu.set_voltage(volts).await?;
        sleep(self.timing.settle_interval).await;
        Ok(TestState::ConfigEload)
    }

    async fn configure_electronic_load(&mut self) -> AppResult<TestState> {
        let amps = self.session.actual_current;
        self.bench
            .eload
            .write(&format!("CURR {}", format_value(amps)))
            .await?;
        sleep(self.timing.settle_interval).await;
        Ok(TestState::ShowOutput)
    }

    async fn display_output_measurements(&mut self) -> AppResult<TestState> {
        let eload = &self.bench.eload;
        let psu = &self.bench.psu;

        let load_current_a = eload.query_f64("MEAS:CURR?").await?;
        println!("ELOAD Actual electric current: {}", format_value(load_current_a));
        let load_voltage_v = eload.query_f64("MEAS:VOLT?").await?;
        println!("ELOAD Actual electric voltage: {}", format_value(load_voltage_v));

        let psu_current_a = psu.current().await?;
        println!("PSU Actual electric current: {}", format_value(psu_current_a));
        let psu_voltage_v = psu.voltage().await?;
        println!("PSU Actual electric voltage: {}", format_value(psu_voltage_v));

        let output_power_w = eload.query_f64("MEAS:POW?").await?;
        println!("ELOAD Actual output power: {}", format_value(output_power_w));
        self.session.output_power = Some(output_power_w);

        let target = self.session.params.target_voltage_v;
        let power_converged = output_power_w >= target;
        let temperature_c = self.selected_temperature()?;

        info!(
            temperature_c,
            load_current_a,
            load_voltage_v,
            output_power_w,
            power_converged,
            "Output measured"
        );
        self.session.measurements.push(MeasurementRecord {
            temperature_c,
            load_current_a,
            load_voltage_v,
            psu_current_a,
            psu_voltage_v,
            output_power_w,
            power_converged,
            timestamp: Utc::now(),
        });

        match self.convergence.policy {
            ConvergencePolicy::Advance => Ok(TestState::VerifyTemperatureStep),
            ConvergencePolicy::Require if power_converged => Ok(TestState::VerifyTemperatureStep),
            ConvergencePolicy::Require => self.ramp_current(output_power_w, target),
        }
    }

    /// Raise the load current one step toward the final current.
    fn ramp_current(&mut self, power_w: f64, target: f64) -> AppResult<TestState> {
        self.convergence.validate()?;
        let final_current = self.session.params.final_current_a;
        let current = self.session.actual_current;
        if current >= final_current {
            return Err(DaqError::ConvergenceNotReached {
                power_w,
                target,
                current_a: current,
            });
        }

        let next = (current + self.convergence.current_step_a).min(final_current);
        info!(from_a = current, to_a = next, "Output below target, raising load current");
        self.session.actual_current = next;
        Ok(TestState::ConfigEload)
    }

    fn check_temperature_steps(&mut self) -> TestState {
        self.session.temperature_index += 1;
        let index = self.session.temperature_index;

        match self.session.params.temperatures_c.get(index) {
            Some(&temperature) => {
                self.session.current_temperature = Some(temperature);
                TestState::Start
            }
            None => TestState::End,
        }
    }

    async fn finish_test(&mut self) -> AppResult<TestState> {
        self.bench.psu.set_voltage(0.0).await?;
        self.bench.eload.write("CURR 0").await?;
        self.bench.eload.write("VOLT 0").await?;

        self.session.stop = true;
        info!(
            steps = self.session.steps_executed + 1,
            measurements = self.session.measurements.len(),
            "Test finished, outputs zeroed"
        );
        Ok(TestState::End)
    }

    /// Best-effort return to zero output after a failed step.
    ///
    /// Errors are logged and swallowed so the original failure is what the
    /// caller sees.
    pub async fn safe_state(&self) {
        if let Err(e) = self.bench.eload.write("CURR 0").await {
            tracing::warn!(error = %e, "Failed to zero load current");
        }
        if let Err(e) = self.bench.psu.set_voltage(0.0).await {
            tracing::warn!(error = %e, "Failed to zero supply voltage");
        }
    }

    fn selected_temperature(&self) -> AppResult<f64> {
        self.session.current_temperature.ok_or_else(|| {
            DaqError::InvalidState(format!(
                "{} reached before a temperature was selected",
                self.session.state
            ))
        })
    }
}
