//! Integration tests for the test sequencer.
//!
//! Runs complete sequences against mock instruments and checks the final
//! instrument state, the fail-fast ordering of parameter checks, the bounded
//! stabilization wait, and both convergence policies.

use async_trait::async_trait;
use load_transient::config::{
    ConvergenceConfig, ConvergencePolicy, SequencerConfig, TimingConfig,
};
use load_transient::hardware::mock::{
    ChamberResponse, MockElectronicLoad, MockPowerSupply, MockThermalChamber,
};
use load_transient::hardware::{
    Bench, ElectronicLoad, LoadProtocolEngine, PowerSupply, ThermalChamber,
};
use load_transient::{AppResult, DaqError, Sequencer, TestParameters, TestState};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Rig {
    eload: Arc<MockElectronicLoad>,
    psu: Arc<MockPowerSupply>,
    chamber: Arc<MockThermalChamber>,
}

impl Rig {
    fn new() -> Self {
        Self::with_chamber(MockThermalChamber::new())
    }

    fn with_chamber(chamber: MockThermalChamber) -> Self {
        Self {
            eload: Arc::new(MockElectronicLoad::new()),
            psu: Arc::new(MockPowerSupply::new()),
            chamber: Arc::new(chamber),
        }
    }

    fn bench(&self) -> Bench {
        Bench::new(self.eload.clone(), self.psu.clone(), self.chamber.clone())
    }

    fn sequencer(&self, params: TestParameters) -> Sequencer {
        Sequencer::new(params, self.bench()).with_timing(TimingConfig::immediate())
    }
}

/// Electronic load whose measured power is a quarter of current × voltage.
struct SaggingLoad {
    engine: Mutex<LoadProtocolEngine>,
}

impl SaggingLoad {
    fn new() -> Self {
        Self {
            engine: Mutex::new(LoadProtocolEngine::new()),
        }
    }
}

#[async_trait]
impl ElectronicLoad for SaggingLoad {
    async fn write(&self, command: &str) -> AppResult<()> {
        self.engine.lock().unwrap().write(command)
    }

    async fn read(&self) -> AppResult<String> {
        self.engine.lock().unwrap().read()
    }

    async fn query(&self, command: &str) -> AppResult<String> {
        let engine = self.engine.lock().unwrap();
        let response = engine.query(command)?;
        if command == "MEAS:POW?" {
            return Ok(format!("{:?}", engine.power() / 4.0));
        }
        Ok(response)
    }
}

// =============================================================================
// Complete runs
// =============================================================================

#[tokio::test]
async fn test_single_temperature_run_zeroes_outputs() {
    let rig = Rig::new();
    let mut sequencer = rig.sequencer(TestParameters::with_temperatures(vec![25.0]));

    let summary = sequencer.run().await.unwrap();

    assert_eq!(sequencer.state(), TestState::End);
    assert!(sequencer.is_finished());
    assert_eq!(rig.eload.query("CURR?").await.unwrap(), "0.0");
    assert_eq!(rig.eload.query("VOLT?").await.unwrap(), "0.0");
    assert_eq!(rig.psu.voltage().await.unwrap(), 0.0);

    assert_eq!(summary.measurements.len(), 1);
    let record = &summary.measurements[0];
    assert_eq!(record.temperature_c, 25.0);
    assert_eq!(record.load_current_a, 3.0);
    assert_eq!(record.load_voltage_v, 20.0);
    assert_eq!(record.psu_current_a, 1.0);
    assert_eq!(record.psu_voltage_v, 20.0);
    assert_eq!(record.output_power_w, 60.0);
    assert!(record.power_converged);
}

#[tokio::test]
async fn test_run_issues_expected_load_commands() {
    let rig = Rig::new();
    let mut sequencer = rig.sequencer(TestParameters::with_temperatures(vec![25.0]));
    sequencer.run().await.unwrap();

    assert_eq!(
        rig.eload.commands().await,
        vec![
            "CURR 0",
            "VOLT 20.0",
            "CURR 3.0",
            "MEAS:CURR?",
            "MEAS:VOLT?",
            "MEAS:POW?",
            "CURR 0",
            "VOLT 0",
        ]
    );
}

#[tokio::test]
async fn test_multiple_temperatures_visit_each_step() {
    let rig = Rig::new();
    let mut sequencer = rig.sequencer(TestParameters::with_temperatures(vec![10.0, 25.0, 45.0]));

    let summary = sequencer.run().await.unwrap();

    let temperatures: Vec<f64> = summary.measurements.iter().map(|m| m.temperature_c).collect();
    assert_eq!(temperatures, vec![10.0, 25.0, 45.0]);
    assert_eq!(rig.chamber.set_count(), 3);
    assert_eq!(rig.chamber.setpoint().await, 45.0);
    // 6 states per temperature plus END
    assert_eq!(summary.steps_executed, 3 * 6 + 1);
    assert_eq!(sequencer.session().output_power(), Some(60.0));
}

#[tokio::test]
async fn test_run_from_shipped_config() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/load_transient.toml");
    let mut config = SequencerConfig::load_from(path).unwrap();
    config.validate().unwrap();
    config.timing = TimingConfig::immediate();

    let rig = Rig::new();
    let mut sequencer = Sequencer::from_config(&config, rig.bench());
    let summary = sequencer.run().await.unwrap();

    assert_eq!(summary.test_name, config.test.name);
    assert_eq!(summary.measurements.len(), config.test.temperatures_c.len());
}

#[tokio::test]
async fn test_resumed_run_skips_preset() {
    let rig = Rig::new();
    let mut sequencer = rig.sequencer(TestParameters::with_temperatures(vec![25.0]));
    for _ in 0..4 {
        sequencer.step().await.unwrap();
    }
    assert_eq!(sequencer.state(), TestState::ShowOutput);

    let summary = sequencer.run().await.unwrap();

    assert_eq!(summary.measurements.len(), 1);
    assert_eq!(summary.measurements[0].load_current_a, 3.0);
    let commands = rig.eload.commands().await;
    assert_eq!(commands.first().map(String::as_str), Some("VOLT 20.0"));
    assert_eq!(commands.iter().filter(|c| *c == "CURR 0").count(), 1);
}

// =============================================================================
// Fail-fast parameter checks
// =============================================================================

#[tokio::test]
async fn test_reference_temperatures_fail_before_chamber_is_commanded() {
    let rig = Rig::new();
    let mut sequencer = rig.sequencer(TestParameters::default());

    let result = sequencer.step().await;

    match result {
        Err(DaqError::ParameterOutOfRange {
            parameter, value, ..
        }) => {
            assert_eq!(parameter, "temperature");
            assert_eq!(value, -10.0);
        }
        other => panic!("expected ParameterOutOfRange, got {:?}", other),
    }
    assert_eq!(sequencer.state(), TestState::Start);
    assert_eq!(rig.chamber.set_count(), 0);
    assert!(rig.eload.commands().await.is_empty());
}

#[tokio::test]
async fn test_run_aborts_on_out_of_range_temperature() {
    let rig = Rig::new();
    let mut sequencer = rig.sequencer(TestParameters::with_temperatures(vec![25.0, 85.0]));

    let err = sequencer.run().await.unwrap_err();

    assert_eq!(err.parameter(), Some("temperature"));
    assert_eq!(rig.chamber.set_count(), 1);
    assert_eq!(sequencer.session().measurements().len(), 1);
    assert!(!sequencer.is_finished());
    // Outputs returned to zero after the abort
    assert_eq!(rig.eload.programmed_current().await, 0.0);
    assert_eq!(rig.psu.voltage().await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_bad_current_bound_fails_before_load_voltage() {
    let rig = Rig::new();
    let mut params = TestParameters::with_temperatures(vec![25.0]);
    params.final_current_a = 0.5;
    let mut sequencer = rig.sequencer(params);

    let err = sequencer.step().await.unwrap_err();

    assert_eq!(err.parameter(), Some("final_current"));
    assert_eq!(rig.eload.programmed_voltage().await, 0.0);
}

// =============================================================================
// Chamber stabilization
// =============================================================================

#[tokio::test]
async fn test_ramping_chamber_is_polled_until_stable() {
    let rig = Rig::with_chamber(MockThermalChamber::with_response(ChamberResponse::Ramp {
        step_c: 5.0,
    }));
    let mut sequencer = rig.sequencer(TestParameters::with_temperatures(vec![45.0]));

    sequencer.run().await.unwrap();

    assert_eq!(rig.chamber.temperature().await.unwrap(), 45.0);
}

#[tokio::test]
async fn test_stuck_chamber_times_out() {
    let rig = Rig::with_chamber(MockThermalChamber::with_response(ChamberResponse::Stuck));
    let mut params = TestParameters::with_temperatures(vec![40.0]);
    params.stabilization_timeout_s = 0.0;
    let mut sequencer = rig.sequencer(params);

    assert_eq!(sequencer.step().await.unwrap(), TestState::ConfigEquity);
    let result = sequencer.step().await;

    match result {
        Err(DaqError::StabilizationTimeout { target, last, .. }) => {
            assert_eq!(target, 40.0);
            assert_eq!(last, MockThermalChamber::AMBIENT_C);
        }
        other => panic!("expected StabilizationTimeout, got {:?}", other),
    }
    assert_eq!(sequencer.state(), TestState::ConfigEquity);
}

#[tokio::test]
async fn test_tolerance_accepts_nearby_reading() {
    let rig = Rig::with_chamber(MockThermalChamber::with_response(ChamberResponse::Stuck));
    let mut params = TestParameters::with_temperatures(vec![25.5]);
    params.stabilization_timeout_s = 0.0;
    params.temperature_tolerance_c = 0.5;
    let mut sequencer = rig.sequencer(params);

    sequencer.step().await.unwrap();
    assert_eq!(sequencer.step().await.unwrap(), TestState::ConfigPsu);
}

// =============================================================================
// Convergence policies
// =============================================================================

fn sagging_sequencer(params: TestParameters, policy: ConvergencePolicy) -> Sequencer {
    let bench = Bench::new(
        Arc::new(SaggingLoad::new()),
        Arc::new(MockPowerSupply::new()),
        Arc::new(MockThermalChamber::new()),
    );
    Sequencer::new(params, bench)
        .with_timing(TimingConfig::immediate())
        .with_convergence(ConvergenceConfig {
            policy,
            current_step_a: 1.0,
        })
}

#[tokio::test]
async fn test_advance_policy_ignores_unconverged_power() {
    let params = TestParameters::with_temperatures(vec![25.0]);
    let mut sequencer = sagging_sequencer(params, ConvergencePolicy::Advance);

    let summary = sequencer.run().await.unwrap();

    assert_eq!(summary.measurements.len(), 1);
    assert_eq!(summary.measurements[0].output_power_w, 15.0);
    assert!(!summary.measurements[0].power_converged);
}

#[tokio::test]
async fn test_require_policy_ramps_current_until_converged() {
    let params = TestParameters::with_temperatures(vec![25.0]);
    let mut sequencer = sagging_sequencer(params, ConvergencePolicy::Require);

    for _ in 0..4 {
        sequencer.step().await.unwrap();
    }
    assert_eq!(sequencer.state(), TestState::ShowOutput);
    assert_eq!(sequencer.step().await.unwrap(), TestState::ConfigEload);
    assert_eq!(sequencer.session().actual_current(), 4.0);

    let summary = sequencer.run().await.unwrap();
    let powers: Vec<f64> = summary.measurements.iter().map(|m| m.output_power_w).collect();
    assert_eq!(powers, vec![15.0, 20.0]);
    assert!(summary.measurements[1].power_converged);
}

#[tokio::test]
async fn test_require_policy_rejects_stalled_ramp() {
    for step in [0.0, -0.5] {
        let bench = Bench::new(
            Arc::new(SaggingLoad::new()),
            Arc::new(MockPowerSupply::new()),
            Arc::new(MockThermalChamber::new()),
        );
        let mut config = SequencerConfig::default();
        config.test.temperatures_c = vec![25.0];
        config.timing = TimingConfig::immediate();
        config.convergence = ConvergenceConfig {
            policy: ConvergencePolicy::Require,
            current_step_a: step,
        };
        let mut sequencer = Sequencer::from_config(&config, bench);

        let result = tokio::time::timeout(Duration::from_secs(2), sequencer.run())
            .await
            .expect("run must terminate");

        assert!(
            matches!(result, Err(DaqError::Configuration(_))),
            "step {} should be rejected, got {:?}",
            step,
            result
        );
        assert_eq!(sequencer.session().measurements().len(), 1);
        assert_eq!(sequencer.session().actual_current(), 3.0);
    }
}

#[tokio::test]
async fn test_require_policy_fails_when_ramp_exhausted() {
    let mut params = TestParameters::with_temperatures(vec![25.0]);
    params.final_current_a = 3.5;
    let mut sequencer = sagging_sequencer(params, ConvergencePolicy::Require);

    let err = sequencer.run().await.unwrap_err();

    match err {
        DaqError::ConvergenceNotReached {
            power_w, current_a, ..
        } => {
            assert_eq!(current_a, 3.5);
            assert_eq!(power_w, 17.5);
        }
        other => panic!("expected ConvergenceNotReached, got {:?}", other),
    }
    assert_eq!(sequencer.session().measurements().len(), 2);
}
