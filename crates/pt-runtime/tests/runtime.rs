//! Assembly and threaded-acquisition tests against the mock backend.

use std::sync::Arc;
use std::time::Duration;

use pt_bus::{Plane, VariableBus};
use pt_firmware::{MockBackend, RetryPolicy};
use pt_manifest::ModuleManifest;
use pt_runtime::{Runtime, RuntimeOptions, SensorPump, build_sensors, resolve};

const TEMPERATURE_LOOP: &str = r#"
firmware_module:
  - _id: serial_bridge_1
    type: serial_bridge
    arguments: ["/dev/serial0"]
  - _id: am2315_1
    type: am2315
    environment: environment_1
  - _id: heater_1
    type: binary_actuator
    environment: environment_1
    arguments: [17]
    inputs:
      cmd:
        variable: air_temperature
software_module:
  - _id: air_temperature_controller_1
    type: pid
    environment: environment_1
    parameters:
      variable: air_temperature
      Kp: 1.0
      setpoint: 25.0
"#;

#[test]
fn sensor_pump_publishes_every_channel() {
    let manifest: ModuleManifest = serde_yaml::from_str(TEMPERATURE_LOOP).unwrap();
    let plan = resolve(&manifest).unwrap();
    let backend = MockBackend::new();
    let sensors = build_sensors(&plan, &backend).unwrap();

    let handle = backend.sensor_handle("am2315_1").unwrap();
    handle.hold_last(true);
    handle.push_reading([22.5, 51.0]);

    let bus = Arc::new(VariableBus::new());
    let pump = SensorPump::start(sensors, Arc::clone(&bus), RetryPolicy::none());
    assert_eq!(pump.len(), 1);
    std::thread::sleep(Duration::from_millis(60));
    pump.stop();

    let temperature = plan
        .lookup_key("environment_1", Plane::Measured, "air_temperature")
        .unwrap();
    let humidity = plan
        .lookup_key("environment_1", Plane::Measured, "air_humidity")
        .unwrap();
    assert_eq!(bus.get(temperature).unwrap().unwrap().value, 22.5);
    assert_eq!(bus.get(humidity).unwrap().unwrap().value, 51.0);
}

#[test]
fn failing_sensor_leaves_variables_to_age() {
    let manifest: ModuleManifest = serde_yaml::from_str(TEMPERATURE_LOOP).unwrap();
    let plan = resolve(&manifest).unwrap();
    let backend = MockBackend::new();
    let sensors = build_sensors(&plan, &backend).unwrap();

    // No scripted readings: every sample attempt fails. The variable is
    // never written, so consumers see absence, not a stand-in value.
    let bus = Arc::new(VariableBus::new());
    let pump = SensorPump::start(sensors, Arc::clone(&bus), RetryPolicy::none());
    std::thread::sleep(Duration::from_millis(60));
    pump.stop();

    let temperature = plan
        .lookup_key("environment_1", Plane::Measured, "air_temperature")
        .unwrap();
    assert!(bus.get(temperature).unwrap().is_none());
}

#[test]
fn build_opens_declared_bridges() {
    let manifest: ModuleManifest = serde_yaml::from_str(TEMPERATURE_LOOP).unwrap();
    let backend = MockBackend::new();
    Runtime::build(&manifest, &backend, RuntimeOptions::default()).unwrap();

    assert_eq!(
        backend.bridge_log(),
        vec![("serial_bridge_1".to_string(), "/dev/serial0".to_string())]
    );
}

#[test]
fn bounded_run_controls_and_ends_in_safe_state() {
    let manifest: ModuleManifest = serde_yaml::from_str(TEMPERATURE_LOOP).unwrap();
    let backend = MockBackend::new();
    let options = RuntimeOptions {
        scheduler: pt_runtime::SchedulerOptions {
            period: Duration::from_millis(10),
            ..Default::default()
        },
        sensor_retry: RetryPolicy::none(),
        actuator_retry: RetryPolicy::none(),
    };
    let mut runtime = Runtime::build(&manifest, &backend, options).unwrap();

    let sensor = backend.sensor_handle("am2315_1").unwrap();
    sensor.hold_last(true);
    sensor.push_reading([20.0, 50.0]);

    let summary = runtime.run(Some(Duration::from_millis(120))).unwrap();
    assert!(summary.cycles >= 2);
    assert!(summary.writes >= 1);

    let heater = backend.switch_handle("heater_1").unwrap();
    // error 5.0 clamped to 1.0 switched the heater on mid-run...
    assert!(heater.history().iter().any(|on| *on));
    // ...and the final dispatch left it safe.
    assert!(!heater.level());

    // A runtime runs once.
    assert!(runtime.run(None).is_err());
}

#[test]
fn desired_setpoint_rejects_unknown_names() {
    let manifest: ModuleManifest = serde_yaml::from_str(TEMPERATURE_LOOP).unwrap();
    let backend = MockBackend::new();
    let runtime = Runtime::build(&manifest, &backend, RuntimeOptions::default()).unwrap();

    assert!(runtime.set_desired("environment_1", "air_temperature", 24.0).is_ok());
    assert!(runtime.set_desired("environment_9", "air_temperature", 24.0).is_err());
    assert!(runtime.set_desired("environment_1", "water_level", 1.0).is_err());
    assert!(runtime.set_desired("environment_1", "air_temperature", f64::NAN).is_err());
}
