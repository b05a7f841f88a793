//! Runtime assembly: manifest -> plan -> drivers -> control loop.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pt_bus::VariableBus;
use pt_core::ensure_finite;
use pt_firmware::{
    Actuator, BinaryActuator, DriverBackend, FirmwareError, FirmwareKind, PwmActuator, RetryPolicy,
};
use pt_manifest::ModuleManifest;
use tracing::{info, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::plan::ExecutionPlan;
use crate::pump::{PumpSensor, SensorPump};
use crate::resolve::resolve;
use crate::scheduler::{BoundActuator, Scheduler, SchedulerOptions};

/// Tuning for the assembled runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    pub scheduler: SchedulerOptions,
    /// Retry policy for sensor reads.
    pub sensor_retry: RetryPolicy,
    /// Retry policy for actuator writes.
    pub actuator_retry: RetryPolicy,
}

/// Aggregated counters for a bounded run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub writes: u64,
    pub holds: u64,
    pub faults: u64,
}

/// Instantiates every actuator driver declared in the plan.
pub fn build_actuators(
    plan: &ExecutionPlan,
    backend: &dyn DriverBackend,
) -> RuntimeResult<Vec<BoundActuator>> {
    let mut actuators = Vec::with_capacity(plan.actuators().len());
    for planned in plan.actuators() {
        let driver: Box<dyn Actuator> = match &planned.kind {
            FirmwareKind::BinaryActuator { pin, active_low } => Box::new(BinaryActuator::new(
                planned.module_id.as_str(),
                *active_low,
                backend.switch(&planned.module_id, *pin)?,
            )),
            FirmwareKind::PwmActuator { pin } => Box::new(PwmActuator::new(
                planned.module_id.as_str(),
                backend.pwm(&planned.module_id, *pin)?,
            )),
            other => {
                return Err(FirmwareError::UnsupportedDevice {
                    device: planned.module_id.clone(),
                    reason: format!("'{}' is not an actuator kind", other.type_name()),
                }
                .into());
            }
        };
        actuators.push(BoundActuator::new(
            planned.module_id.clone(),
            planned.source,
            planned.multiplier,
            driver,
        ));
    }
    Ok(actuators)
}

/// Instantiates every sensor driver declared in the plan.
pub fn build_sensors(
    plan: &ExecutionPlan,
    backend: &dyn DriverBackend,
) -> RuntimeResult<Vec<PumpSensor>> {
    plan.sensors()
        .iter()
        .map(|planned| {
            let driver = backend.sensor(&planned.module_id, &planned.kind)?;
            Ok(PumpSensor {
                planned: planned.clone(),
                driver,
            })
        })
        .collect()
}

/// The assembled control runtime for one manifest.
pub struct Runtime {
    plan: Arc<ExecutionPlan>,
    bus: Arc<VariableBus>,
    scheduler: Scheduler,
    /// Taken when the pump starts; a runtime runs once.
    sensors: Option<Vec<PumpSensor>>,
    options: RuntimeOptions,
}

impl Runtime {
    /// Resolves the manifest, opens bridges, and instantiates every driver.
    pub fn build(
        manifest: &ModuleManifest,
        backend: &dyn DriverBackend,
        options: RuntimeOptions,
    ) -> RuntimeResult<Self> {
        let plan = Arc::new(resolve(manifest)?);
        for bridge in plan.bridges() {
            backend.open_bridge(&bridge.module_id, &bridge.port)?;
        }
        let bus = Arc::new(VariableBus::new());
        let actuators = build_actuators(&plan, backend)?;
        let sensors = build_sensors(&plan, backend)?;
        let scheduler = Scheduler::new(
            Arc::clone(&plan),
            Arc::clone(&bus),
            actuators,
            options.actuator_retry,
            options.scheduler,
        )?;
        info!(
            environments = plan.envs().len(),
            sensors = sensors.len(),
            controllers = plan.controllers().len(),
            actuators = plan.actuators().len(),
            bridges = plan.bridges().len(),
            "runtime assembled"
        );
        Ok(Self {
            plan,
            bus,
            scheduler,
            sensors: Some(sensors),
            options,
        })
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn bus(&self) -> &Arc<VariableBus> {
        &self.bus
    }

    /// Writes an operator setpoint to the desired plane.
    pub fn set_desired(&self, environment: &str, variable: &str, value: f64) -> RuntimeResult<()> {
        let key = self.plan.desired_key(environment, variable).ok_or_else(|| {
            RuntimeError::UnknownKey {
                environment: environment.to_string(),
                variable: variable.to_string(),
            }
        })?;
        ensure_finite(value, "setpoint")?;
        self.bus.set(key, value, Instant::now())?;
        info!(environment, variable, value, "setpoint written");
        Ok(())
    }

    /// Runs the control loop for `duration` (forever when `None`).
    ///
    /// Actuators are driven to their safe state before the first cycle, so
    /// hardware starts from a defined state. On the way out the pump is
    /// stopped first and a final dispatch returns every actuator to its safe
    /// state, whether the loop ended normally or with an error.
    pub fn run(&mut self, duration: Option<Duration>) -> RuntimeResult<RunSummary> {
        let sensors = self.sensors.take().ok_or(RuntimeError::InvalidArg {
            what: "runtime already ran",
        })?;
        self.scheduler.dispatch_safe_state()?;
        let pump = SensorPump::start(sensors, Arc::clone(&self.bus), self.options.sensor_retry);

        let period = self.options.scheduler.period;
        let started = Instant::now();
        let mut summary = RunSummary::default();
        let outcome = loop {
            let now = Instant::now();
            match self.scheduler.cycle(now) {
                Ok(stats) => {
                    summary.cycles += 1;
                    summary.writes += stats.writes as u64;
                    summary.holds += stats.holds as u64;
                    summary.faults += stats.faults as u64;
                }
                Err(e) => break Err(e),
            }
            if let Some(limit) = duration
                && started.elapsed() >= limit
            {
                break Ok(());
            }
            let deadline = now + period;
            if let Some(pause) = deadline.checked_duration_since(Instant::now()) {
                thread::sleep(pause);
            } else {
                warn!("control cycle overran its period");
            }
        };

        pump.stop();
        let safe = self.scheduler.dispatch_safe_state();
        info!(?summary, "control loop stopped");
        match (outcome, safe) {
            (Err(e), _) => Err(e),
            (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(summary),
        }
    }
}
