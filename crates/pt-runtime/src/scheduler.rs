//! Fixed-period control cycle: snapshot, evaluate, dispatch.
//!
//! Each cycle walks `Idle -> CollectInputs -> Evaluate -> Dispatch -> Idle`.
//! `CollectInputs` takes one bus snapshot; `Evaluate` runs every controller
//! against that snapshot and collects pending writes without touching the
//! bus; `Dispatch` applies the writes and drives the actuators. A controller
//! whose measurement is stale holds instead of computing against old data,
//! and staleness that outlives the fail-safe window drives the dependent
//! actuators to their safe state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pt_bus::{VarKey, VariableBus};
use pt_controls::{ControllerKind, ControllerState};
use pt_firmware::{Actuator, FirmwareError, RetryPolicy};
use tracing::{debug, error, info, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::plan::{ExecutionPlan, SetpointSource};

/// Phase of the control cycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    CollectInputs,
    Evaluate,
    Dispatch,
}

/// One write produced during Evaluate and applied at Dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingWrite {
    pub key: VarKey,
    pub value: f64,
}

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Control cycle period.
    pub period: Duration,
    /// Continuous measurement staleness beyond this window drives the
    /// dependent actuators to their safe state.
    pub failsafe_after: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            failsafe_after: Duration::from_secs(30),
        }
    }
}

/// Counters and phase timings for one control cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Pending writes applied to the bus.
    pub writes: usize,
    /// Actuator commands dispatched.
    pub dispatches: usize,
    /// Controllers that held instead of writing.
    pub holds: usize,
    /// Controllers whose stale measurement crossed the fail-safe window.
    pub failsafes: usize,
    /// Actuator faults left after retry exhaustion.
    pub faults: usize,
    /// Time spent taking the bus snapshot.
    pub collect: Duration,
    /// Time spent evaluating controllers.
    pub evaluate: Duration,
    /// Time spent writing the bus and driving actuators.
    pub dispatch: Duration,
    /// The cycle's own work took longer than the configured period.
    pub overrun: bool,
}

/// An actuator driver bound to the commanded-plane key it consumes.
pub struct BoundActuator {
    module_id: String,
    source: VarKey,
    multiplier: f64,
    driver: Box<dyn Actuator>,
}

impl BoundActuator {
    pub fn new(
        module_id: impl Into<String>,
        source: VarKey,
        multiplier: f64,
        driver: Box<dyn Actuator>,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            source,
            multiplier,
            driver,
        }
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn source(&self) -> VarKey {
        self.source
    }
}

/// Per-controller staleness bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
struct LoopHealth {
    /// When the measurement first went missing, if it still is.
    stale_since: Option<Instant>,
    /// Dependent actuators already driven safe for this stale episode.
    failsafed: bool,
    /// The last cycle produced no output; derivative restarts on resume.
    held: bool,
}

/// Drives the control cycle over an immutable plan.
pub struct Scheduler {
    plan: Arc<ExecutionPlan>,
    bus: Arc<VariableBus>,
    actuators: Vec<BoundActuator>,
    retry: RetryPolicy,
    options: SchedulerOptions,
    phase: CyclePhase,
    states: Vec<ControllerState>,
    health: Vec<LoopHealth>,
    /// Controller index -> indices of actuators fed by its output.
    dependents: Vec<Vec<usize>>,
    last_evaluate: Option<Instant>,
}

impl Scheduler {
    pub fn new(
        plan: Arc<ExecutionPlan>,
        bus: Arc<VariableBus>,
        actuators: Vec<BoundActuator>,
        retry: RetryPolicy,
        options: SchedulerOptions,
    ) -> RuntimeResult<Self> {
        if options.period.is_zero() {
            return Err(RuntimeError::InvalidArg {
                what: "scheduler period must be positive",
            });
        }
        let states = plan
            .controllers()
            .iter()
            .map(|c| c.kind.initial_state())
            .collect();
        let health = vec![LoopHealth::default(); plan.controllers().len()];
        let dependents = plan
            .controllers()
            .iter()
            .map(|c| {
                actuators
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.source == c.output)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
        Ok(Self {
            plan,
            bus,
            actuators,
            retry,
            options,
            phase: CyclePhase::Idle,
            states,
            health,
            dependents,
            last_evaluate: None,
        })
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    /// Runs one control cycle at `now`.
    pub fn cycle(&mut self, now: Instant) -> RuntimeResult<CycleStats> {
        let plan = Arc::clone(&self.plan);
        let mut stats = CycleStats::default();
        let work_started = Instant::now();

        self.phase = CyclePhase::CollectInputs;
        let snapshot = self.bus.snapshot(now)?;
        stats.collect = work_started.elapsed();

        self.phase = CyclePhase::Evaluate;
        let evaluate_started = Instant::now();
        let dt = self
            .last_evaluate
            .map(|t| now.saturating_duration_since(t).as_secs_f64())
            .unwrap_or(0.0);
        self.last_evaluate = Some(now);

        let mut pending: Vec<PendingWrite> = Vec::new();
        let mut tripped: Vec<usize> = Vec::new();
        for (i, controller) in plan.controllers().iter().enumerate() {
            match &controller.kind {
                ControllerKind::Direct(direct) => {
                    let input = match controller.setpoint {
                        SetpointSource::Fixed(value) => Some(value),
                        SetpointSource::Desired(key) => snapshot.sample(key).map(|s| s.value),
                    };
                    match input {
                        Some(value) => pending.push(PendingWrite {
                            key: controller.output,
                            value: direct.update(value),
                        }),
                        None => stats.holds += 1,
                    }
                }
                ControllerKind::Pid(config) => {
                    let Some(binding) = controller.measurement else {
                        stats.holds += 1;
                        continue;
                    };
                    let measurement = snapshot.fresh(binding.key, binding.max_age);
                    let setpoint = match controller.setpoint {
                        SetpointSource::Fixed(value) => Some(value),
                        SetpointSource::Desired(key) => snapshot.sample(key).map(|s| s.value),
                    };
                    let health = &mut self.health[i];
                    match (measurement, setpoint) {
                        (Some(pv), Some(sp)) => {
                            if health.failsafed {
                                info!(
                                    module = %controller.module_id,
                                    "measurement fresh again, resuming control"
                                );
                            }
                            let ControllerState::Pid(prev) = self.states[i] else {
                                stats.holds += 1;
                                continue;
                            };
                            let mut prev = prev;
                            if health.held {
                                // Derivative restarts after a gap.
                                prev.previous_error = None;
                            }
                            *health = LoopHealth::default();
                            let (next, output) = config.update(&prev, pv, sp, dt);
                            self.states[i] = ControllerState::Pid(next);
                            pending.push(PendingWrite {
                                key: controller.output,
                                value: output,
                            });
                        }
                        (None, _) => {
                            stats.holds += 1;
                            health.held = true;
                            let since = *health.stale_since.get_or_insert(now);
                            let stale_for = now.saturating_duration_since(since);
                            if !health.failsafed && stale_for >= self.options.failsafe_after {
                                health.failsafed = true;
                                tripped.push(i);
                            }
                        }
                        (Some(_), None) => {
                            // No setpoint yet: nothing to regulate against.
                            stats.holds += 1;
                            health.held = true;
                        }
                    }
                }
            }
        }

        stats.evaluate = evaluate_started.elapsed();

        self.phase = CyclePhase::Dispatch;
        let dispatch_started = Instant::now();
        for write in &pending {
            self.bus.set(write.key, write.value, now)?;
        }
        stats.writes = pending.len();

        let retry = self.retry;
        for actuator in &mut self.actuators {
            // Competing writers are a flagged hazard; the bus keeps the last
            // write per key, so the hardware gets that same one.
            let Some(write) = pending.iter().rev().find(|w| w.key == actuator.source) else {
                continue;
            };
            let command = write.value * actuator.multiplier;
            match retry.run("actuator write", || actuator.driver.apply(command)) {
                Ok(()) => {
                    stats.dispatches += 1;
                    debug!(module = %actuator.module_id, command, "dispatched");
                }
                Err(e) => {
                    stats.faults += 1;
                    error!(
                        module = %actuator.module_id,
                        error = %e,
                        "actuator write failed, driving safe state"
                    );
                    if let Err(safe_err) = actuator.driver.safe() {
                        error!(
                            module = %actuator.module_id,
                            error = %safe_err,
                            "safe-state write failed"
                        );
                    }
                }
            }
        }

        for &ci in &tripped {
            stats.failsafes += 1;
            warn!(
                module = %plan.controllers()[ci].module_id,
                "measurement stale beyond fail-safe window, driving dependent actuators safe"
            );
            for &ai in &self.dependents[ci] {
                let actuator = &mut self.actuators[ai];
                if let Err(e) = retry.run("actuator safe", || actuator.driver.safe()) {
                    stats.faults += 1;
                    error!(module = %actuator.module_id, error = %e, "safe-state write failed");
                }
            }
        }

        stats.dispatch = dispatch_started.elapsed();
        stats.overrun = work_started.elapsed() > self.options.period;

        self.phase = CyclePhase::Idle;
        debug!(?stats, dt, "cycle complete");
        Ok(stats)
    }

    /// Drives every actuator to its safe state.
    ///
    /// Used once before the first cycle, so hardware starts from a defined
    /// state, and again as the final dispatch at shutdown. All actuators are
    /// attempted even when one fails; the first failure is returned.
    pub fn dispatch_safe_state(&mut self) -> RuntimeResult<()> {
        self.phase = CyclePhase::Dispatch;
        let retry = self.retry;
        let mut first_error: Option<FirmwareError> = None;
        for actuator in &mut self.actuators {
            match retry.run("actuator safe", || actuator.driver.safe()) {
                Ok(()) => debug!(module = %actuator.module_id, "actuator in safe state"),
                Err(e) => {
                    error!(module = %actuator.module_id, error = %e, "safe-state write failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        self.phase = CyclePhase::Idle;
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_period_is_rejected() {
        let plan = Arc::new(ExecutionPlan::default());
        let bus = Arc::new(VariableBus::new());
        let options = SchedulerOptions {
            period: Duration::ZERO,
            ..SchedulerOptions::default()
        };

        let result = Scheduler::new(plan, bus, Vec::new(), RetryPolicy::none(), options);
        assert!(matches!(result, Err(RuntimeError::InvalidArg { .. })));
    }

    #[test]
    fn empty_plan_cycles_cleanly() {
        let plan = Arc::new(ExecutionPlan::default());
        let bus = Arc::new(VariableBus::new());
        let mut scheduler = Scheduler::new(
            plan,
            bus,
            Vec::new(),
            RetryPolicy::none(),
            SchedulerOptions::default(),
        )
        .unwrap();

        let stats = scheduler.cycle(Instant::now()).unwrap();
        assert_eq!(stats.writes, 0);
        assert_eq!(stats.dispatches, 0);
        assert_eq!(stats.holds, 0);
        assert_eq!(stats.failsafes, 0);
        assert_eq!(stats.faults, 0);
        assert!(!stats.overrun);
        assert_eq!(scheduler.phase(), CyclePhase::Idle);
    }
}
