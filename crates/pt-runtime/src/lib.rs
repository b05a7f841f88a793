//! pt-runtime: the control loop that turns a module manifest into running
//! sensors, controllers, and actuators.
//!
//! [`resolve`] builds an immutable [`ExecutionPlan`] from a validated
//! manifest. [`Scheduler`] drives the fixed-period snapshot/evaluate/dispatch
//! cycle over a [`pt_bus::VariableBus`], [`SensorPump`] feeds the measured
//! plane from per-driver threads, and [`Runtime`] wires all of it to a
//! [`pt_firmware::DriverBackend`].

pub mod error;
pub mod plan;
pub mod pump;
pub mod resolve;
pub mod runtime;
pub mod scheduler;

pub use error::{RuntimeError, RuntimeResult};
pub use plan::{
    ExecutionPlan, MeasurementBinding, NameCatalog, PlanHazard, PlannedActuator, PlannedBridge,
    PlannedController, PlannedSensor, SetpointSource,
};
pub use pump::{PumpSensor, SensorPump};
pub use resolve::{FRESHNESS_FACTOR, ResolveError, resolve};
pub use runtime::{RunSummary, Runtime, RuntimeOptions, build_actuators, build_sensors};
pub use scheduler::{
    BoundActuator, CyclePhase, CycleStats, PendingWrite, Scheduler, SchedulerOptions,
};
