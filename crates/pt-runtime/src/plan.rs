//! Immutable execution plan resolved from a module manifest.
//!
//! The plan is built once at startup by [`crate::resolve::resolve`] and never
//! mutated afterwards: environment and variable names are interned into
//! compact ids, every binding is resolved to a bus key, and controllers are
//! stored in evaluation order. The control loop walks the plan each cycle
//! without touching the raw declaration again.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use pt_bus::{Plane, VarKey};
use pt_controls::ControllerKind;
use pt_core::{EnvId, Id, PtError, PtResult, VarId};
use pt_firmware::FirmwareKind;

/// Interned string table mapping names to compact ids and back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameCatalog {
    names: Vec<String>,
    ids: HashMap<String, Id>,
}

impl NameCatalog {
    /// Returns the id for `name`, interning it on first sight.
    pub fn intern(&mut self, name: &str) -> Id {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = Id::from_index(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<Id> {
        self.ids.get(name).copied()
    }

    /// Resolves an id back to its name.
    pub fn name(&self, id: Id) -> PtResult<&str> {
        self.names
            .get(id.index() as usize)
            .map(String::as_str)
            .ok_or(PtError::UnknownId {
                what: "catalog id",
                index: id.index() as usize,
                len: self.names.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates names in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (Id::from_index(i as u32), n.as_str()))
    }
}

/// Where a feedback controller takes its setpoint from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetpointSource {
    /// Fixed value from the module parameters.
    Fixed(f64),
    /// Desired-plane variable written by the operator.
    Desired(VarKey),
}

/// Measurement binding for a feedback controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementBinding {
    /// Measured-plane key the loop reads.
    pub key: VarKey,
    /// Freshness window, derived from the producing sensor's poll interval.
    pub max_age: Duration,
}

/// A sensor driver slot: where each of its channels lands on the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSensor {
    pub module_id: String,
    pub kind: FirmwareKind,
    pub env: EnvId,
    /// Measured-plane keys, aligned with `kind.channels()`.
    pub outputs: Vec<VarKey>,
    pub poll_interval: Duration,
}

/// An actuator driver slot: the commanded variable it consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedActuator {
    pub module_id: String,
    pub kind: FirmwareKind,
    pub env: EnvId,
    /// Commanded-plane key this actuator consumes.
    pub source: VarKey,
    /// Scale applied to the command at dispatch.
    pub multiplier: f64,
}

/// A controller slot, stored in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedController {
    pub module_id: String,
    pub env: EnvId,
    pub kind: ControllerKind,
    /// Measurement binding; `None` for controllers without feedback.
    pub measurement: Option<MeasurementBinding>,
    pub setpoint: SetpointSource,
    /// Commanded-plane key this controller writes.
    pub output: VarKey,
}

/// A hardware bridge opened before any sensor starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBridge {
    pub module_id: String,
    pub port: String,
}

/// Non-fatal configuration findings surfaced at resolve time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanHazard {
    /// More than one module writes the same variable; last write wins.
    MultipleWriters {
        environment: String,
        variable: String,
        writers: Vec<String>,
    },
}

impl fmt::Display for PlanHazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanHazard::MultipleWriters {
                environment,
                variable,
                writers,
            } => write!(
                f,
                "variable '{}' in '{}' is written by multiple modules: {}",
                variable,
                environment,
                writers.join(", ")
            ),
        }
    }
}

/// Immutable execution plan: the module graph resolved to bus keys and order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPlan {
    pub(crate) envs: NameCatalog,
    pub(crate) vars: NameCatalog,
    pub(crate) sensors: Vec<PlannedSensor>,
    pub(crate) controllers: Vec<PlannedController>,
    pub(crate) actuators: Vec<PlannedActuator>,
    pub(crate) bridges: Vec<PlannedBridge>,
    pub(crate) hazards: Vec<PlanHazard>,
}

impl ExecutionPlan {
    pub fn envs(&self) -> &NameCatalog {
        &self.envs
    }

    pub fn vars(&self) -> &NameCatalog {
        &self.vars
    }

    pub fn sensors(&self) -> &[PlannedSensor] {
        &self.sensors
    }

    /// Controllers in evaluation order.
    pub fn controllers(&self) -> &[PlannedController] {
        &self.controllers
    }

    pub fn actuators(&self) -> &[PlannedActuator] {
        &self.actuators
    }

    pub fn bridges(&self) -> &[PlannedBridge] {
        &self.bridges
    }

    pub fn hazards(&self) -> &[PlanHazard] {
        &self.hazards
    }

    pub fn env_name(&self, id: EnvId) -> PtResult<&str> {
        self.envs.name(id)
    }

    pub fn var_name(&self, id: VarId) -> PtResult<&str> {
        self.vars.name(id)
    }

    /// Bus key for names the plan knows, or `None` for strangers.
    pub fn lookup_key(&self, environment: &str, plane: Plane, variable: &str) -> Option<VarKey> {
        let env = self.envs.lookup(environment)?;
        let var = self.vars.lookup(variable)?;
        Some(VarKey::new(env, plane, var))
    }

    /// Desired-plane key for an operator setpoint.
    pub fn desired_key(&self, environment: &str, variable: &str) -> Option<VarKey> {
        self.lookup_key(environment, Plane::Desired, variable)
    }
}
