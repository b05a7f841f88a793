//! Graph resolver: turns a validated manifest into an [`ExecutionPlan`].
//!
//! Resolution happens once at startup and either produces a complete plan or
//! fails the whole load; no module is ever activated from a partially
//! resolved graph.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use pt_bus::VarKey;
use pt_controls::{ControllerKind, DirectController, PidConfig};
use pt_core::EnvId;
use pt_firmware::FirmwareKind;
use pt_manifest::{
    ArgValue, FirmwareModuleDef, InputBindingDef, ModuleManifest, SoftwareModuleDef,
    ValidationError, validate_manifest,
};
use tracing::warn;

use crate::plan::{
    ExecutionPlan, MeasurementBinding, NameCatalog, PlanHazard, PlannedActuator, PlannedBridge,
    PlannedController, PlannedSensor, SetpointSource,
};

/// A sensor reading older than this multiple of its poll interval is stale.
pub const FRESHNESS_FACTOR: u32 = 3;

/// Errors detected while resolving the module graph.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Unknown module type '{kind}' for module '{id}'")]
    UnknownType { id: String, kind: String },

    #[error("Bad arguments for module '{id}': {reason}")]
    BadArguments { id: String, reason: String },

    #[error("Bad parameters for module '{id}': {reason}")]
    BadParameters { id: String, reason: String },

    #[error("Bad input bindings for module '{id}': {reason}")]
    BadInputs { id: String, reason: String },

    #[error("Unresolved input for module '{id}': {reason}")]
    UnresolvedInput { id: String, reason: String },

    #[error("Module '{id}' requires an environment")]
    MissingEnvironment { id: String },

    #[error("Controller dependencies form a cycle in environment '{environment}'")]
    DependencyCycle { environment: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

struct MeasuredProducer {
    writers: Vec<String>,
    interval: Duration,
}

struct PendingActuator {
    module_id: String,
    kind: FirmwareKind,
    env: EnvId,
    env_name: String,
    variable: String,
    multiplier: f64,
}

struct RawController {
    module_id: String,
    env: EnvId,
    env_name: String,
    variable: String,
    kind: ControllerKind,
    setpoint: Option<f64>,
}

/// Resolves a manifest into an execution plan.
///
/// Steps: validate the declaration, instantiate each module kind from the
/// type registry, intern environment and variable names, resolve every input
/// binding to a bus key, record multi-writer hazards, and order controllers
/// so producers evaluate before consumers.
pub fn resolve(manifest: &ModuleManifest) -> Result<ExecutionPlan, ResolveError> {
    validate_manifest(manifest)?;

    let mut envs = NameCatalog::default();
    let mut vars = NameCatalog::default();
    let mut sensors = Vec::new();
    let mut pending_actuators = Vec::new();
    let mut bridges = Vec::new();
    let mut measured: HashMap<VarKey, MeasuredProducer> = HashMap::new();

    for def in &manifest.firmware_module {
        let kind = firmware_kind(def)?;
        match (&kind, kind.poll_interval()) {
            (FirmwareKind::SerialBridge { port }, _) => {
                no_inputs(def, "bridges take no input bindings")?;
                bridges.push(PlannedBridge {
                    module_id: def.id.clone(),
                    port: port.clone(),
                });
            }
            (_, Some(interval)) => {
                no_inputs(def, "sensors take no input bindings")?;
                let env_name = required_environment(def)?;
                let env = envs.intern(env_name);
                let mut outputs = Vec::new();
                for channel in kind.channels() {
                    let key = VarKey::measured(env, vars.intern(channel));
                    measured
                        .entry(key)
                        .or_insert_with(|| MeasuredProducer {
                            writers: Vec::new(),
                            interval,
                        })
                        .writers
                        .push(def.id.clone());
                    outputs.push(key);
                }
                sensors.push(PlannedSensor {
                    module_id: def.id.clone(),
                    kind: kind.clone(),
                    env,
                    outputs,
                    poll_interval: interval,
                });
            }
            _ => {
                let env_name = required_environment(def)?;
                let env = envs.intern(env_name);
                let binding = exactly_one_input(def)?;
                pending_actuators.push(PendingActuator {
                    module_id: def.id.clone(),
                    kind: kind.clone(),
                    env,
                    env_name: env_name.to_string(),
                    variable: binding.variable.clone(),
                    multiplier: binding.multiplier,
                });
            }
        }
    }

    let mut raw_controllers = Vec::new();
    let mut commanded: HashMap<VarKey, Vec<String>> = HashMap::new();

    for def in &manifest.software_module {
        let env_name = def
            .environment
            .as_deref()
            .ok_or_else(|| ResolveError::MissingEnvironment { id: def.id.clone() })?;
        let env = envs.intern(env_name);
        let decoded = controller_kind(def)?;
        let var = vars.intern(&decoded.variable);
        commanded
            .entry(VarKey::commanded(env, var))
            .or_default()
            .push(def.id.clone());
        raw_controllers.push(RawController {
            module_id: def.id.clone(),
            env,
            env_name: env_name.to_string(),
            variable: decoded.variable,
            kind: decoded.kind,
            setpoint: decoded.setpoint,
        });
    }

    let mut controllers = Vec::new();
    for rc in raw_controllers {
        let var = vars.intern(&rc.variable);
        let output = VarKey::commanded(rc.env, var);
        let (measurement, setpoint) = match &rc.kind {
            ControllerKind::Direct(_) => {
                (None, SetpointSource::Desired(VarKey::desired(rc.env, var)))
            }
            ControllerKind::Pid(_) => {
                let key = VarKey::measured(rc.env, var);
                let producer = measured.get(&key).ok_or_else(|| {
                    ResolveError::UnresolvedInput {
                        id: rc.module_id.clone(),
                        reason: format!(
                            "no sensor in environment '{}' measures '{}'",
                            rc.env_name, rc.variable
                        ),
                    }
                })?;
                let binding = MeasurementBinding {
                    key,
                    max_age: producer.interval * FRESHNESS_FACTOR,
                };
                let setpoint = match rc.setpoint {
                    Some(value) => SetpointSource::Fixed(value),
                    None => SetpointSource::Desired(VarKey::desired(rc.env, var)),
                };
                (Some(binding), setpoint)
            }
        };
        controllers.push(PlannedController {
            module_id: rc.module_id,
            env: rc.env,
            kind: rc.kind,
            measurement,
            setpoint,
            output,
        });
    }

    let mut actuators = Vec::new();
    for pa in pending_actuators {
        let var = vars.intern(&pa.variable);
        let source = VarKey::commanded(pa.env, var);
        if !commanded.contains_key(&source) {
            return Err(ResolveError::UnresolvedInput {
                id: pa.module_id,
                reason: format!(
                    "no controller in environment '{}' commands '{}'",
                    pa.env_name, pa.variable
                ),
            });
        }
        actuators.push(PlannedActuator {
            module_id: pa.module_id,
            kind: pa.kind,
            env: pa.env,
            source,
            multiplier: pa.multiplier,
        });
    }

    let mut hazards = Vec::new();
    collect_multi_writers(
        &mut hazards,
        &envs,
        &vars,
        measured.iter().map(|(key, p)| (*key, p.writers.as_slice())),
    );
    collect_multi_writers(
        &mut hazards,
        &envs,
        &vars,
        commanded.iter().map(|(key, w)| (*key, w.as_slice())),
    );
    hazards.sort_by(|a, b| {
        let PlanHazard::MultipleWriters {
            environment: ea,
            variable: va,
            ..
        } = a;
        let PlanHazard::MultipleWriters {
            environment: eb,
            variable: vb,
            ..
        } = b;
        ea.cmp(eb).then_with(|| va.cmp(vb))
    });
    for hazard in &hazards {
        warn!(%hazard, "configuration hazard");
    }

    let controllers = order_controllers(controllers, &envs)?;

    Ok(ExecutionPlan {
        envs,
        vars,
        sensors,
        controllers,
        actuators,
        bridges,
        hazards,
    })
}

fn required_environment(def: &FirmwareModuleDef) -> Result<&str, ResolveError> {
    def.environment
        .as_deref()
        .ok_or_else(|| ResolveError::MissingEnvironment { id: def.id.clone() })
}

fn no_inputs(def: &FirmwareModuleDef, reason: &str) -> Result<(), ResolveError> {
    if def.inputs.is_empty() {
        Ok(())
    } else {
        Err(ResolveError::BadInputs {
            id: def.id.clone(),
            reason: reason.to_string(),
        })
    }
}

fn exactly_one_input(def: &FirmwareModuleDef) -> Result<&InputBindingDef, ResolveError> {
    let mut bindings = def.inputs.values();
    match (bindings.next(), bindings.next()) {
        (Some(binding), None) => Ok(binding),
        (None, _) => Err(ResolveError::BadInputs {
            id: def.id.clone(),
            reason: "expects exactly one input binding, found none".to_string(),
        }),
        (Some(_), Some(_)) => Err(ResolveError::BadInputs {
            id: def.id.clone(),
            reason: format!(
                "expects exactly one input binding, found {}",
                def.inputs.len()
            ),
        }),
    }
}

fn collect_multi_writers<'a>(
    hazards: &mut Vec<PlanHazard>,
    envs: &NameCatalog,
    vars: &NameCatalog,
    writers: impl Iterator<Item = (VarKey, &'a [String])>,
) {
    for (key, ids) in writers {
        if ids.len() > 1 {
            hazards.push(PlanHazard::MultipleWriters {
                environment: envs.name(key.env).unwrap_or("?").to_string(),
                variable: vars.name(key.var).unwrap_or("?").to_string(),
                writers: ids.to_vec(),
            });
        }
    }
}

/// Orders controllers so that producers evaluate before consumers.
///
/// Environments keep first-declaration order; within an environment the
/// order is a stable topological sort over commanded-variable dependencies.
/// The current controller kinds read only measured and desired variables, so
/// the dependency graph is edgeless and declaration order survives; a kind
/// that consumes another controller's output will be ordered here, and a
/// dependency cycle aborts the load.
fn order_controllers(
    controllers: Vec<PlannedController>,
    envs: &NameCatalog,
) -> Result<Vec<PlannedController>, ResolveError> {
    let mut env_order: Vec<EnvId> = Vec::new();
    let mut by_env: HashMap<EnvId, Vec<usize>> = HashMap::new();
    for (i, controller) in controllers.iter().enumerate() {
        let members = by_env.entry(controller.env).or_default();
        if members.is_empty() {
            env_order.push(controller.env);
        }
        members.push(i);
    }

    let mut final_order = Vec::with_capacity(controllers.len());
    for env in env_order {
        let members = &by_env[&env];
        let mut edges = Vec::new();
        for (ai, &a) in members.iter().enumerate() {
            for (bi, &b) in members.iter().enumerate() {
                if ai != bi && reads(&controllers[b], controllers[a].output) {
                    edges.push((ai, bi));
                }
            }
        }
        let order =
            stable_topo(members.len(), &edges).ok_or_else(|| ResolveError::DependencyCycle {
                environment: envs.name(env).unwrap_or("?").to_string(),
            })?;
        final_order.extend(order.into_iter().map(|i| members[i]));
    }

    let mut slots: Vec<Option<PlannedController>> = controllers.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(slots.len());
    for i in final_order {
        if let Some(controller) = slots[i].take() {
            ordered.push(controller);
        }
    }
    Ok(ordered)
}

fn reads(controller: &PlannedController, key: VarKey) -> bool {
    if let Some(binding) = &controller.measurement
        && binding.key == key
    {
        return true;
    }
    if let SetpointSource::Desired(setpoint_key) = controller.setpoint
        && setpoint_key == key
    {
        return true;
    }
    false
}

/// Kahn's algorithm with a FIFO ready queue so independent nodes keep their
/// input order. Returns `None` when the edges contain a cycle.
fn stable_topo(n: usize, edges: &[(usize, usize)]) -> Option<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for &(from, to) in edges {
        adjacency[from].push(to);
        in_degree[to] += 1;
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &next in &adjacency[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != n { None } else { Some(order) }
}

/// Instantiates a firmware driver kind from its declared type and arguments.
///
/// The registry is closed: adding a driver means adding a [`FirmwareKind`]
/// variant and an arm here. Argument lists are positional and type-specific.
fn firmware_kind(def: &FirmwareModuleDef) -> Result<FirmwareKind, ResolveError> {
    let kind = match def.kind.as_str() {
        "pwm_actuator" => {
            check_arity(def, 1, 1)?;
            FirmwareKind::PwmActuator {
                pin: arg_pin(def, 0)?,
            }
        }
        "binary_actuator" => {
            check_arity(def, 1, 2)?;
            FirmwareKind::BinaryActuator {
                pin: arg_pin(def, 0)?,
                active_low: arg_flag(def, 1, "active_low")?,
            }
        }
        "am2315" => {
            check_arity(def, 0, 0)?;
            FirmwareKind::Am2315
        }
        "mhz16" => {
            check_arity(def, 0, 0)?;
            FirmwareKind::Mhz16
        }
        "atlas_ph" => {
            check_arity(def, 0, 0)?;
            FirmwareKind::AtlasPh
        }
        "atlas_ec" => {
            check_arity(def, 0, 0)?;
            FirmwareKind::AtlasEc
        }
        "serial_bridge" => {
            check_arity(def, 1, 1)?;
            FirmwareKind::SerialBridge {
                port: arg_text(def, 0, "port")?,
            }
        }
        _ => {
            return Err(ResolveError::UnknownType {
                id: def.id.clone(),
                kind: def.kind.clone(),
            });
        }
    };
    Ok(kind)
}

fn check_arity(def: &FirmwareModuleDef, min: usize, max: usize) -> Result<(), ResolveError> {
    let n = def.arguments.len();
    if n < min || n > max {
        return Err(ResolveError::BadArguments {
            id: def.id.clone(),
            reason: format!("'{}' takes {min}..={max} arguments, found {n}", def.kind),
        });
    }
    Ok(())
}

fn bad_argument(def: &FirmwareModuleDef, index: usize, name: &str, wanted: &str) -> ResolveError {
    ResolveError::BadArguments {
        id: def.id.clone(),
        reason: format!("argument {index} ({name}) must be {wanted}"),
    }
}

fn arg_pin(def: &FirmwareModuleDef, index: usize) -> Result<u32, ResolveError> {
    let value = def
        .arguments
        .get(index)
        .and_then(ArgValue::as_int)
        .ok_or_else(|| bad_argument(def, index, "pin", "an integer"))?;
    u32::try_from(value).map_err(|_| bad_argument(def, index, "pin", "a non-negative integer"))
}

fn arg_flag(def: &FirmwareModuleDef, index: usize, name: &str) -> Result<bool, ResolveError> {
    match def.arguments.get(index) {
        None => Ok(false),
        Some(value) => value
            .as_flag()
            .ok_or_else(|| bad_argument(def, index, name, "a boolean")),
    }
}

fn arg_text(def: &FirmwareModuleDef, index: usize, name: &str) -> Result<String, ResolveError> {
    def.arguments
        .get(index)
        .and_then(ArgValue::as_text)
        .map(str::to_string)
        .ok_or_else(|| bad_argument(def, index, name, "a string"))
}

struct DecodedController {
    kind: ControllerKind,
    variable: String,
    setpoint: Option<f64>,
}

const DIRECT_PARAMS: &[&str] = &["variable"];
const PID_PARAMS: &[&str] = &[
    "variable",
    "Kp",
    "Ki",
    "Kd",
    "upper_limit",
    "lower_limit",
    "windup_limit",
    "deadband_width",
    "setpoint",
];

/// Instantiates a controller kind from its declared type and parameters.
fn controller_kind(def: &SoftwareModuleDef) -> Result<DecodedController, ResolveError> {
    match def.kind.as_str() {
        "direct_controller" => {
            check_params(def, DIRECT_PARAMS)?;
            Ok(DecodedController {
                kind: ControllerKind::Direct(DirectController::new()),
                variable: param_text(def, "variable")?,
                setpoint: None,
            })
        }
        "pid" => {
            check_params(def, PID_PARAMS)?;
            let defaults = PidConfig::default();
            let kp = param_num(def, "Kp", defaults.kp)?;
            let ki = param_num(def, "Ki", defaults.ki)?;
            let kd = param_num(def, "Kd", defaults.kd)?;
            let upper = param_num(def, "upper_limit", defaults.upper_limit)?;
            let lower = param_num(def, "lower_limit", defaults.lower_limit)?;
            let windup = param_num(def, "windup_limit", defaults.windup_limit)?;
            let deadband = param_num(def, "deadband_width", defaults.deadband_width)?;
            let config = PidConfig::new(kp, ki, kd)
                .and_then(|c| c.with_limits(lower, upper))
                .and_then(|c| c.with_windup_limit(windup))
                .and_then(|c| c.with_deadband(deadband))
                .map_err(|e| ResolveError::BadParameters {
                    id: def.id.clone(),
                    reason: e.to_string(),
                })?;
            let setpoint = opt_param_num(def, "setpoint")?;
            Ok(DecodedController {
                kind: ControllerKind::Pid(config),
                variable: param_text(def, "variable")?,
                setpoint,
            })
        }
        _ => Err(ResolveError::UnknownType {
            id: def.id.clone(),
            kind: def.kind.clone(),
        }),
    }
}

fn check_params(def: &SoftwareModuleDef, known: &[&str]) -> Result<(), ResolveError> {
    for key in def.parameters.keys() {
        if !known.contains(&key.as_str()) {
            return Err(ResolveError::BadParameters {
                id: def.id.clone(),
                reason: format!("unknown parameter '{key}'"),
            });
        }
    }
    Ok(())
}

fn param_text(def: &SoftwareModuleDef, name: &str) -> Result<String, ResolveError> {
    match def.parameters.get(name) {
        None => Err(ResolveError::BadParameters {
            id: def.id.clone(),
            reason: format!("required parameter '{name}' is missing"),
        }),
        Some(value) => value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| ResolveError::BadParameters {
                id: def.id.clone(),
                reason: format!("parameter '{name}' must be a string"),
            }),
    }
}

fn param_num(def: &SoftwareModuleDef, name: &str, default: f64) -> Result<f64, ResolveError> {
    match opt_param_num(def, name)? {
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

fn opt_param_num(def: &SoftwareModuleDef, name: &str) -> Result<Option<f64>, ResolveError> {
    let Some(value) = def.parameters.get(name) else {
        return Ok(None);
    };
    let number = value.as_num().ok_or_else(|| ResolveError::BadParameters {
        id: def.id.clone(),
        reason: format!("parameter '{name}' must be a number"),
    })?;
    if !number.is_finite() {
        return Err(ResolveError::BadParameters {
            id: def.id.clone(),
            reason: format!("parameter '{name}' must be finite"),
        });
    }
    Ok(Some(number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_bus::Plane;
    use pt_manifest::ParamValue;
    use std::collections::BTreeMap;

    fn sensor_def(id: &str, kind: &str, env: &str) -> FirmwareModuleDef {
        FirmwareModuleDef {
            id: id.to_string(),
            kind: kind.to_string(),
            environment: Some(env.to_string()),
            arguments: Vec::new(),
            inputs: BTreeMap::new(),
        }
    }

    fn binary_def(
        id: &str,
        env: &str,
        pin: i64,
        variable: &str,
        multiplier: f64,
    ) -> FirmwareModuleDef {
        FirmwareModuleDef {
            id: id.to_string(),
            kind: "binary_actuator".to_string(),
            environment: Some(env.to_string()),
            arguments: vec![ArgValue::Int(pin)],
            inputs: BTreeMap::from([(
                "cmd".to_string(),
                InputBindingDef {
                    variable: variable.to_string(),
                    multiplier,
                },
            )]),
        }
    }

    fn pid_def(id: &str, env: &str, variable: &str, params: &[(&str, f64)]) -> SoftwareModuleDef {
        let mut parameters = BTreeMap::from([(
            "variable".to_string(),
            ParamValue::Text(variable.to_string()),
        )]);
        for (name, value) in params {
            parameters.insert((*name).to_string(), ParamValue::Num(*value));
        }
        SoftwareModuleDef {
            id: id.to_string(),
            kind: "pid".to_string(),
            environment: Some(env.to_string()),
            parameters,
        }
    }

    fn direct_def(id: &str, env: &str, variable: &str) -> SoftwareModuleDef {
        SoftwareModuleDef {
            id: id.to_string(),
            kind: "direct_controller".to_string(),
            environment: Some(env.to_string()),
            parameters: BTreeMap::from([(
                "variable".to_string(),
                ParamValue::Text(variable.to_string()),
            )]),
        }
    }

    fn temperature_manifest() -> ModuleManifest {
        ModuleManifest {
            firmware_module: vec![
                sensor_def("am2315_1", "am2315", "environment_1"),
                binary_def("heater_1", "environment_1", 17, "air_temperature", 1.0),
                binary_def("cooler_1", "environment_1", 27, "air_temperature", -1.0),
            ],
            software_module: vec![pid_def(
                "air_temperature_controller_1",
                "environment_1",
                "air_temperature",
                &[
                    ("Kp", 1.0),
                    ("upper_limit", 1.0),
                    ("lower_limit", -1.0),
                    ("deadband_width", 0.5),
                    ("setpoint", 25.0),
                ],
            )],
        }
    }

    #[test]
    fn resolves_temperature_loop() {
        let plan = resolve(&temperature_manifest()).unwrap();

        assert_eq!(plan.sensors().len(), 1);
        assert_eq!(plan.sensors()[0].outputs.len(), 2);
        assert_eq!(plan.sensors()[0].poll_interval, Duration::from_secs(2));

        assert_eq!(plan.controllers().len(), 1);
        let controller = &plan.controllers()[0];
        let binding = controller.measurement.unwrap();
        assert_eq!(binding.max_age, Duration::from_secs(6));
        assert_eq!(binding.key.plane, Plane::Measured);
        assert_eq!(controller.setpoint, SetpointSource::Fixed(25.0));
        assert_eq!(controller.output.plane, Plane::Commanded);

        assert_eq!(plan.actuators().len(), 2);
        for actuator in plan.actuators() {
            assert_eq!(actuator.source, controller.output);
        }
        assert_eq!(plan.actuators()[1].multiplier, -1.0);

        assert!(plan.hazards().is_empty());
        assert!(plan.bridges().is_empty());
    }

    #[test]
    fn pid_without_setpoint_reads_desired_plane() {
        let mut manifest = temperature_manifest();
        manifest.software_module[0].parameters.remove("setpoint");

        let plan = resolve(&manifest).unwrap();
        match plan.controllers()[0].setpoint {
            SetpointSource::Desired(key) => assert_eq!(key.plane, Plane::Desired),
            SetpointSource::Fixed(_) => panic!("expected a desired-plane setpoint"),
        }
    }

    #[test]
    fn unknown_type_is_fatal() {
        let mut manifest = temperature_manifest();
        manifest.firmware_module[0].kind = "sht25".to_string();

        let err = resolve(&manifest).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownType { .. }));
        assert!(err.to_string().contains("am2315_1"));
    }

    #[test]
    fn missing_sensor_fails_load_naming_the_module() {
        let mut manifest = temperature_manifest();
        manifest.firmware_module.remove(0);

        let err = resolve(&manifest).unwrap_err();
        let text = err.to_string();
        assert!(matches!(err, ResolveError::UnresolvedInput { .. }));
        assert!(text.contains("air_temperature_controller_1"));
        assert!(text.contains("air_temperature"));
    }

    #[test]
    fn actuator_without_controller_fails_load() {
        let manifest = ModuleManifest {
            firmware_module: vec![binary_def(
                "humidifier_1",
                "environment_1",
                22,
                "air_humidity",
                1.0,
            )],
            software_module: Vec::new(),
        };

        let err = resolve(&manifest).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("humidifier_1"));
        assert!(text.contains("air_humidity"));
    }

    #[test]
    fn actuator_input_arity_is_enforced() {
        let mut manifest = temperature_manifest();
        manifest.firmware_module[1].inputs.clear();

        let err = resolve(&manifest).unwrap_err();
        assert!(matches!(err, ResolveError::BadInputs { .. }));

        let mut manifest = temperature_manifest();
        let extra = InputBindingDef {
            variable: "air_humidity".to_string(),
            multiplier: 1.0,
        };
        manifest.firmware_module[1]
            .inputs
            .insert("aux".to_string(), extra);

        let err = resolve(&manifest).unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn sensor_with_inputs_is_rejected() {
        let mut manifest = temperature_manifest();
        let binding = InputBindingDef {
            variable: "air_temperature".to_string(),
            multiplier: 1.0,
        };
        manifest.firmware_module[0]
            .inputs
            .insert("cmd".to_string(), binding);

        // Structural validation insists on an environment for bound modules,
        // which the sensor has, so the resolver gets to see the bad binding.
        let err = resolve(&manifest).unwrap_err();
        assert!(err.to_string().contains("no input bindings"));
    }

    #[test]
    fn sensor_without_environment_is_rejected() {
        let mut manifest = temperature_manifest();
        manifest.firmware_module[0].environment = None;

        let err = resolve(&manifest).unwrap_err();
        assert!(matches!(err, ResolveError::MissingEnvironment { .. }));
    }

    #[test]
    fn inverted_pid_bounds_are_rejected() {
        let manifest = ModuleManifest {
            firmware_module: vec![sensor_def("am2315_1", "am2315", "environment_1")],
            software_module: vec![pid_def(
                "bad_pid",
                "environment_1",
                "air_temperature",
                &[("upper_limit", -1.0), ("lower_limit", 1.0)],
            )],
        };

        let err = resolve(&manifest).unwrap_err();
        assert!(matches!(err, ResolveError::BadParameters { .. }));
        assert!(err.to_string().contains("bad_pid"));
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let mut manifest = temperature_manifest();
        manifest.software_module[0]
            .parameters
            .insert("Kp_gain".to_string(), ParamValue::Num(1.0));

        let err = resolve(&manifest).unwrap_err();
        assert!(err.to_string().contains("Kp_gain"));
    }

    #[test]
    fn pin_argument_must_be_a_non_negative_integer() {
        let mut manifest = temperature_manifest();
        manifest.firmware_module[1].arguments = vec![ArgValue::Text("GPIO17".to_string())];
        assert!(matches!(
            resolve(&manifest).unwrap_err(),
            ResolveError::BadArguments { .. }
        ));

        let mut manifest = temperature_manifest();
        manifest.firmware_module[1].arguments = vec![ArgValue::Int(-4)];
        assert!(matches!(
            resolve(&manifest).unwrap_err(),
            ResolveError::BadArguments { .. }
        ));
    }

    #[test]
    fn active_low_flag_is_decoded_and_defaults_off() {
        let mut manifest = temperature_manifest();
        manifest.firmware_module[2]
            .arguments
            .push(ArgValue::Flag(true));

        let plan = resolve(&manifest).unwrap();
        assert_eq!(
            plan.actuators()[0].kind,
            FirmwareKind::BinaryActuator {
                pin: 17,
                active_low: false
            }
        );
        assert_eq!(
            plan.actuators()[1].kind,
            FirmwareKind::BinaryActuator {
                pin: 27,
                active_low: true
            }
        );
    }

    #[test]
    fn bridge_needs_no_environment() {
        let mut manifest = temperature_manifest();
        manifest.firmware_module.push(FirmwareModuleDef {
            id: "serial_bridge_1".to_string(),
            kind: "serial_bridge".to_string(),
            environment: None,
            arguments: vec![ArgValue::Text("/dev/serial0".to_string())],
            inputs: BTreeMap::new(),
        });

        let plan = resolve(&manifest).unwrap();
        assert_eq!(plan.bridges().len(), 1);
        assert_eq!(plan.bridges()[0].port, "/dev/serial0");
    }

    #[test]
    fn duplicate_ids_fail_through_validation() {
        let mut manifest = temperature_manifest();
        manifest.software_module[0].id = "am2315_1".to_string();

        assert!(matches!(
            resolve(&manifest).unwrap_err(),
            ResolveError::Validation(_)
        ));
    }

    #[test]
    fn multi_writer_hazard_is_recorded_and_sorted() {
        let mut manifest = temperature_manifest();
        manifest.software_module.push(pid_def(
            "air_temperature_controller_2",
            "environment_1",
            "air_temperature",
            &[("setpoint", 24.0)],
        ));
        // A second humidity sensor doubles up the measured plane as well.
        manifest
            .firmware_module
            .push(sensor_def("am2315_2", "am2315", "environment_1"));

        let plan = resolve(&manifest).unwrap();
        assert_eq!(plan.hazards().len(), 3);
        let PlanHazard::MultipleWriters {
            variable, writers, ..
        } = &plan.hazards()[0];
        assert_eq!(variable, "air_humidity");
        assert_eq!(writers, &["am2315_1", "am2315_2"]);
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut manifest = temperature_manifest();
        manifest
            .firmware_module
            .push(sensor_def("mhz16_1", "mhz16", "environment_1"));
        manifest.software_module.push(direct_def(
            "light_controller_1",
            "environment_1",
            "light_illuminance",
        ));
        manifest.firmware_module.push(FirmwareModuleDef {
            id: "light_1".to_string(),
            kind: "pwm_actuator".to_string(),
            environment: Some("environment_1".to_string()),
            arguments: vec![ArgValue::Int(18)],
            inputs: BTreeMap::from([(
                "cmd".to_string(),
                InputBindingDef {
                    variable: "light_illuminance".to_string(),
                    multiplier: 1.0,
                },
            )]),
        });

        assert_eq!(resolve(&manifest).unwrap(), resolve(&manifest).unwrap());
    }

    #[test]
    fn environments_keep_first_declaration_order() {
        let manifest = ModuleManifest {
            firmware_module: vec![
                sensor_def("am2315_1", "am2315", "environment_1"),
                sensor_def("am2315_2", "am2315", "environment_2"),
            ],
            software_module: vec![
                pid_def("pid_b", "environment_2", "air_temperature", &[]),
                pid_def("pid_a1", "environment_1", "air_temperature", &[]),
                pid_def("pid_b2", "environment_2", "air_humidity", &[]),
                pid_def("pid_a2", "environment_1", "air_humidity", &[]),
            ],
        };

        let plan = resolve(&manifest).unwrap();
        let order: Vec<&str> = plan
            .controllers()
            .iter()
            .map(|c| c.module_id.as_str())
            .collect();
        assert_eq!(order, vec!["pid_b", "pid_b2", "pid_a1", "pid_a2"]);
    }

    #[test]
    fn stable_topo_keeps_order_without_edges() {
        assert_eq!(stable_topo(4, &[]), Some(vec![0, 1, 2, 3]));
    }

    #[test]
    fn stable_topo_orders_chains() {
        // 2 -> 0 -> 1, node 3 independent.
        let order = stable_topo(4, &[(2, 0), (0, 1)]).unwrap();
        let pos = |n: usize| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(2) < pos(0));
        assert!(pos(0) < pos(1));
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn stable_topo_rejects_cycles() {
        assert_eq!(stable_topo(2, &[(0, 1), (1, 0)]), None);
        assert_eq!(stable_topo(3, &[(0, 1), (1, 2), (2, 0)]), None);
    }
}
