use clap::{Parser, Subcommand};
use pt_firmware::SimBackend;
use pt_runtime::{
    Runtime, RuntimeError, RuntimeOptions, RuntimeResult, SchedulerOptions, SetpointSource, resolve,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pt-cli")]
#[command(about = "Phytotron CLI - environmental control runtime", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate manifest file syntax and structure
    Validate {
        /// Path to the manifest YAML file
        manifest_path: PathBuf,
    },
    /// Resolve a manifest and print its execution plan
    Plan {
        /// Path to the manifest YAML file
        manifest_path: PathBuf,
    },
    /// Run the control loop against the simulated backend
    Run {
        /// Path to the manifest YAML file
        manifest_path: PathBuf,
        /// Control cycle period in milliseconds
        #[arg(long, default_value_t = 1000)]
        period_ms: u64,
        /// Run duration in seconds
        #[arg(long, default_value_t = 60.0)]
        duration_s: f64,
        /// Fail-safe window in seconds (defaults to the scheduler's)
        #[arg(long)]
        failsafe_s: Option<f64>,
        /// Operator setpoint as ENVIRONMENT/VARIABLE=VALUE (repeatable)
        #[arg(long = "setpoint", value_parser = parse_setpoint)]
        setpoint: Vec<SetpointArg>,
    },
}

/// Operator setpoint parsed from ENVIRONMENT/VARIABLE=VALUE.
#[derive(Debug, Clone)]
struct SetpointArg {
    environment: String,
    variable: String,
    value: f64,
}

fn parse_setpoint(raw: &str) -> Result<SetpointArg, String> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ENVIRONMENT/VARIABLE=VALUE, got '{}'", raw))?;
    let (environment, variable) = path
        .split_once('/')
        .ok_or_else(|| format!("expected ENVIRONMENT/VARIABLE=VALUE, got '{}'", raw))?;
    if environment.is_empty() || variable.is_empty() {
        return Err(format!("expected ENVIRONMENT/VARIABLE=VALUE, got '{}'", raw));
    }
    let value: f64 = value
        .parse()
        .map_err(|_| format!("setpoint value '{}' is not a number", value))?;
    Ok(SetpointArg {
        environment: environment.to_string(),
        variable: variable.to_string(),
        value,
    })
}

fn main() -> RuntimeResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { manifest_path } => cmd_validate(&manifest_path),
        Commands::Plan { manifest_path } => cmd_plan(&manifest_path),
        Commands::Run {
            manifest_path,
            period_ms,
            duration_s,
            failsafe_s,
            setpoint,
        } => cmd_run(&manifest_path, period_ms, duration_s, failsafe_s, &setpoint),
    }
}

fn cmd_validate(manifest_path: &Path) -> RuntimeResult<()> {
    println!("Validating manifest: {}", manifest_path.display());
    let manifest = pt_manifest::load_yaml(manifest_path)?;
    let plan = resolve(&manifest)?;
    println!("✓ Manifest is valid and resolvable");
    println!("  Firmware modules: {}", manifest.firmware_module.len());
    println!("  Software modules: {}", manifest.software_module.len());
    for hazard in plan.hazards() {
        println!("  Warning: {}", hazard);
    }
    Ok(())
}

fn cmd_plan(manifest_path: &Path) -> RuntimeResult<()> {
    let manifest = pt_manifest::load_yaml(manifest_path)?;
    let plan = resolve(&manifest)?;

    println!("Execution plan: {}", manifest_path.display());

    println!("\nEnvironments:");
    for (_, name) in plan.envs().iter() {
        println!("  {}", name);
    }

    if !plan.bridges().is_empty() {
        println!("\nBridges:");
        for bridge in plan.bridges() {
            println!("  {} on {}", bridge.module_id, bridge.port);
        }
    }

    println!("\nSensors:");
    for sensor in plan.sensors() {
        let env = plan.env_name(sensor.env)?;
        let vars: Vec<&str> = sensor
            .outputs
            .iter()
            .map(|key| plan.var_name(key.var))
            .collect::<Result<_, _>>()?;
        println!(
            "  {} ({}) -> {}: {} every {:?}",
            sensor.module_id,
            sensor.kind.type_name(),
            env,
            vars.join(", "),
            sensor.poll_interval
        );
    }

    println!("\nControllers (evaluation order):");
    for controller in plan.controllers() {
        let env = plan.env_name(controller.env)?;
        let output = plan.var_name(controller.output.var)?;
        let setpoint = match controller.setpoint {
            SetpointSource::Fixed(value) => format!("fixed {}", value),
            SetpointSource::Desired(_) => "operator desired".to_string(),
        };
        let measurement = match &controller.measurement {
            Some(binding) => format!(
                "{} (fresh within {:?})",
                plan.var_name(binding.key.var)?,
                binding.max_age
            ),
            None => "none".to_string(),
        };
        println!(
            "  {} ({}) in {}: measures {}, commands {}, setpoint {}",
            controller.module_id,
            controller.kind.type_name(),
            env,
            measurement,
            output,
            setpoint
        );
    }

    println!("\nActuators:");
    for actuator in plan.actuators() {
        let env = plan.env_name(actuator.env)?;
        let source = plan.var_name(actuator.source.var)?;
        println!(
            "  {} ({}) <- {}/{} x {}",
            actuator.module_id,
            actuator.kind.type_name(),
            env,
            source,
            actuator.multiplier
        );
    }

    if !plan.hazards().is_empty() {
        println!("\nHazards:");
        for hazard in plan.hazards() {
            println!("  {}", hazard);
        }
    }

    Ok(())
}

fn cmd_run(
    manifest_path: &Path,
    period_ms: u64,
    duration_s: f64,
    failsafe_s: Option<f64>,
    setpoints: &[SetpointArg],
) -> RuntimeResult<()> {
    if !duration_s.is_finite() || duration_s <= 0.0 {
        return Err(RuntimeError::InvalidArg {
            what: "run duration must be positive",
        });
    }
    if let Some(failsafe_s) = failsafe_s
        && (!failsafe_s.is_finite() || failsafe_s <= 0.0)
    {
        return Err(RuntimeError::InvalidArg {
            what: "fail-safe window must be positive",
        });
    }

    println!("Loading manifest: {}", manifest_path.display());
    let manifest = pt_manifest::load_yaml(manifest_path)?;

    let mut scheduler = SchedulerOptions {
        period: Duration::from_millis(period_ms),
        ..SchedulerOptions::default()
    };
    if let Some(failsafe_s) = failsafe_s {
        scheduler.failsafe_after = Duration::from_secs_f64(failsafe_s);
    }
    let options = RuntimeOptions {
        scheduler,
        ..RuntimeOptions::default()
    };

    let backend = SimBackend::new();
    let mut runtime = Runtime::build(&manifest, &backend, options)?;

    for hazard in runtime.plan().hazards() {
        println!("  Warning: {}", hazard);
    }
    for setpoint in setpoints {
        runtime.set_desired(&setpoint.environment, &setpoint.variable, setpoint.value)?;
        println!(
            "  Setpoint: {}/{} = {}",
            setpoint.environment, setpoint.variable, setpoint.value
        );
    }

    println!(
        "Running control loop for {:.1} s (period {} ms)",
        duration_s, period_ms
    );
    let summary = runtime.run(Some(Duration::from_secs_f64(duration_s)))?;

    println!("✓ Run complete");
    println!("  Cycles: {}", summary.cycles);
    println!("  Writes: {}", summary.writes);
    println!("  Holds:  {}", summary.holds);
    println!("  Faults: {}", summary.faults);

    Ok(())
}
