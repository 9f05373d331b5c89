use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crossing_config::CrossingConfig;
use crossing_core::{AgentSpec, Direction};
use crossing_simulator::{load_records, ConsoleSink, Simulation, SimulationReport};
use crossing_telemetry::{EventLogger, MetricsRecorder};

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "crossing", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the simulation for a record file
    Run(RunArgs),
    /// Validate a record file and list the agents without running them
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Record file, one `<symbol> <preparation> <usage>` line per agent
    pub input: PathBuf,

    /// Configuration file (defaults to config/crossing.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Real milliseconds per tick
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=60_000))]
    pub tick_ms: Option<u64>,

    /// Direction preferred before the first grant
    #[arg(long)]
    pub default_direction: Option<Direction>,

    /// Write a YAML report of the run to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    pub metrics: bool,

    /// Suppress transition lines on stdout
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Record file to validate
    pub input: PathBuf,

    /// Configuration file (defaults to config/crossing.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Check(args) => check(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<CrossingConfig, CliError> {
    let config = match path {
        Some(path) => CrossingConfig::load_from_path(path)?,
        None => CrossingConfig::load()?,
    };
    Ok(config)
}

fn apply_overrides(config: &mut CrossingConfig, args: &RunArgs) {
    if let Some(tick_ms) = args.tick_ms {
        config.simulation.tick_ms = tick_ms;
    }
    if let Some(direction) = args.default_direction {
        config.simulation.default_direction = direction;
    }
}

pub fn run(args: RunArgs) -> Result<(), CliError> {
    run_to(args, Box::new(std::io::stdout()))
}

/// Runs the simulation, writing transition lines to `out`.
fn run_to(args: RunArgs, out: Box<dyn Write + Send>) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    EventLogger::init(&config.telemetry.log_level);

    // Records are fully validated before any thread exists.
    let specs = load_records(&args.input, config.simulation.max_agents)?;
    info!(
        agents = specs.len(),
        tick_ms = config.simulation.tick_ms,
        default_direction = %config.simulation.default_direction,
        "Starting simulation"
    );

    let console = config.telemetry.console_events && !args.quiet;
    let mut sink = ConsoleSink::with_writer(&specs, console.then_some(out));
    let metrics = if args.metrics {
        let recorder = MetricsRecorder::new()?;
        sink = sink.with_metrics(recorder.clone());
        Some(recorder)
    } else {
        None
    };
    let sink = Arc::new(sink);

    let outcome = Simulation::new(specs.clone(), &config.simulation).run(sink.clone())?;

    if let Some(path) = &args.report {
        SimulationReport::new(&specs, sink.events(), outcome).write_yaml(path)?;
    }
    if let Some(metrics) = metrics {
        print!("{}", metrics.gather_metrics()?);
    }
    Ok(())
}

pub fn check(args: CheckArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    EventLogger::init(&config.telemetry.log_level);

    let specs = load_records(&args.input, config.simulation.max_agents)?;
    if specs.is_empty() {
        warn!(input = %args.input.display(), "No agents in input");
    }
    for spec in &specs {
        println!("{}", describe(spec));
    }
    println!("{} agent(s) OK", specs.len());
    Ok(())
}

fn describe(spec: &AgentSpec) -> String {
    format!(
        "Agent {:>2} {} {:<4} {:<9} preparation {} usage {}",
        spec.id,
        spec.symbol(),
        spec.direction.label(),
        spec.priority.label(),
        spec.preparation,
        spec.usage
    )
}
