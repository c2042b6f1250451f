use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gaze_runtime::config::EngineConfig;

use crate::demo::{DemoConfig, DemoSource};
use crate::determinism::{DEFAULT_SEED, fixture_seed};
use crate::error::{HarnessError, Result};
use crate::replay::SampleTrace;
use crate::report::write_jsonl;
use crate::scenario::{self, AutopilotOptions, RunOutcome};

#[derive(Debug, Parser)]
#[command(
    name = "gaze-harness",
    about = "Deterministic driver for the gaze interaction engine",
    version
)]
pub struct Cli {
    /// Emit logs and errors as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the guided smart-home script and print its interaction trace.
    Autopilot(AutopilotArgs),

    /// Replay a recorded JSONL sample trace into the smart-home panel.
    Replay(ReplayArgs),

    /// Drive the smart-home panel with the seeded synthetic gaze source.
    Demo(DemoArgs),

    /// Print the default engine configuration as TOML.
    #[command(name = "default-config")]
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
pub struct AutopilotArgs {
    /// Engine configuration (TOML, or JSON by extension).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show the recommendation banner at this virtual time (ms).
    #[arg(long = "recommend-at")]
    pub recommend_at_ms: Option<u64>,

    /// Stop after this much virtual time (ms).
    #[arg(long = "max-ms", default_value_t = 60_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_ms: u64,

    /// Sweep the cursor around the centre before the script starts.
    #[arg(long = "warm-up")]
    pub warm_up: bool,

    /// Write the trace here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    /// JSONL sample trace.
    pub file: PathBuf,

    /// Engine configuration (TOML, or JSON by extension).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the trace here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct DemoArgs {
    /// Virtual seconds to run.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub seconds: u64,

    /// Source seed. Falls back to GAZE_SEED, then a fixed default.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Jump to a new random fixation point every MS instead of staying on
    /// the viewport centre.
    #[arg(long = "wander", value_name = "MS")]
    pub wander_ms: Option<u64>,

    /// Engine configuration (TOML, or JSON by extension).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also save the generated samples as a replayable trace.
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Write the trace here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Autopilot(args) => run_autopilot(args),
        Commands::Replay(args) => run_replay(args),
        Commands::Demo(args) => run_demo(args),
        Commands::DefaultConfig => {
            let toml = EngineConfig::default().to_toml_string()?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(toml.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` takes an `EnvFilter` directive.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    // A subscriber may already be installed (tests); keep it.
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Exit code of an autopilot run stopped by `--max-ms`.
pub const EXIT_TIMED_OUT: i32 = 4;

fn run_autopilot(args: AutopilotArgs) -> Result<()> {
    if let Some(at) = args.recommend_at_ms.filter(|at| *at >= args.max_ms) {
        return Err(HarnessError::invalid(format!(
            "--recommend-at {at} must be earlier than --max-ms {}",
            args.max_ms
        )));
    }
    let config = load_config(args.config.as_deref())?;
    let options = AutopilotOptions {
        max_ms: args.max_ms,
        recommend_at_ms: args.recommend_at_ms,
        warm_up: args.warm_up,
    };
    let outcome = scenario::run_autopilot(config, &options);
    emit(&outcome, args.out.as_deref())?;
    if outcome.timed_out {
        return Err(HarnessError::exit(
            EXIT_TIMED_OUT,
            format!("autopilot did not finish within {} ms", args.max_ms),
        ));
    }
    Ok(())
}

fn run_replay(args: ReplayArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    require_path(&args.file)?;
    let trace = SampleTrace::load(&args.file)?;
    tracing::info!(records = trace.len(), duration_ms = trace.duration_ms(), "trace loaded");
    let outcome = scenario::run_replay(config, trace.records());
    emit(&outcome, args.out.as_deref())
}

fn run_demo(args: DemoArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let seed = args.seed.unwrap_or_else(|| fixture_seed(DEFAULT_SEED));
    let source = DemoSource::with_config(
        seed,
        DemoConfig {
            wander_ms: args.wander_ms,
            area: config.viewport.rect(),
            ..DemoConfig::default()
        },
    );
    tracing::info!(seed, seconds = args.seconds, "demo source seeded");
    if let Some(path) = &args.record {
        let records = scenario::demo_records(source.clone(), args.seconds);
        SampleTrace::from_records(records)?.save(path)?;
        tracing::info!(path = %path.display(), "demo samples recorded");
    }
    let outcome = scenario::run_demo(config, source, args.seconds);
    emit(&outcome, args.out.as_deref())
}

/// Default config, or the file at `path` (JSON by extension, else TOML),
/// validated either way.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    require_path(path)?;
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => EngineConfig::from_json_file(path)?,
        _ => EngineConfig::from_toml_file(path)?,
    };
    Ok(config.validated()?)
}

fn require_path(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(HarnessError::MissingPath {
            path: path.to_path_buf(),
        })
    }
}

/// Trace as JSONL, then one summary line.
fn emit(outcome: &RunOutcome, out: Option<&Path>) -> Result<()> {
    let mut writer: Box<dyn Write> = match out {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    write_jsonl(&mut writer, &outcome.trace)?;
    serde_json::to_writer(&mut writer, &outcome.summary())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
