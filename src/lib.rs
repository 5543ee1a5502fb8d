//! Linecount: directional line-crossing counts for tracked objects.
//!
//! Linecount takes the per-frame output of an object detector and tracker
//! (an identity, a class and a position for every object) and counts how
//! many objects of each class cross a virtual line in each direction. It
//! keeps a running inventory per class and raises an alarm when a class
//! goes over its configured capacity.
//!
//! # Modules
//!
//! - [`counting`]: the counter itself (geometry, track store, crossing
//!   evaluation, inventory, event sinks)
//! - [`config`]: YAML configuration with command-line overrides
//! - [`input`]: readers for recorded tracker output (CSV, JSON)
//! - [`report`]: CSV event report and end-of-run summary
//! - [`error`]: Error types for linecount operations

pub mod config;
pub mod counting;
pub mod error;
pub mod input;
pub mod report;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{parse_class_assignment, CounterConfig};
use counting::{Capacity, LineCounter, LogSink, Orientation};
use input::InputFormat;
use report::{CsvReport, RunSummary};

pub use error::LinecountError;

/// The linecount CLI application.
#[derive(Parser)]
#[command(name = "linecount")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). Overrides RUST_LOG.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Count line crossings in a recorded track file.
    Count(CountArgs),
    /// Print the effective configuration as YAML.
    Config(CounterArgs),
}

/// Counter settings shared by `count` and `config`.
#[derive(clap::Args)]
struct CounterArgs {
    /// YAML configuration file. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Line orientation ('vertical' or 'horizontal').
    #[arg(long)]
    orientation: Option<String>,

    /// Line position as a fraction of the frame width (vertical) or height
    /// (horizontal), in [0, 1].
    #[arg(long = "line-pos")]
    line_pos: Option<f64>,

    /// Swap IN and OUT.
    #[arg(long)]
    invert: bool,

    /// Class capacity, e.g. 'car=40' or 'bus=unlimited'. Repeatable; adds
    /// the class if it is not configured.
    #[arg(long = "capacity", value_name = "CLASS=N")]
    capacity: Vec<String>,

    /// Starting inventory for a class, e.g. 'car=12'. Repeatable.
    #[arg(long = "initial", value_name = "CLASS=N")]
    initial: Vec<String>,

    /// Frames a track may go unseen before it is forgotten.
    #[arg(long)]
    timeout: Option<u64>,

    /// Flag tracks that move more than this many pixels in one step.
    #[arg(long = "max-jump", value_name = "PX")]
    max_jump: Option<f64>,
}

impl CounterArgs {
    /// Loads the config file (or defaults) and applies flag overrides.
    fn resolve(&self) -> Result<CounterConfig, LinecountError> {
        let mut config = match &self.config {
            Some(path) => CounterConfig::load(path)?,
            None => CounterConfig::default(),
        };

        if let Some(orientation) = &self.orientation {
            config.line.orientation = orientation.parse::<Orientation>()?;
        }
        if let Some(position) = self.line_pos {
            config.line.position = position;
        }
        if self.invert {
            config.line.invert = true;
        }
        for arg in &self.capacity {
            let (class, value) = parse_class_assignment(arg)?;
            config.set_capacity(class, value.parse::<Capacity>()?);
        }
        for arg in &self.initial {
            let (class, value) = parse_class_assignment(arg)?;
            let initial = value.parse::<i64>().map_err(|_| {
                LinecountError::InvalidConfig(format!(
                    "initial inventory '{}' is not an integer",
                    value
                ))
            })?;
            config.set_initial_inventory(class, initial);
        }
        if let Some(timeout) = self.timeout {
            config.track_timeout_frames = timeout;
        }
        if let Some(jump) = self.max_jump {
            config.max_jump_px = Some(jump);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Arguments for the count subcommand.
#[derive(clap::Args)]
struct CountArgs {
    /// Track file to replay.
    input: PathBuf,

    /// Input format ('csv' or 'json'). Inferred from the extension if omitted.
    #[arg(long)]
    format: Option<String>,

    #[command(flatten)]
    counter: CounterArgs,

    /// Write a CSV event report into this directory.
    #[arg(long = "csv-dir")]
    csv_dir: Option<PathBuf>,

    /// Report file name, without extension. Defaults to the input file stem.
    #[arg(long = "csv-name", requires = "csv_dir")]
    csv_name: Option<String>,

    /// Output format for the summary ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,

    /// Exit non-zero if any observation produced a warning.
    #[arg(long)]
    strict: bool,
}

/// Run the linecount CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LinecountError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Count(args)) => run_count(args),
        Some(Commands::Config(args)) => run_config(args),
        None => {
            println!("linecount {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Directional line-crossing counter for tracked objects.");
            println!();
            println!("Run 'linecount --help' for usage information.");
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays clean for the summary.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_config(args: CounterArgs) -> Result<(), LinecountError> {
    let config = args.resolve()?;
    print!("{}", config.to_yaml_string()?);
    Ok(())
}

/// Execute the count subcommand.
fn run_count(args: CountArgs) -> Result<(), LinecountError> {
    let json_output = match args.output.as_str() {
        "text" => false,
        "json" => true,
        other => {
            return Err(LinecountError::UnsupportedFormat(format!(
                "output '{}' (supported: text, json)",
                other
            )));
        }
    };

    let config = args.counter.resolve()?;
    let format = match &args.format {
        Some(name) => InputFormat::from_name(name)?,
        None => InputFormat::from_path(&args.input)?,
    };
    let frames = input::read_frames(&args.input, format)?;
    let source = source_name(&args.input);

    let mut counter = LineCounter::new(config)?;
    let mut report = match &args.csv_dir {
        Some(dir) => {
            let name = args
                .csv_name
                .clone()
                .unwrap_or_else(|| default_report_name(&args.input));
            Some(CsvReport::create(
                dir,
                &name,
                counter.config().line,
                source.clone(),
                &counter.snapshot(),
            )?)
        }
        None => None,
    };

    info!(source = %source, frames = frames.len(), "counting started");

    let mut warnings = Vec::new();
    for frame in &frames {
        let outcome = match report.as_mut() {
            Some(report) => counter.process_frame(frame, &mut (LogSink, report)),
            None => counter.process_frame(frame, &mut LogSink),
        };
        warnings.extend(outcome.warnings);
    }

    let final_inventory = counter.snapshot();
    let report_path = match report {
        Some(report) => {
            let path = report.path().display().to_string();
            report.finish(&final_inventory)?;
            Some(path)
        }
        None => None,
    };

    let stats = counter.stats();
    info!(
        frames = stats.frames,
        crossings = stats.crossings,
        warnings = stats.warnings,
        "counting finished"
    );

    let summary = RunSummary {
        source,
        line: counter.config().line,
        stats,
        active_tracks: counter.active_tracks(),
        inventory: final_inventory,
        warnings,
        report_path,
    };

    if json_output {
        let json = serde_json::to_string_pretty(&summary).map_err(LinecountError::SummaryJson)?;
        println!("{}", json);
    } else {
        print!("{}", summary);
    }

    if args.strict && summary.warning_count() > 0 {
        return Err(LinecountError::StrictWarnings {
            warning_count: summary.warning_count(),
        });
    }
    Ok(())
}

fn source_name(input: &Path) -> String {
    input
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| input.display().to_string())
}

fn default_report_name(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "report".to_string())
}
