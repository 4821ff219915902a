use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Default number of nearby airspaces returned by point queries.
pub const DEFAULT_NEAR_COUNT: usize = 5;


/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub airspaces: PathBuf,
    pub flights: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub heights_in_feet: bool,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default = "default_true")]
    pub progress: bool,
    #[serde(default = "default_near_count")]
    pub near_count: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    /// Config file the settings were read from.
    #[serde(skip)]
    pub source: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_near_count() -> usize {
    DEFAULT_NEAR_COUNT
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Loads `config/default.toml` only, ignoring local overrides, the
/// environment and the command line.
pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");

    let mut config = read_config_file(&default_config_file, false)?;
    config.source = default_config_file;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the local (or default) config file, then `AIRGRAPH_*` environment
/// variables, then the command line arguments.
pub fn load_config(args: &CliArgs) -> Result<Settings> {
    let root = retrieve_project_root()?;

    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    let config_file = match &args.config {
        Some(path) => path.clone(),
        None if local_config.exists() => local_config,
        None => default_config_file,
    };

    let mut config = read_config_file(&config_file, true)?;
    config.source = config_file;

    apply_overrides(&mut config, args);
    validate_config(&config)?;

    Ok(config)
}

fn read_config_file(path: &Path, with_env: bool) -> Result<Settings> {
    let mut builder = Config::builder().add_source(File::from(path).required(true));
    if with_env {
        builder = builder.add_source(Environment::with_prefix("airgraph"));
    }
    let settings = builder
        .build()
        .with_context(|| format!("error loading configuration {}", path.display()))?;

    settings
        .try_deserialize()
        .with_context(|| format!("error deserializing configuration {}", path.display()))
}

fn apply_overrides(config: &mut Settings, args: &CliArgs) {
    if let Some(airspaces) = &args.airspaces {
        config.airspaces = airspaces.clone();
    }
    if let Some(flights) = &args.flights {
        config.flights = flights.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if args.feet {
        config.heights_in_feet = true;
    }
    if args.sequential {
        config.parallel = false;
    }
    if args.quiet {
        config.progress = false;
    }
    if let Some(near) = args.near {
        config.near_count = near;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if args.log_json {
        config.log_json = true;
    }
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the AIRGRAPH_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any
///    of its parents, use it.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("AIRGRAPH_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    // Fallback: walk upward from the executable directory
    let exe_path = env::current_exe().context("failed to get current executable path")?;
    exe_path
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("config").is_dir())
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("could not find project root directory"))
}

fn validate_config(config: &Settings) -> Result<()> {
    if config.near_count == 0 {
        bail!("near_count must be greater than 0");
    }
    if config.airspaces.as_os_str().is_empty() {
        bail!("an airspace catalog path is required");
    }
    if config.flights.as_os_str().is_empty() {
        bail!("a flights path is required");
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "airgraph - airspace hand-off counting")]
pub struct CliArgs {
    /// Config file to read instead of config/local.toml or config/default.toml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Airspace catalog: a feature collection with `wkt`, `lower_limit` and
    /// `upper_limit` properties (limits in feet).
    #[arg(short, long)]
    pub airspaces: Option<PathBuf>,

    /// Flights file: `{"flights": [[[x, y, height], ...], ...]}`.
    #[arg(short, long)]
    pub flights: Option<PathBuf>,

    /// Output path prefix. The extension follows the output format.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format for the transition matrix.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Heights are already in feet rather than metres.
    #[arg(long)]
    pub feet: bool,

    /// Process flights on a single thread.
    #[arg(long)]
    pub sequential: bool,

    /// Hide the progress bar.
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of nearby airspaces to report for --point.
    #[arg(long)]
    pub near: Option<usize>,

    /// Report the airspaces at and near a point instead of processing flights.
    /// Format: x,y,height
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub point: Option<[f64; 3]>,

    /// Log filter, e.g. `info` or `airgraph=debug`. RUST_LOG takes precedence.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    pub log_json: bool,
}

/// Parse a point in the format "x,y,height"
fn parse_point(s: &str) -> Result<[f64; 3], String> {
    let values: Vec<&str> = s.split(',').map(str::trim).collect();
    if values.len() != 3 {
        return Err(format!(
            "Invalid point format: '{}'. Expected 'x,y,height'",
            s
        ));
    }

    let mut point = [0.0; 3];
    for (slot, value) in point.iter_mut().zip(&values) {
        *slot = value
            .parse::<f64>()
            .map_err(|_| format!("Failed to parse coordinate: {}", value))?;
    }

    Ok(point)
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings ({}):
  - Airspaces: {}
  - Flights: {}
  - Output: {} ({:?})
  - Heights in feet: {}
  - Parallel: {}
  - Near count: {}
  ",
            self.source.display(),
            self.airspaces.display(),
            self.flights.display(),
            self.output.display(),
            self.format,
            self.heights_in_feet,
            self.parallel,
            self.near_count,
        )
    }
}
