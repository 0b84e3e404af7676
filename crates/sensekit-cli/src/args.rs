//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use sensekit_core::{OutputFormat, SensorKind, SessionConfig};

/// Stream simulated sensor records to stdout.
#[derive(Debug, Parser)]
#[command(name = "sensekit", version, about, long_about = None)]
pub struct Args {
    /// Session configuration file [default: per-user config directory]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format: csv, json or map (overrides the configuration file)
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Sensor kind to enable; repeat for several (overrides the configuration file)
    #[arg(long = "kind", value_name = "KIND")]
    pub kinds: Vec<SensorKind>,

    /// How long to run, in milliseconds
    #[arg(long, default_value_t = 5_000)]
    pub duration_ms: u64,

    /// Time between synthetic readings, in milliseconds
    #[arg(long, default_value_t = 250, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Use production logging (JSON files plus compact stderr)
    #[arg(long)]
    pub production: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Configuration file to load.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(SessionConfig::default_path)
    }

    /// Apply command-line overrides to `session`.
    pub fn apply(&self, session: &mut SessionConfig) {
        if let Some(format) = self.format {
            session.output = format;
        }
        if !self.kinds.is_empty() {
            session.enabled.clone_from(&self.kinds);
        }
    }

    /// Total run time.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Tick interval for the feeds.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
