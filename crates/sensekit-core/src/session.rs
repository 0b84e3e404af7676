//! Session configuration file.
//!
//! Handles loading, saving, and validating the settings a sensing session
//! starts from:
//! - Which sensor kinds to enable
//! - Family settings applied to every enabled kind of that family
//! - Output format for delivered records
//! - Where the binary writes its log files
//!
//! Values come from a TOML file, overridden by `SENSEKIT_`-prefixed
//! environment variables with `__` between nested keys:
//!
//! ```text
//! SENSEKIT_ENABLED=light,bluetooth
//! SENSEKIT_OUTPUT=json
//! SENSEKIT_SCALAR__SUPPRESS_UNCHANGED=false
//! SENSEKIT_LOGGING__DIRECTORY=/tmp/sensekit-logs
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{
    into_result, invalid, AudioLevelSettings, MotionSettings, ProximityScanSettings,
    ScalarSettings, SensorConfig, Settings, SystemStateSettings,
};
use crate::error::{Result, SensingError};
use crate::kind::{KindFamily, SensorKind};

/// How delivered records are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One text line per record, with a header per kind.
    #[default]
    Csv,
    /// One JSON object per line.
    Json,
    /// The key-value map, as JSON.
    Map,
}

impl OutputFormat {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = SensingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "map" => Ok(Self::Map),
            other => Err(invalid(
                "output",
                &format!("unknown output format '{other}' (expected csv, json or map)"),
            )),
        }
    }
}

/// Log output for the binary running a session.
///
/// Only consulted in production mode; development logs go to stderr alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Directory for rolling log files. The platform default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Filter directive used when neither `RUST_LOG` nor
    /// `SENSEKIT_LOG_LEVEL` is set, e.g. `"debug"` or `"sensekit_core=trace"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Everything a sensing session is started from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Kinds to create sensors for.
    pub enabled: Vec<SensorKind>,

    /// Output format for records.
    pub output: OutputFormat,

    /// Settings for every motion kind.
    pub motion: MotionSettings,

    /// Settings for every scalar kind.
    pub scalar: ScalarSettings,

    /// Settings for the audio level sensor.
    pub audio_level: AudioLevelSettings,

    /// Settings for battery and screen status.
    pub system_state: SystemStateSettings,

    /// Settings for Bluetooth scans.
    pub proximity_scan: ProximityScanSettings,

    /// Log file location and default level.
    pub logging: LogSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: vec![
                SensorKind::Accelerometer,
                SensorKind::Light,
                SensorKind::AudioLevel,
                SensorKind::Battery,
                SensorKind::Bluetooth,
            ],
            output: OutputFormat::default(),
            motion: MotionSettings::default(),
            scalar: ScalarSettings::default(),
            audio_level: AudioLevelSettings::default(),
            system_state: SystemStateSettings::default(),
            proximity_scan: ProximityScanSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Load from `path` layered under the environment.
    ///
    /// A missing file is not an error; defaults fill every absent value.
    ///
    /// # Errors
    ///
    /// Returns [`SensingError::ConfigParse`] if the file or an environment
    /// value cannot be parsed, or a validation error if a value is out of
    /// range.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: &Path, env: Environment) -> Result<Self> {
        let session: Self = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()?;
        session.validate()?;
        debug!(
            path = %path.display(),
            enabled = session.enabled.len(),
            output = %session.output,
            "session configuration loaded"
        );
        Ok(session)
    }

    /// Load from [`default_path`](Self::default_path), falling back to
    /// defaults if that fails.
    #[must_use]
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        Self::load(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "using default session configuration");
            Self::default()
        })
    }

    /// Write as TOML to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Per-user configuration file location.
    #[must_use]
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "sensekit").map_or_else(
            || PathBuf::from("sensekit.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }

    /// Check every value, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns the single validation error, or all of them wrapped in
    /// [`SensingError::MultipleValidationErrors`].
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for kind in &self.enabled {
            if !seen.insert(*kind) {
                errors.push(invalid(
                    "enabled",
                    &format!("{} is listed more than once", kind.config_key()),
                ));
            }
        }

        Settings::Motion(self.motion).collect_errors("motion.", &mut errors);
        Settings::Scalar(self.scalar).collect_errors("scalar.", &mut errors);
        Settings::AudioLevel(self.audio_level).collect_errors("audio_level.", &mut errors);
        Settings::SystemState(self.system_state).collect_errors("system_state.", &mut errors);
        Settings::ProximityScan(self.proximity_scan)
            .collect_errors("proximity_scan.", &mut errors);

        into_result(errors)
    }

    /// The configuration this session gives a sensor of `kind`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the family settings are out of range.
    pub fn sensor_config(&self, kind: SensorKind) -> Result<SensorConfig> {
        let settings = match kind.family() {
            KindFamily::Motion => Settings::Motion(self.motion),
            KindFamily::Scalar => Settings::Scalar(self.scalar),
            KindFamily::AudioLevel => Settings::AudioLevel(self.audio_level),
            KindFamily::SystemState => Settings::SystemState(self.system_state),
            KindFamily::ProximityScan => Settings::ProximityScan(self.proximity_scan),
        };
        SensorConfig::new(kind, settings)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SENSEKIT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("enabled")
}
