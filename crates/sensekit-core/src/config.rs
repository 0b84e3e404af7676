//! Per-sensor configuration.
//!
//! A [`SensorConfig`] is bound to exactly one [`SensorKind`] and carries the
//! settings shape of that kind's family. It is a plain value: sensors hand
//! out copies, so a caller mutating what it read can never affect a running
//! sensor.

use serde::{Deserialize, Serialize};

use crate::dispatch::{AcceptAll, RecordFilter, UnchangedFilter};
use crate::error::{Result, SensingError};
use crate::kind::{KindFamily, SensorKind};

/// Sample rates the audio level sensor accepts.
pub const SUPPORTED_AUDIO_SAMPLE_RATES: [u32; 5] = [8_000, 11_025, 16_000, 22_050, 44_100];

/// Weakest signal strength a radio can report.
pub const MIN_RSSI_DBM: i16 = -127;

/// How often a continuous sensor should deliver readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingRate {
    /// As fast as the hardware allows.
    Fastest,
    /// Suitable for games.
    Game,
    /// Suitable for user-interface updates.
    Ui,
    /// Suitable for orientation changes.
    #[default]
    Normal,
    /// An explicit period between samples.
    Custom {
        /// Microseconds between samples; must be positive.
        micros: u32,
    },
}

impl SamplingRate {
    /// Requested period between samples in microseconds.
    #[must_use]
    pub const fn period_micros(self) -> u32 {
        match self {
            Self::Fastest => 0,
            Self::Game => 20_000,
            Self::Ui => 66_667,
            Self::Normal => 200_000,
            Self::Custom { micros } => micros,
        }
    }

    fn validate(self, field: &str, errors: &mut Vec<SensingError>) {
        if let Self::Custom { micros: 0 } = self {
            errors.push(invalid(field, "custom sampling period must be positive"));
        }
    }
}

/// Settings for three-axis motion sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Requested delivery rate.
    pub sampling_rate: SamplingRate,
}

/// Settings for single-value environmental sensors and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalarSettings {
    /// Requested delivery rate.
    pub sampling_rate: SamplingRate,
    /// Drop a reading identical to the previously delivered one.
    pub suppress_unchanged: bool,
}

impl Default for ScalarSettings {
    fn default() -> Self {
        Self {
            sampling_rate: SamplingRate::Normal,
            suppress_unchanged: true,
        }
    }
}

/// Settings for the microphone level sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioLevelSettings {
    /// Capture sample rate in Hz.
    pub sample_rate_hz: u32,
    /// Drop a level identical to the previously delivered one.
    pub suppress_unchanged: bool,
}

impl Default for AudioLevelSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: 8_000,
            suppress_unchanged: false,
        }
    }
}

/// Settings for broadcast-driven system state sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStateSettings {
    /// Drop a broadcast identical to the previously delivered one.
    pub suppress_unchanged: bool,
}

impl Default for SystemStateSettings {
    fn default() -> Self {
        Self {
            suppress_unchanged: true,
        }
    }
}

/// Settings for repeating proximity scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityScanSettings {
    /// Begin the next scan as soon as a batch completes.
    pub rearm_scan: bool,
    /// Ignore peers weaker than this signal strength (dBm).
    pub rssi_floor_dbm: Option<i16>,
}

impl Default for ProximityScanSettings {
    fn default() -> Self {
        Self {
            rearm_scan: true,
            rssi_floor_dbm: None,
        }
    }
}

/// Family-specific settings carried by a [`SensorConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settings {
    /// Motion family.
    Motion(MotionSettings),
    /// Scalar family.
    Scalar(ScalarSettings),
    /// Audio level.
    AudioLevel(AudioLevelSettings),
    /// Battery and screen status.
    SystemState(SystemStateSettings),
    /// Bluetooth scans.
    ProximityScan(ProximityScanSettings),
}

impl Settings {
    /// Default settings for the family of `kind`.
    #[must_use]
    pub fn default_for(kind: SensorKind) -> Self {
        match kind.family() {
            KindFamily::Motion => Self::Motion(MotionSettings::default()),
            KindFamily::Scalar => Self::Scalar(ScalarSettings::default()),
            KindFamily::AudioLevel => Self::AudioLevel(AudioLevelSettings::default()),
            KindFamily::SystemState => Self::SystemState(SystemStateSettings::default()),
            KindFamily::ProximityScan => Self::ProximityScan(ProximityScanSettings::default()),
        }
    }

    /// Family these settings apply to.
    #[must_use]
    pub const fn family(&self) -> KindFamily {
        match self {
            Self::Motion(_) => KindFamily::Motion,
            Self::Scalar(_) => KindFamily::Scalar,
            Self::AudioLevel(_) => KindFamily::AudioLevel,
            Self::SystemState(_) => KindFamily::SystemState,
            Self::ProximityScan(_) => KindFamily::ProximityScan,
        }
    }

    /// Appends every out-of-range value to `errors`, with field names
    /// prefixed by `prefix`.
    pub(crate) fn collect_errors(&self, prefix: &str, errors: &mut Vec<SensingError>) {
        match self {
            Self::Motion(s) => s
                .sampling_rate
                .validate(&format!("{prefix}sampling_rate"), errors),
            Self::Scalar(s) => s
                .sampling_rate
                .validate(&format!("{prefix}sampling_rate"), errors),
            Self::AudioLevel(s) => {
                if !SUPPORTED_AUDIO_SAMPLE_RATES.contains(&s.sample_rate_hz) {
                    errors.push(invalid(
                        &format!("{prefix}sample_rate_hz"),
                        &format!(
                            "{} Hz is not supported (expected one of {:?})",
                            s.sample_rate_hz, SUPPORTED_AUDIO_SAMPLE_RATES
                        ),
                    ));
                }
            }
            Self::SystemState(_) => {}
            Self::ProximityScan(s) => {
                if let Some(floor) = s.rssi_floor_dbm {
                    if !(MIN_RSSI_DBM..=0).contains(&floor) {
                        errors.push(invalid(
                            &format!("{prefix}rssi_floor_dbm"),
                            &format!("{floor} dBm is outside {MIN_RSSI_DBM}..=0"),
                        ));
                    }
                }
            }
        }
    }

    const fn suppress_unchanged(&self) -> bool {
        match self {
            Self::Scalar(s) => s.suppress_unchanged,
            Self::AudioLevel(s) => s.suppress_unchanged,
            Self::SystemState(s) => s.suppress_unchanged,
            Self::Motion(_) | Self::ProximityScan(_) => false,
        }
    }
}

/// Validated settings bound to one sensor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorConfig {
    kind: SensorKind,
    settings: Settings,
}

impl SensorConfig {
    /// Bind `settings` to `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SensingError::ConfigValidation`] if the settings belong to a
    /// different family than `kind`, or
    /// [`SensingError::MultipleValidationErrors`] if several values are out of
    /// range.
    pub fn new(kind: SensorKind, settings: Settings) -> Result<Self> {
        let config = Self { kind, settings };
        config.validate()?;
        Ok(config)
    }

    /// Defaults for `kind`.
    #[must_use]
    pub fn default_for(kind: SensorKind) -> Self {
        Self {
            kind,
            settings: Settings::default_for(kind),
        }
    }

    /// Kind this configuration is bound to.
    #[must_use]
    pub const fn kind(&self) -> SensorKind {
        self.kind
    }

    /// The family settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Proximity scan settings, if this is a scan configuration.
    #[must_use]
    pub const fn proximity_scan(&self) -> Option<&ProximityScanSettings> {
        match &self.settings {
            Settings::ProximityScan(s) => Some(s),
            _ => None,
        }
    }

    /// Requested sampling rate for continuous kinds that have one.
    #[must_use]
    pub const fn sampling_rate(&self) -> Option<SamplingRate> {
        match &self.settings {
            Settings::Motion(s) => Some(s.sampling_rate),
            Settings::Scalar(s) => Some(s.sampling_rate),
            _ => None,
        }
    }

    /// Check that the settings fit the kind and every value is in range.
    ///
    /// # Errors
    ///
    /// Returns the single validation error, or all of them wrapped in
    /// [`SensingError::MultipleValidationErrors`].
    pub fn validate(&self) -> Result<()> {
        if self.settings.family() != self.kind.family() {
            return Err(invalid(
                "settings",
                &format!(
                    "{:?} settings cannot configure a {} sensor",
                    self.settings.family(),
                    self.kind
                ),
            ));
        }
        let mut errors = Vec::new();
        self.settings.collect_errors("", &mut errors);
        into_result(errors)
    }

    /// The accept/reject hook a sensor installs with this configuration.
    ///
    /// Scan batches are always accepted; kinds configured to suppress
    /// unchanged readings drop a record equal to the last accepted one.
    #[must_use]
    pub fn default_filter(&self) -> Box<dyn RecordFilter> {
        if !self.kind.is_scan_batch() && self.settings.suppress_unchanged() {
            Box::new(UnchangedFilter::default())
        } else {
            Box::new(AcceptAll)
        }
    }
}

pub(crate) fn invalid(field: &str, message: &str) -> SensingError {
    SensingError::ConfigValidation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

pub(crate) fn into_result(mut errors: Vec<SensingError>) -> Result<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(SensingError::MultipleValidationErrors(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AudioLevelRecord, Record};

    #[test]
    fn test_defaults_validate_for_every_kind() {
        for kind in SensorKind::ALL {
            let config = SensorConfig::default_for(kind);
            assert_eq!(config.kind(), kind);
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_rejects_settings_from_another_family() {
        let err = SensorConfig::new(
            SensorKind::Light,
            Settings::Motion(MotionSettings::default()),
        )
        .unwrap_err();
        assert!(matches!(err, SensingError::ConfigValidation { ref field, .. } if field == "settings"));
    }

    #[test]
    fn test_rejects_unsupported_audio_rate() {
        let err = SensorConfig::new(
            SensorKind::AudioLevel,
            Settings::AudioLevel(AudioLevelSettings {
                sample_rate_hz: 12_345,
                suppress_unchanged: false,
            }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("12345 Hz"));
    }

    #[test]
    fn test_rejects_zero_custom_period_and_positive_rssi_floor() {
        assert!(SensorConfig::new(
            SensorKind::Gyroscope,
            Settings::Motion(MotionSettings {
                sampling_rate: SamplingRate::Custom { micros: 0 },
            }),
        )
        .is_err());
        assert!(SensorConfig::new(
            SensorKind::Bluetooth,
            Settings::ProximityScan(ProximityScanSettings {
                rearm_scan: true,
                rssi_floor_dbm: Some(5),
            }),
        )
        .is_err());
    }

    #[test]
    fn test_sampling_rate_periods() {
        assert_eq!(SamplingRate::Fastest.period_micros(), 0);
        assert_eq!(SamplingRate::Normal.period_micros(), 200_000);
        assert_eq!(SamplingRate::Custom { micros: 5 }.period_micros(), 5);
    }

    #[test]
    fn test_default_filter_follows_suppress_unchanged() {
        let record: Record = AudioLevelRecord::new(1, 3).into();
        let repeat: Record = AudioLevelRecord::new(2, 3).into();

        let mut passthrough = SensorConfig::default_for(SensorKind::AudioLevel).default_filter();
        assert!(passthrough.accept(&record));
        assert!(passthrough.accept(&repeat));

        let suppressing = SensorConfig::new(
            SensorKind::AudioLevel,
            Settings::AudioLevel(AudioLevelSettings {
                suppress_unchanged: true,
                ..AudioLevelSettings::default()
            }),
        )
        .unwrap();
        let mut filter = suppressing.default_filter();
        assert!(filter.accept(&record));
        assert!(!filter.accept(&repeat));
    }

    #[test]
    fn test_settings_toml_shape() {
        let settings: ScalarSettings = toml::from_str(
            r#"
            suppress_unchanged = false
            sampling_rate = { custom = { micros = 5000 } }
            "#,
        )
        .unwrap();
        assert!(!settings.suppress_unchanged);
        assert_eq!(settings.sampling_rate, SamplingRate::Custom { micros: 5000 });
    }
}
