//! The closed set of sensor kinds.
//!
//! Every record, configuration and sensor is tagged with a [`SensorKind`].
//! The numeric id and display name are part of the serialization contract
//! and must never change for an existing kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SensingError;

/// Category of measurement a sensor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SensorKind {
    /// Acceleration including gravity, three axes.
    Accelerometer = 0,
    /// Direction and magnitude of gravity, three axes.
    Gravity = 1,
    /// Acceleration excluding gravity, three axes.
    LinearAcceleration = 2,
    /// Rate of rotation, three axes.
    Gyroscope = 3,
    /// Ambient geomagnetic field, three axes.
    Magnetometer = 4,
    /// Ambient air temperature in degrees Celsius.
    AmbientTemperature = 5,
    /// Ambient light level in lux.
    Light = 6,
    /// Ambient air pressure in hPa.
    AirPressure = 7,
    /// Relative ambient humidity in percent.
    Humidity = 8,
    /// Steps taken since the counter was last reset.
    StepCounter = 9,
    /// Microphone amplitude level.
    AudioLevel = 10,
    /// Battery charge and power source.
    Battery = 11,
    /// Display on/off transitions.
    ScreenStatus = 12,
    /// Nearby Bluetooth peers discovered per scan window.
    Bluetooth = 13,
}

/// Group of kinds sharing one record layout and one settings shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindFamily {
    /// Three-axis float samples.
    Motion,
    /// One float value per sample.
    Scalar,
    /// One integer level per sample.
    AudioLevel,
    /// Device state broadcasts (battery, screen).
    SystemState,
    /// Repeating discovery scans yielding peer batches.
    ProximityScan,
}

/// How raw device callbacks turn into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    /// Every raw reading immediately produces one record.
    Continuous,
    /// Raw events accumulate until a batch-complete signal yields one record.
    ScanBatch,
}

impl SensorKind {
    /// Every kind, ordered by id.
    pub const ALL: [Self; 14] = [
        Self::Accelerometer,
        Self::Gravity,
        Self::LinearAcceleration,
        Self::Gyroscope,
        Self::Magnetometer,
        Self::AmbientTemperature,
        Self::Light,
        Self::AirPressure,
        Self::Humidity,
        Self::StepCounter,
        Self::AudioLevel,
        Self::Battery,
        Self::ScreenStatus,
        Self::Bluetooth,
    ];

    /// Stable numeric tag used in the tree and map forms.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Looks up a kind by its numeric tag.
    #[must_use]
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Human-readable name, emitted as `sensorTypeString`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Accelerometer => "Accelerometer",
            Self::Gravity => "Gravity",
            Self::LinearAcceleration => "Linear Acceleration",
            Self::Gyroscope => "Gyroscope",
            Self::Magnetometer => "Magnetometer",
            Self::AmbientTemperature => "Ambient Temperature",
            Self::Light => "Light",
            Self::AirPressure => "Air Pressure",
            Self::Humidity => "Humidity",
            Self::StepCounter => "Step Counter",
            Self::AudioLevel => "Audio Level",
            Self::Battery => "Battery",
            Self::ScreenStatus => "Screen Status",
            Self::Bluetooth => "Bluetooth",
        }
    }

    /// Snake-case key used in configuration files and on the command line.
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::Accelerometer => "accelerometer",
            Self::Gravity => "gravity",
            Self::LinearAcceleration => "linear_acceleration",
            Self::Gyroscope => "gyroscope",
            Self::Magnetometer => "magnetometer",
            Self::AmbientTemperature => "ambient_temperature",
            Self::Light => "light",
            Self::AirPressure => "air_pressure",
            Self::Humidity => "humidity",
            Self::StepCounter => "step_counter",
            Self::AudioLevel => "audio_level",
            Self::Battery => "battery",
            Self::ScreenStatus => "screen_status",
            Self::Bluetooth => "bluetooth",
        }
    }

    /// Record layout and settings shape shared with related kinds.
    #[must_use]
    pub const fn family(self) -> KindFamily {
        match self {
            Self::Accelerometer
            | Self::Gravity
            | Self::LinearAcceleration
            | Self::Gyroscope
            | Self::Magnetometer => KindFamily::Motion,
            Self::AmbientTemperature
            | Self::Light
            | Self::AirPressure
            | Self::Humidity
            | Self::StepCounter => KindFamily::Scalar,
            Self::AudioLevel => KindFamily::AudioLevel,
            Self::Battery | Self::ScreenStatus => KindFamily::SystemState,
            Self::Bluetooth => KindFamily::ProximityScan,
        }
    }

    /// Reading discipline of this kind.
    #[must_use]
    pub const fn discipline(self) -> Discipline {
        match self.family() {
            KindFamily::ProximityScan => Discipline::ScanBatch,
            _ => Discipline::Continuous,
        }
    }

    /// Returns `true` for kinds that accumulate raw events into batches.
    #[inline]
    #[must_use]
    pub const fn is_scan_batch(self) -> bool {
        matches!(self.discipline(), Discipline::ScanBatch)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorKind {
    type Err = SensingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.config_key() == wanted)
            .ok_or_else(|| SensingError::ConfigValidation {
                field: "kind".to_string(),
                message: format!("unknown sensor kind '{s}'"),
            })
    }
}
