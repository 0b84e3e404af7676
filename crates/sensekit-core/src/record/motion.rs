use serde_json::json;

use super::{
    base_map, columns, csv_line, format_float, parse_column, tree, wrong_kind, FieldMap,
    SensorRecord,
};
use crate::error::Result;
use crate::kind::{KindFamily, SensorKind};

pub(super) const CSV_HEADER: &str = "timeIntervalSince1970,x,y,z";

/// A three-axis sample from a motion sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionRecord {
    kind: SensorKind,
    timestamp: i64,
    x: f32,
    y: f32,
    z: f32,
}

impl MotionRecord {
    /// Build a sample for one of the motion kinds.
    ///
    /// # Errors
    ///
    /// Returns [`WrongRecordKind`](crate::SensingError::WrongRecordKind) if
    /// `kind` is not a motion kind.
    pub fn new(kind: SensorKind, timestamp: i64, x: f32, y: f32, z: f32) -> Result<Self> {
        if kind.family() != KindFamily::Motion {
            return Err(wrong_kind(kind, "motion"));
        }
        Ok(Self {
            kind,
            timestamp,
            x,
            y,
            z,
        })
    }

    /// X-axis value.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Y-axis value.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Z-axis value.
    #[must_use]
    pub const fn z(&self) -> f32 {
        self.z
    }

    pub(super) fn from_csv(kind: SensorKind, line: &str) -> Result<Self> {
        let fields = columns(kind, line, 4)?;
        Self::new(
            kind,
            parse_column(kind, "timestamp", &fields[0])?,
            parse_column(kind, "x", &fields[1])?,
            parse_column(kind, "y", &fields[2])?,
            parse_column(kind, "z", &fields[3])?,
        )
    }

    pub(super) fn same_reading(&self, other: &Self) -> bool {
        self.kind == other.kind && self.x == other.x && self.y == other.y && self.z == other.z
    }
}

const fn tree_key(kind: SensorKind) -> &'static str {
    match kind {
        SensorKind::Gravity => "gravity",
        SensorKind::LinearAcceleration => "linearAcceleration",
        SensorKind::Gyroscope => "gyroscope",
        SensorKind::Magnetometer => "magnetometer",
        _ => "accelerometer",
    }
}

impl SensorRecord for MotionRecord {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn csv_header(&self) -> &'static str {
        CSV_HEADER
    }

    fn to_csv(&self) -> String {
        csv_line([
            self.timestamp.to_string(),
            format_float(self.x),
            format_float(self.y),
            format_float(self.z),
        ])
    }

    fn to_json(&self) -> serde_json::Value {
        tree(
            self.kind,
            self.timestamp,
            tree_key(self.kind),
            json!({ "x": self.x, "y": self.y, "z": self.z }),
        )
    }

    fn to_map(&self) -> FieldMap {
        let mut map = base_map(self.kind, self.timestamp);
        map.insert("x".into(), self.x.into());
        map.insert("y".into(), self.y.into());
        map.insert("z".into(), self.z.into());
        map
    }
}
