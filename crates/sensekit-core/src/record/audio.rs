use serde_json::json;

use super::{base_map, columns, csv_line, parse_column, tree, FieldMap, SensorRecord};
use crate::error::Result;
use crate::kind::SensorKind;

pub(super) const CSV_HEADER: &str = "timeIntervalSince1970,level";

/// Microphone amplitude level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioLevelRecord {
    timestamp: i64,
    level: i32,
}

impl AudioLevelRecord {
    /// Build a level sample.
    #[must_use]
    pub const fn new(timestamp: i64, level: i32) -> Self {
        Self { timestamp, level }
    }

    /// Amplitude level.
    #[must_use]
    pub const fn level(&self) -> i32 {
        self.level
    }

    pub(super) fn from_csv(line: &str) -> Result<Self> {
        let kind = SensorKind::AudioLevel;
        let fields = columns(kind, line, 2)?;
        Ok(Self::new(
            parse_column(kind, "timestamp", &fields[0])?,
            parse_column(kind, "level", &fields[1])?,
        ))
    }

    pub(super) const fn same_reading(&self, other: &Self) -> bool {
        self.level == other.level
    }
}

impl SensorRecord for AudioLevelRecord {
    fn kind(&self) -> SensorKind {
        SensorKind::AudioLevel
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn csv_header(&self) -> &'static str {
        CSV_HEADER
    }

    fn to_csv(&self) -> String {
        csv_line([self.timestamp.to_string(), self.level.to_string()])
    }

    fn to_json(&self) -> serde_json::Value {
        tree(
            SensorKind::AudioLevel,
            self.timestamp,
            "audioLevel",
            json!({ "level": self.level }),
        )
    }

    fn to_map(&self) -> FieldMap {
        let mut map = base_map(SensorKind::AudioLevel, self.timestamp);
        map.insert("audioLevel".into(), self.level.into());
        map
    }
}
