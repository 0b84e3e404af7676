use serde_json::json;

use super::{
    base_map, columns, csv_line, format_float, parse_column, tree, wrong_kind, FieldMap,
    SensorRecord,
};
use crate::error::Result;
use crate::kind::{KindFamily, SensorKind};

/// Column names and keys of a scalar kind.
struct Layout {
    header: &'static str,
    column: &'static str,
    tree_key: &'static str,
    map_key: &'static str,
}

const fn layout(kind: SensorKind) -> Layout {
    match kind {
        SensorKind::AmbientTemperature => Layout {
            header: "timeIntervalSince1970,temperature",
            column: "temperature",
            tree_key: "ambientTemperature",
            map_key: "temperature",
        },
        SensorKind::AirPressure => Layout {
            header: "timeIntervalSince1970,pressure",
            column: "pressure",
            tree_key: "airPressure",
            map_key: "pressure",
        },
        SensorKind::Humidity => Layout {
            header: "timeIntervalSince1970,humidity",
            column: "humidity",
            tree_key: "humidity",
            map_key: "humidity",
        },
        SensorKind::StepCounter => Layout {
            header: "timeIntervalSince1970,steps",
            column: "steps",
            tree_key: "stepCounter",
            map_key: "steps",
        },
        _ => Layout {
            header: "timeIntervalSince1970,lux",
            column: "lux",
            tree_key: "light",
            map_key: "light",
        },
    }
}

pub(super) const fn csv_header(kind: SensorKind) -> &'static str {
    layout(kind).header
}

/// A single float sample from an environmental sensor or counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarRecord {
    kind: SensorKind,
    timestamp: i64,
    value: f32,
}

impl ScalarRecord {
    /// Build a sample for one of the scalar kinds.
    ///
    /// # Errors
    ///
    /// Returns [`WrongRecordKind`](crate::SensingError::WrongRecordKind) if
    /// `kind` is not a scalar kind.
    pub fn new(kind: SensorKind, timestamp: i64, value: f32) -> Result<Self> {
        if kind.family() != KindFamily::Scalar {
            return Err(wrong_kind(kind, "scalar"));
        }
        Ok(Self {
            kind,
            timestamp,
            value,
        })
    }

    /// The measured value, in the kind's unit.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }

    pub(super) fn from_csv(kind: SensorKind, line: &str) -> Result<Self> {
        let fields = columns(kind, line, 2)?;
        Self::new(
            kind,
            parse_column(kind, "timestamp", &fields[0])?,
            parse_column(kind, layout(kind).column, &fields[1])?,
        )
    }

    pub(super) fn same_reading(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

impl SensorRecord for ScalarRecord {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn csv_header(&self) -> &'static str {
        layout(self.kind).header
    }

    fn to_csv(&self) -> String {
        csv_line([self.timestamp.to_string(), format_float(self.value)])
    }

    fn to_json(&self) -> serde_json::Value {
        let layout = layout(self.kind);
        tree(
            self.kind,
            self.timestamp,
            layout.tree_key,
            json!({ layout.column: self.value }),
        )
    }

    fn to_map(&self) -> FieldMap {
        let mut map = base_map(self.kind, self.timestamp);
        map.insert(layout(self.kind).map_key.into(), self.value.into());
        map
    }
}
