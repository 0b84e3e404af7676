//! Immutable, timestamped sensor records and their three output forms.
//!
//! A [`Record`] is one measurement (or one scan batch) produced by a sensor.
//! Every variant implements [`SensorRecord`], which yields:
//!
//! - a delimited text line (CSV) beginning with the timestamp, plus a header
//! - a structured tree ([`serde_json::Value`]) nesting the kind-specific
//!   fields under a named key, next to `sensorType` and `sensorTypeString`
//! - a flat key-value map ([`FieldMap`]) with the same logical fields
//!
//! All forms are derived from the record's own fields. Floats in the text form
//! use the shortest decimal that reads back to the same value, with a `.`
//! separator regardless of locale.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Result, SensingError};
use crate::kind::{KindFamily, SensorKind};

mod audio;
mod bluetooth;
mod motion;
mod scalar;
mod system;

pub use audio::AudioLevelRecord;
pub use bluetooth::{BluetoothScanRecord, PeerReading};
pub use motion::MotionRecord;
pub use scalar::ScalarRecord;
pub use system::{BatteryRecord, ChargeStatus, PowerSource, ScreenState, ScreenStatusRecord};

/// Header column shared by every text form.
pub const TIMESTAMP_COLUMN: &str = "timeIntervalSince1970";

/// Value stored in the flat map form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer field.
    Int(i64),
    /// Floating point field, kept at the precision it was sampled with.
    Float(f32),
    /// Text field.
    Text(String),
    /// Absent optional field.
    Null,
    /// Nested collection of sub-readings.
    List(Vec<FieldMap>),
}

/// The flat key-value form of a record.
pub type FieldMap = BTreeMap<String, FieldValue>;

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Null, Self::from)
    }
}

/// Serialization capability shared by every record kind.
pub trait SensorRecord {
    /// Kind of sensor that produced the record.
    fn kind(&self) -> SensorKind;

    /// Capture time in milliseconds since the Unix epoch.
    fn timestamp(&self) -> i64;

    /// Header line describing the columns of [`to_csv`](Self::to_csv).
    fn csv_header(&self) -> &'static str;

    /// Delimited text form, starting with the timestamp.
    fn to_csv(&self) -> String;

    /// Structured tree form.
    fn to_json(&self) -> Value;

    /// Flat key-value form.
    fn to_map(&self) -> FieldMap;
}

/// One immutable measurement produced by a sensor.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Three-axis motion sample.
    Motion(MotionRecord),
    /// Single float environmental or counter sample.
    Scalar(ScalarRecord),
    /// Microphone level sample.
    AudioLevel(AudioLevelRecord),
    /// Battery state broadcast.
    Battery(BatteryRecord),
    /// Screen on/off broadcast.
    ScreenStatus(ScreenStatusRecord),
    /// Completed proximity scan batch.
    Bluetooth(BluetoothScanRecord),
}

impl Record {
    fn inner(&self) -> &dyn SensorRecord {
        match self {
            Self::Motion(r) => r,
            Self::Scalar(r) => r,
            Self::AudioLevel(r) => r,
            Self::Battery(r) => r,
            Self::ScreenStatus(r) => r,
            Self::Bluetooth(r) => r,
        }
    }

    /// Header of the text form for `kind`, without needing a record.
    #[must_use]
    pub const fn csv_header_for(kind: SensorKind) -> &'static str {
        match kind.family() {
            KindFamily::Motion => motion::CSV_HEADER,
            KindFamily::Scalar => scalar::csv_header(kind),
            KindFamily::AudioLevel => audio::CSV_HEADER,
            KindFamily::SystemState => match kind {
                SensorKind::Battery => system::BATTERY_CSV_HEADER,
                _ => system::SCREEN_CSV_HEADER,
            },
            KindFamily::ProximityScan => bluetooth::CSV_HEADER,
        }
    }

    /// Parses a single-line text form back into a record of `kind`.
    ///
    /// Scan batches do not carry their batch timestamp in text form; use
    /// [`BluetoothScanRecord::from_csv`] for those.
    ///
    /// # Errors
    ///
    /// Returns [`SensingError::RecordParse`] if the line does not match the
    /// kind's column layout.
    pub fn from_csv(kind: SensorKind, line: &str) -> Result<Self> {
        match kind.family() {
            KindFamily::Motion => MotionRecord::from_csv(kind, line).map(Self::Motion),
            KindFamily::Scalar => ScalarRecord::from_csv(kind, line).map(Self::Scalar),
            KindFamily::AudioLevel => AudioLevelRecord::from_csv(line).map(Self::AudioLevel),
            KindFamily::SystemState => match kind {
                SensorKind::Battery => BatteryRecord::from_csv(line).map(Self::Battery),
                _ => ScreenStatusRecord::from_csv(line).map(Self::ScreenStatus),
            },
            KindFamily::ProximityScan => Err(parse_error(
                kind,
                "scan batches need their batch timestamp; use BluetoothScanRecord::from_csv",
            )),
        }
    }

    /// Returns `true` if both records carry the same kind and payload,
    /// regardless of when they were captured.
    #[must_use]
    pub fn same_reading(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Motion(a), Self::Motion(b)) => a.same_reading(b),
            (Self::Scalar(a), Self::Scalar(b)) => a.same_reading(b),
            (Self::AudioLevel(a), Self::AudioLevel(b)) => a.same_reading(b),
            (Self::Battery(a), Self::Battery(b)) => a.same_reading(b),
            (Self::ScreenStatus(a), Self::ScreenStatus(b)) => a.same_reading(b),
            (Self::Bluetooth(a), Self::Bluetooth(b)) => a.same_reading(b),
            _ => false,
        }
    }
}

impl SensorRecord for Record {
    fn kind(&self) -> SensorKind {
        self.inner().kind()
    }

    fn timestamp(&self) -> i64 {
        self.inner().timestamp()
    }

    fn csv_header(&self) -> &'static str {
        self.inner().csv_header()
    }

    fn to_csv(&self) -> String {
        self.inner().to_csv()
    }

    fn to_json(&self) -> Value {
        self.inner().to_json()
    }

    fn to_map(&self) -> FieldMap {
        self.inner().to_map()
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Record {
                fn from(record: $ty) -> Self {
                    Self::$variant(record)
                }
            }
        )*
    };
}

impl_from_variant!(
    Motion => MotionRecord,
    Scalar => ScalarRecord,
    AudioLevel => AudioLevelRecord,
    Battery => BatteryRecord,
    ScreenStatus => ScreenStatusRecord,
    Bluetooth => BluetoothScanRecord,
);

// =============================================================================
// SHARED FORMAT HELPERS
// =============================================================================

/// Tree form envelope: kind tag, kind name, timestamp and the nested body.
fn tree(kind: SensorKind, timestamp: i64, key: &str, body: Value) -> Value {
    let mut object = Map::new();
    object.insert("sensorType".into(), json!(kind.id()));
    object.insert("sensorTypeString".into(), json!(kind.name()));
    object.insert("timestamp".into(), json!(timestamp));
    object.insert(key.into(), body);
    Value::Object(object)
}

/// Map form envelope: kind tag, kind name and timestamp.
fn base_map(kind: SensorKind, timestamp: i64) -> FieldMap {
    let mut map = FieldMap::new();
    map.insert("sensorType".into(), FieldValue::Int(i64::from(kind.id())));
    map.insert("sensorTypeString".into(), kind.name().into());
    map.insert("timestamp".into(), FieldValue::Int(timestamp));
    map
}

/// Shortest decimal that parses back to the same `f32`, always with a `.`.
fn format_float(value: f32) -> String {
    format!("{value}")
}

/// Writes one text line from already formatted columns, quoting as needed.
fn csv_line<I, T>(fields: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    if writer.write_record(fields).is_err() {
        return String::new();
    }
    let bytes = writer.into_inner().unwrap_or_default();
    let mut line = String::from_utf8(bytes).unwrap_or_default();
    if line.ends_with('\n') {
        line.pop();
    }
    line
}

/// Reads every non-blank row of `text`.
fn read_rows(kind: SensorKind, text: &str) -> Result<Vec<csv::StringRecord>> {
    let mut rows = Vec::new();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    for row in reader.records() {
        let row = row.map_err(|e| parse_error(kind, e.to_string()))?;
        if row.len() == 1 && row[0].trim().is_empty() {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Reads a single row from `line` and checks the column count.
fn columns(kind: SensorKind, line: &str, expected: usize) -> Result<csv::StringRecord> {
    let mut rows = read_rows(kind, line)?;
    if rows.len() != 1 {
        return Err(parse_error(
            kind,
            format!("expected one line, found {}", rows.len()),
        ));
    }
    let fields = rows.remove(0);
    if fields.len() != expected {
        return Err(parse_error(
            kind,
            format!("expected {expected} columns, found {}", fields.len()),
        ));
    }
    Ok(fields)
}

fn parse_column<T: std::str::FromStr>(kind: SensorKind, name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| parse_error(kind, format!("invalid {name} '{raw}'")))
}

fn parse_error(kind: SensorKind, message: impl Into<String>) -> SensingError {
    SensingError::RecordParse {
        kind,
        message: message.into(),
    }
}

fn wrong_kind(kind: SensorKind, family: &'static str) -> SensingError {
    SensingError::WrongRecordKind { kind, family }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<Record> {
        vec![
            MotionRecord::new(SensorKind::Accelerometer, 1_000, 0.5, -9.81, 0.0)
                .unwrap()
                .into(),
            ScalarRecord::new(SensorKind::Light, 1_001, 320.25).unwrap().into(),
            AudioLevelRecord::new(1_002, 55).into(),
            BatteryRecord::new(
                1_003,
                80,
                100,
                291,
                4012,
                PowerSource::Usb,
                ChargeStatus::Charging,
            )
            .into(),
            ScreenStatusRecord::new(1_004, ScreenState::On).into(),
            BluetoothScanRecord::new(
                1_005,
                vec![PeerReading::new(990, Some("Pixel, 8".into()), "AA:BB:CC:DD:EE:FF", -61)],
            )
            .into(),
        ]
    }

    #[test]
    fn test_text_form_starts_with_timestamp() {
        for record in sample_records() {
            let line = record.to_csv();
            let first = line.split(',').next().unwrap();
            // scan batches lead with the per-peer discovery time
            let expected = match &record {
                Record::Bluetooth(batch) => batch.devices()[0].timestamp(),
                _ => record.timestamp(),
            };
            assert_eq!(first, expected.to_string(), "{line}");
            assert!(record.csv_header().starts_with(TIMESTAMP_COLUMN));
        }
    }

    #[test]
    fn test_header_column_count_matches_line() {
        for record in sample_records() {
            let kind = record.kind();
            let header = read_rows(kind, record.csv_header()).unwrap()[0].len();
            let line = read_rows(kind, &record.to_csv()).unwrap()[0].len();
            assert_eq!(header, line, "{kind}");
            assert_eq!(Record::csv_header_for(kind), record.csv_header());
        }
    }

    #[test]
    fn test_tree_and_map_carry_kind_tag_and_timestamp() {
        for record in sample_records() {
            let tree = record.to_json();
            let map = record.to_map();
            let kind = record.kind();

            assert_eq!(tree["sensorType"], json!(kind.id()));
            assert_eq!(tree["sensorTypeString"], json!(kind.name()));
            assert_eq!(tree["timestamp"], json!(record.timestamp()));
            assert_eq!(map["sensorType"], FieldValue::Int(i64::from(kind.id())));
            assert_eq!(map["sensorTypeString"], FieldValue::Text(kind.name().into()));
            assert_eq!(map["timestamp"], FieldValue::Int(record.timestamp()));
        }
    }

    #[test]
    fn test_text_form_parses_back() {
        for record in sample_records() {
            let parsed = match &record {
                Record::Bluetooth(batch) => {
                    BluetoothScanRecord::from_csv(batch.timestamp(), &batch.to_csv())
                        .map(Record::from)
                        .unwrap()
                }
                _ => Record::from_csv(record.kind(), &record.to_csv()).unwrap(),
            };
            assert_eq!(parsed, record);
        }
    }

    #[test]
    fn test_bluetooth_requires_batch_timestamp() {
        let err = Record::from_csv(SensorKind::Bluetooth, "1,a,b,-1").unwrap_err();
        assert!(matches!(err, SensingError::RecordParse { .. }));
    }

    #[test]
    fn test_same_reading_ignores_timestamp() {
        let a: Record = AudioLevelRecord::new(1, 10).into();
        let b: Record = AudioLevelRecord::new(2, 10).into();
        let c: Record = AudioLevelRecord::new(3, 11).into();
        let d: Record = ScalarRecord::new(SensorKind::Light, 1, 10.0).unwrap().into();

        assert!(a.same_reading(&b));
        assert!(!a.same_reading(&c));
        assert!(!a.same_reading(&d));
    }

    #[test]
    fn test_text_columns_are_quoted_when_needed() {
        let raw = "say \"hi\", then leave";
        let line = csv_line(["1", raw, "x"]);
        assert_eq!(line, "1,\"say \"\"hi\"\", then leave\",x");
        let row = columns(SensorKind::Bluetooth, &line, 3).unwrap();
        assert_eq!(&row[1], raw);
        assert_eq!(csv_line(["2", "", "y"]), "2,,y");
    }

    #[test]
    fn test_columns_rejects_wrong_shape() {
        let kind = SensorKind::Light;
        assert!(columns(kind, "1,2,3", 2).is_err());
        assert!(columns(kind, "1,2\n3,4", 2).is_err());
        assert!(columns(kind, "", 2).is_err());
        assert_eq!(columns(kind, "1,2\r\n", 2).unwrap().len(), 2);
    }

    #[test]
    #[allow(clippy::excessive_precision)]
    fn test_float_text_is_shortest_round_trip() {
        assert_eq!(format_float(1.0), "1");
        assert_eq!(format_float(-0.125), "-0.125");
        assert_eq!(format_float(1e-7), "0.0000001");

        for value in [1e-7_f32, 0.012_345_678, f32::MAX, f32::MIN_POSITIVE, -3.25, 9.81] {
            let parsed: f32 = format_float(value).parse().unwrap();
            assert_eq!(parsed.to_bits(), value.to_bits(), "{value}");
        }
    }

    #[test]
    #[allow(clippy::excessive_precision)]
    fn test_awkward_floats_survive_the_text_form() {
        let record: Record = MotionRecord::new(SensorKind::Gyroscope, 1, 0.012_345_678, 1e-7, 3.0)
            .unwrap()
            .into();
        assert!(record.to_csv().ends_with(",0.0000001,3"));
        let parsed = Record::from_csv(SensorKind::Gyroscope, &record.to_csv()).unwrap();
        assert!(parsed.same_reading(&record));

        let record: Record = ScalarRecord::new(SensorKind::AirPressure, 2, f32::MAX).unwrap().into();
        let parsed = Record::from_csv(SensorKind::AirPressure, &record.to_csv()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_map_serializes_flat() {
        let record: Record = AudioLevelRecord::new(7, 42).into();
        let json = serde_json::to_value(record.to_map()).unwrap();
        assert_eq!(
            json,
            json!({
                "audioLevel": 42,
                "sensorType": 10,
                "sensorTypeString": "Audio Level",
                "timestamp": 7
            })
        );
    }
}
