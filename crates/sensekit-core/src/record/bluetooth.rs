use serde_json::{json, Value};

use super::{
    base_map, csv_line, parse_column, parse_error, read_rows, tree, FieldMap, FieldValue,
    SensorRecord,
};
use crate::error::Result;
use crate::kind::SensorKind;

pub(super) const CSV_HEADER: &str = "timeIntervalSince1970,name,address,rssi";

/// One peer seen during a scan window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerReading {
    timestamp: i64,
    name: Option<String>,
    address: String,
    rssi: i16,
}

impl PeerReading {
    /// Build a peer sighting captured at `timestamp`.
    ///
    /// An empty advertised name is stored as no name, since the text form
    /// cannot tell the two apart.
    pub fn new(
        timestamp: i64,
        name: Option<String>,
        address: impl Into<String>,
        rssi: i16,
    ) -> Self {
        Self {
            timestamp,
            name: name.filter(|name| !name.is_empty()),
            address: address.into(),
            rssi,
        }
    }

    /// When the peer was discovered.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Advertised name, if the peer broadcast one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Hardware address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Signal strength in dBm.
    #[must_use]
    pub const fn rssi(&self) -> i16 {
        self.rssi
    }

    fn to_csv(&self) -> String {
        csv_line([
            self.timestamp.to_string().as_str(),
            self.name.as_deref().unwrap_or_default(),
            self.address.as_str(),
            self.rssi.to_string().as_str(),
        ])
    }

    fn to_json(&self) -> Value {
        json!({
            "timestamp": self.timestamp,
            "name": self.name,
            "address": self.address,
            "rssi": self.rssi,
        })
    }

    fn to_map(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert("timestamp".into(), FieldValue::Int(self.timestamp));
        map.insert("name".into(), self.name.as_deref().into());
        map.insert("address".into(), self.address.as_str().into());
        map.insert("rssi".into(), i32::from(self.rssi).into());
        map
    }
}

/// Every peer found during one completed scan window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BluetoothScanRecord {
    timestamp: i64,
    devices: Vec<PeerReading>,
}

impl BluetoothScanRecord {
    /// Build a batch completed at `timestamp`.
    #[must_use]
    pub const fn new(timestamp: i64, devices: Vec<PeerReading>) -> Self {
        Self { timestamp, devices }
    }

    /// Peers in discovery order.
    #[must_use]
    pub fn devices(&self) -> &[PeerReading] {
        &self.devices
    }

    /// Number of peers in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` if the scan found nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Parses the text form of a batch completed at `timestamp`.
    ///
    /// The text form has one row per peer and does not carry the batch
    /// completion time, so it must be supplied. A quoted name may span lines.
    /// Empty text yields an empty batch.
    ///
    /// # Errors
    ///
    /// Returns [`RecordParse`](crate::SensingError::RecordParse) if any row
    /// does not have four valid columns.
    pub fn from_csv(timestamp: i64, text: &str) -> Result<Self> {
        let kind = SensorKind::Bluetooth;
        let devices = read_rows(kind, text)?
            .iter()
            .map(|fields| {
                if fields.len() != 4 {
                    return Err(parse_error(
                        kind,
                        format!("expected 4 columns, found {}", fields.len()),
                    ));
                }
                Ok(PeerReading::new(
                    parse_column(kind, "timestamp", &fields[0])?,
                    Some(fields[1].to_owned()),
                    &fields[2],
                    parse_column(kind, "rssi", &fields[3])?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(timestamp, devices))
    }

    pub(super) fn same_reading(&self, other: &Self) -> bool {
        self.devices == other.devices
    }
}

impl SensorRecord for BluetoothScanRecord {
    fn kind(&self) -> SensorKind {
        SensorKind::Bluetooth
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn csv_header(&self) -> &'static str {
        CSV_HEADER
    }

    fn to_csv(&self) -> String {
        self.devices
            .iter()
            .map(PeerReading::to_csv)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn to_json(&self) -> Value {
        let devices: Vec<Value> = self.devices.iter().map(PeerReading::to_json).collect();
        tree(
            SensorKind::Bluetooth,
            self.timestamp,
            "bluetooth",
            json!({ "devices": devices }),
        )
    }

    fn to_map(&self) -> FieldMap {
        let mut map = base_map(SensorKind::Bluetooth, self.timestamp);
        map.insert(
            "devices".into(),
            FieldValue::List(self.devices.iter().map(PeerReading::to_map).collect()),
        );
        map
    }
}
