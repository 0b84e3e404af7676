use std::fmt;
use std::str::FromStr;

use serde_json::json;

use super::{base_map, columns, csv_line, parse_column, tree, FieldMap, SensorRecord};
use crate::error::Result;
use crate::kind::SensorKind;

pub(super) const BATTERY_CSV_HEADER: &str =
    "timeIntervalSince1970,level,scale,temperature,voltage,plugged,status";
pub(super) const SCREEN_CSV_HEADER: &str = "timeIntervalSince1970,status";

/// Declares a closed enum with fixed lowercase text forms.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Fixed text used in every output form.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} '{other}'", stringify!($name))),
                }
            }
        }
    };
}

text_enum!(
    /// What the device is drawing power from.
    PowerSource {
        /// Running on battery.
        Unplugged => "unplugged",
        /// Mains adapter.
        Ac => "ac",
        /// USB port.
        Usb => "usb",
        /// Wireless charging pad.
        Wireless => "wireless",
    }
);

text_enum!(
    /// Charging state reported by the battery.
    ChargeStatus {
        /// State could not be determined.
        Unknown => "unknown",
        /// Charging.
        Charging => "charging",
        /// Discharging.
        Discharging => "discharging",
        /// Plugged in but not charging.
        NotCharging => "not charging",
        /// Fully charged.
        Full => "full",
    }
);

text_enum!(
    /// Display power state.
    ScreenState {
        /// Display switched off.
        Off => "screen off",
        /// Display switched on.
        On => "screen on",
        /// State could not be determined.
        Unknown => "unknown",
    }
);

/// A battery state broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryRecord {
    timestamp: i64,
    level: i32,
    scale: i32,
    temperature: i32,
    voltage: i32,
    plugged: PowerSource,
    status: ChargeStatus,
}

impl BatteryRecord {
    /// Build a battery sample.
    ///
    /// `temperature` is in tenths of a degree Celsius and `voltage` in
    /// millivolts, as reported by the platform.
    #[must_use]
    pub const fn new(
        timestamp: i64,
        level: i32,
        scale: i32,
        temperature: i32,
        voltage: i32,
        plugged: PowerSource,
        status: ChargeStatus,
    ) -> Self {
        Self {
            timestamp,
            level,
            scale,
            temperature,
            voltage,
            plugged,
            status,
        }
    }

    /// Current charge level, out of [`scale`](Self::scale).
    #[must_use]
    pub const fn level(&self) -> i32 {
        self.level
    }

    /// Maximum charge level.
    #[must_use]
    pub const fn scale(&self) -> i32 {
        self.scale
    }

    /// Battery temperature in tenths of a degree Celsius.
    #[must_use]
    pub const fn temperature(&self) -> i32 {
        self.temperature
    }

    /// Battery voltage in millivolts.
    #[must_use]
    pub const fn voltage(&self) -> i32 {
        self.voltage
    }

    /// Power source.
    #[must_use]
    pub const fn plugged(&self) -> PowerSource {
        self.plugged
    }

    /// Charging state.
    #[must_use]
    pub const fn status(&self) -> ChargeStatus {
        self.status
    }

    /// Charge as a fraction in `0.0..=1.0`, or `None` for a zero scale.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn charge_fraction(&self) -> Option<f32> {
        (self.scale > 0).then(|| self.level as f32 / self.scale as f32)
    }

    pub(super) fn from_csv(line: &str) -> Result<Self> {
        let kind = SensorKind::Battery;
        let fields = columns(kind, line, 7)?;
        Ok(Self::new(
            parse_column(kind, "timestamp", &fields[0])?,
            parse_column(kind, "level", &fields[1])?,
            parse_column(kind, "scale", &fields[2])?,
            parse_column(kind, "temperature", &fields[3])?,
            parse_column(kind, "voltage", &fields[4])?,
            parse_column(kind, "plugged", &fields[5])?,
            parse_column(kind, "status", &fields[6])?,
        ))
    }

    pub(super) fn same_reading(&self, other: &Self) -> bool {
        Self {
            timestamp: other.timestamp,
            ..*self
        } == *other
    }
}

impl SensorRecord for BatteryRecord {
    fn kind(&self) -> SensorKind {
        SensorKind::Battery
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn csv_header(&self) -> &'static str {
        BATTERY_CSV_HEADER
    }

    fn to_csv(&self) -> String {
        csv_line([
            self.timestamp.to_string(),
            self.level.to_string(),
            self.scale.to_string(),
            self.temperature.to_string(),
            self.voltage.to_string(),
            self.plugged.to_string(),
            self.status.to_string(),
        ])
    }

    fn to_json(&self) -> serde_json::Value {
        tree(
            SensorKind::Battery,
            self.timestamp,
            "battery",
            json!({
                "level": self.level,
                "scale": self.scale,
                "temperature": self.temperature,
                "voltage": self.voltage,
                "plugged": self.plugged.as_str(),
                "status": self.status.as_str(),
            }),
        )
    }

    fn to_map(&self) -> FieldMap {
        let mut map = base_map(SensorKind::Battery, self.timestamp);
        map.insert("level".into(), self.level.into());
        map.insert("scale".into(), self.scale.into());
        map.insert("temperature".into(), self.temperature.into());
        map.insert("voltage".into(), self.voltage.into());
        map.insert("plugged".into(), self.plugged.as_str().into());
        map.insert("status".into(), self.status.as_str().into());
        map
    }
}

/// A screen on/off broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenStatusRecord {
    timestamp: i64,
    status: ScreenState,
}

impl ScreenStatusRecord {
    /// Build a screen status sample.
    #[must_use]
    pub const fn new(timestamp: i64, status: ScreenState) -> Self {
        Self { timestamp, status }
    }

    /// Display state.
    #[must_use]
    pub const fn status(&self) -> ScreenState {
        self.status
    }

    pub(super) fn from_csv(line: &str) -> Result<Self> {
        let kind = SensorKind::ScreenStatus;
        let fields = columns(kind, line, 2)?;
        Ok(Self::new(
            parse_column(kind, "timestamp", &fields[0])?,
            parse_column(kind, "status", &fields[1])?,
        ))
    }

    pub(super) fn same_reading(&self, other: &Self) -> bool {
        self.status == other.status
    }
}

impl SensorRecord for ScreenStatusRecord {
    fn kind(&self) -> SensorKind {
        SensorKind::ScreenStatus
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn csv_header(&self) -> &'static str {
        SCREEN_CSV_HEADER
    }

    fn to_csv(&self) -> String {
        csv_line([self.timestamp.to_string(), self.status.to_string()])
    }

    fn to_json(&self) -> serde_json::Value {
        tree(
            SensorKind::ScreenStatus,
            self.timestamp,
            "screenStatus",
            json!({ "status": self.status.as_str() }),
        )
    }

    fn to_map(&self) -> FieldMap {
        let mut map = base_map(SensorKind::ScreenStatus, self.timestamp);
        map.insert("screenStatus".into(), self.status.as_str().into());
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    fn battery() -> BatteryRecord {
        BatteryRecord::new(
            5,
            40,
            100,
            305,
            3900,
            PowerSource::Unplugged,
            ChargeStatus::NotCharging,
        )
    }

    #[test]
    fn test_battery_text_form() {
        assert_eq!(battery().to_csv(), "5,40,100,305,3900,unplugged,not charging");
    }

    #[test]
    fn test_battery_forms_agree() {
        let record = battery();
        let tree = record.to_json();
        let map = record.to_map();
        assert_eq!(tree["battery"]["status"], json!("not charging"));
        assert_eq!(map["status"], FieldValue::Text("not charging".into()));
        assert_eq!(tree["battery"]["voltage"], json!(3900));
        assert_eq!(map["voltage"], FieldValue::Int(3900));
    }

    #[test]
    fn test_charge_fraction() {
        assert_eq!(battery().charge_fraction(), Some(0.4));
        let empty = BatteryRecord::new(0, 1, 0, 0, 0, PowerSource::Ac, ChargeStatus::Full);
        assert_eq!(empty.charge_fraction(), None);
    }

    #[test]
    fn test_screen_status_text_form() {
        let record = ScreenStatusRecord::new(77, ScreenState::Off);
        assert_eq!(record.to_csv(), "77,screen off");
        assert_eq!(
            ScreenStatusRecord::from_csv("78,screen on").unwrap().status(),
            ScreenState::On
        );
        assert!(ScreenStatusRecord::from_csv("78,dimmed").is_err());
    }
}
