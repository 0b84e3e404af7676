//! The interface between a sensor and the platform facility behind it.
//!
//! A [`SensorDriver`] is the only thing a [`Sensor`](crate::Sensor) knows
//! about the device. The sensor calls [`register`](SensorDriver::register)
//! on start and [`unregister`](SensorDriver::unregister) on stop; in between,
//! the driver pushes raw events through the [`EventSink`] it was given,
//! typically from a platform notification thread.

use std::sync::Weak;

use thiserror::Error;

use crate::config::SensorConfig;
use crate::record::{ChargeStatus, PowerSource, ScreenState};
use crate::sensor::SensorCore;

/// Whether the sensing facility can be used right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Present and enabled.
    Available,
    /// Not present on this device.
    Missing,
    /// Present but switched off; the reason is shown to the caller.
    Disabled(String),
}

impl Availability {
    /// Returns `true` if the facility can be used.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Why the facility cannot be used, or `None` if it can.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Available => None,
            Self::Missing => Some("sensing facility is not present on this device".to_string()),
            Self::Disabled(why) => Some(format!("sensing facility is disabled: {why}")),
        }
    }
}

/// Errors reported by drivers.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// Registering for updates was refused by the platform.
    #[error("Registration refused: {0}")]
    RegistrationRefused(String),

    /// A scan could not be started.
    #[error("Scan failed to start: {0}")]
    ScanFailed(String),
}

/// One raw reading from a continuous sensor.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReading {
    /// Three-axis sample.
    Axes {
        /// X-axis value.
        x: f32,
        /// Y-axis value.
        y: f32,
        /// Z-axis value.
        z: f32,
    },
    /// Single float value.
    Scalar(f32),
    /// Integer level.
    Level(i32),
    /// Battery broadcast.
    Battery {
        /// Charge level.
        level: i32,
        /// Maximum charge level.
        scale: i32,
        /// Temperature in tenths of a degree Celsius.
        temperature: i32,
        /// Voltage in millivolts.
        voltage: i32,
        /// Power source.
        plugged: PowerSource,
        /// Charging state.
        status: ChargeStatus,
    },
    /// Screen broadcast.
    Screen(ScreenState),
}

/// One peer sighting during a scan window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPeer {
    /// Advertised name, if any.
    pub name: Option<String>,
    /// Hardware address.
    pub address: String,
    /// Signal strength in dBm.
    pub rssi: i16,
}

/// Anything a driver can deliver to its sensor.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    /// A continuous reading.
    Reading(RawReading),
    /// A peer found during the current scan window.
    Peer(RawPeer),
    /// The current scan window is over.
    BatchComplete,
}

/// Handle through which a driver delivers events to its sensor.
///
/// Holds only a weak reference: once the sensor is dropped every delivery is
/// refused.
#[derive(Clone)]
pub struct EventSink {
    target: Weak<SensorCore>,
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("connected", &(self.target.strong_count() > 0))
            .finish()
    }
}

impl EventSink {
    pub(crate) const fn new(target: Weak<SensorCore>) -> Self {
        Self { target }
    }

    /// Deliver `event`. Returns `false` if the sensor is gone or not sensing.
    pub fn deliver(&self, event: RawEvent) -> bool {
        self.target
            .upgrade()
            .is_some_and(|core| core.handle_event(event))
    }

    /// Deliver a continuous reading.
    pub fn reading(&self, reading: RawReading) -> bool {
        self.deliver(RawEvent::Reading(reading))
    }

    /// Deliver a peer sighting.
    pub fn peer(&self, name: Option<&str>, address: &str, rssi: i16) -> bool {
        self.deliver(RawEvent::Peer(RawPeer {
            name: name.map(str::to_string),
            address: address.to_string(),
            rssi,
        }))
    }

    /// Signal the end of the current scan window.
    pub fn batch_complete(&self) -> bool {
        self.deliver(RawEvent::BatchComplete)
    }
}

/// A platform binding for one sensor.
///
/// Implementations must not deliver events synchronously from inside their
/// own `register`, `unregister` or `begin_scan` calls.
pub trait SensorDriver: Send {
    /// Whether the facility is present and enabled.
    fn availability(&self) -> Availability;

    /// Shorthand for `availability().is_available()`.
    fn is_available(&self) -> bool {
        self.availability().is_available()
    }

    /// Start delivering events for `config` through `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::RegistrationRefused`] if the platform refuses.
    fn register(&mut self, config: &SensorConfig, sink: EventSink) -> Result<(), DriverError>;

    /// Stop delivering events and release the sink.
    fn unregister(&mut self);

    /// Begin one scan window. Only called for scan-batch kinds.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ScanFailed`] if the scan cannot be started.
    fn begin_scan(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_reasons() {
        assert_eq!(Availability::Available.reason(), None);
        assert!(Availability::Missing.reason().unwrap().contains("not present"));
        assert!(Availability::Disabled("radio off".into())
            .reason()
            .unwrap()
            .contains("radio off"));
    }

    #[test]
    fn test_disconnected_sink_refuses_events() {
        let sink = EventSink::new(Weak::new());
        assert!(!sink.batch_complete());
        assert!(!sink.reading(RawReading::Level(3)));
        assert!(!sink.peer(None, "AA:BB:CC:DD:EE:FF", -40));
    }
}
