//! A driver with no hardware behind it.
//!
//! [`SimulatedDriver::new`] returns the driver, which is handed to a
//! [`Sensor`](crate::Sensor), and a [`SimulatedHandle`] that stays with the
//! caller. The handle plays the platform: it decides availability, counts
//! registrations and pushes raw events into whichever sensor is registered.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::config::SensorConfig;
use crate::driver::{
    Availability, DriverError, EventSink, RawEvent, RawPeer, RawReading, SensorDriver,
};

#[derive(Debug)]
struct SimState {
    availability: Availability,
    refuse_registration: Option<String>,
    fail_scans: bool,
    sink: Option<EventSink>,
    config: Option<SensorConfig>,
    registrations: usize,
    unregistrations: usize,
    scans_started: usize,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            availability: Availability::Available,
            refuse_registration: None,
            fail_scans: false,
            sink: None,
            config: None,
            registrations: 0,
            unregistrations: 0,
            scans_started: 0,
        }
    }
}

/// Driver half; owned by the sensor.
#[derive(Debug)]
pub struct SimulatedDriver {
    shared: Arc<Mutex<SimState>>,
}

/// Platform half; kept by whoever feeds the sensor.
#[derive(Debug, Clone)]
pub struct SimulatedHandle {
    shared: Arc<Mutex<SimState>>,
}

impl SimulatedDriver {
    /// Create a connected driver and handle pair.
    #[must_use]
    pub fn new() -> (Self, SimulatedHandle) {
        let shared = Arc::new(Mutex::new(SimState::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            SimulatedHandle { shared },
        )
    }
}

impl SensorDriver for SimulatedDriver {
    fn availability(&self) -> Availability {
        self.shared.lock().availability.clone()
    }

    fn register(&mut self, config: &SensorConfig, sink: EventSink) -> Result<(), DriverError> {
        let mut state = self.shared.lock();
        if let Some(reason) = &state.refuse_registration {
            return Err(DriverError::RegistrationRefused(reason.clone()));
        }
        state.sink = Some(sink);
        state.config = Some(*config);
        state.registrations += 1;
        trace!(kind = %config.kind(), "simulated driver registered");
        Ok(())
    }

    fn unregister(&mut self) {
        let mut state = self.shared.lock();
        state.sink = None;
        state.config = None;
        state.unregistrations += 1;
    }

    fn begin_scan(&mut self) -> Result<(), DriverError> {
        let mut state = self.shared.lock();
        if state.fail_scans {
            return Err(DriverError::ScanFailed("simulated radio failure".into()));
        }
        state.scans_started += 1;
        Ok(())
    }
}

impl SimulatedHandle {
    /// Push `event` into the registered sensor.
    ///
    /// Returns `false` if nothing is registered or the sensor did not use the
    /// event.
    pub fn emit(&self, event: RawEvent) -> bool {
        // Release the lock first: the sensor may call back into the driver.
        let sink = self.shared.lock().sink.clone();
        sink.is_some_and(|sink| sink.deliver(event))
    }

    /// Push a continuous reading.
    pub fn reading(&self, reading: RawReading) -> bool {
        self.emit(RawEvent::Reading(reading))
    }

    /// Push a peer sighting.
    pub fn peer(&self, name: Option<&str>, address: &str, rssi: i16) -> bool {
        self.emit(RawEvent::Peer(RawPeer {
            name: name.map(str::to_string),
            address: address.to_string(),
            rssi,
        }))
    }

    /// End the current scan window.
    pub fn batch_complete(&self) -> bool {
        self.emit(RawEvent::BatchComplete)
    }

    /// Change what the driver reports on the next start.
    pub fn set_availability(&self, availability: Availability) {
        self.shared.lock().availability = availability;
    }

    /// Make registration fail with `reason`, or succeed again with `None`.
    pub fn refuse_registration(&self, reason: Option<&str>) {
        self.shared.lock().refuse_registration = reason.map(str::to_string);
    }

    /// Make every scan start fail.
    pub fn fail_scans(&self, fail: bool) {
        self.shared.lock().fail_scans = fail;
    }

    /// Successful `register` calls so far.
    #[must_use]
    pub fn registrations(&self) -> usize {
        self.shared.lock().registrations
    }

    /// `unregister` calls so far.
    #[must_use]
    pub fn unregistrations(&self) -> usize {
        self.shared.lock().unregistrations
    }

    /// Successful `begin_scan` calls so far.
    #[must_use]
    pub fn scans_started(&self) -> usize {
        self.shared.lock().scans_started
    }

    /// Whether a sensor is currently registered.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.shared.lock().sink.is_some()
    }

    /// Configuration passed to the current registration.
    #[must_use]
    pub fn registered_config(&self) -> Option<SensorConfig> {
        self.shared.lock().config
    }
}
