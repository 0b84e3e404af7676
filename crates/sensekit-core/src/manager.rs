//! Owns one sensor per kind and routes operations to it by kind.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::SensorConfig;
use crate::dispatch::{Subscriber, SubscriberId};
use crate::error::{Result, SensingError};
use crate::kind::SensorKind;
use crate::sensor::{Sensor, SensorStats};

/// A set of sensors keyed by kind.
#[derive(Debug, Default)]
pub struct SensorManager {
    sensors: BTreeMap<SensorKind, Sensor>,
}

impl SensorManager {
    /// An empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `sensor`.
    ///
    /// # Errors
    ///
    /// Returns [`SensingError::SensorAlreadyRegistered`] if a sensor of the
    /// same kind is already held; `sensor` is dropped in that case.
    pub fn register(&mut self, sensor: Sensor) -> Result<()> {
        let kind = sensor.kind();
        if self.sensors.contains_key(&kind) {
            return Err(SensingError::SensorAlreadyRegistered(kind));
        }
        debug!(kind = %kind, "sensor registered with manager");
        self.sensors.insert(kind, sensor);
        Ok(())
    }

    /// Give back the sensor for `kind`. Only allowed while it is idle.
    ///
    /// # Errors
    ///
    /// Returns [`SensingError::SensorNotRegistered`] for an unknown kind or
    /// [`SensingError::InvalidStateTransition`] if the sensor is active.
    pub fn deregister(&mut self, kind: SensorKind) -> Result<Sensor> {
        let sensor = self.sensor(kind)?;
        if sensor.is_sensing() {
            return Err(SensingError::InvalidStateTransition {
                kind,
                state: sensor.state().as_str(),
                operation: "deregister",
            });
        }
        self.sensors
            .remove(&kind)
            .ok_or(SensingError::SensorNotRegistered(kind))
    }

    /// The sensor for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SensingError::SensorNotRegistered`] for an unknown kind.
    pub fn sensor(&self, kind: SensorKind) -> Result<&Sensor> {
        self.sensors
            .get(&kind)
            .ok_or(SensingError::SensorNotRegistered(kind))
    }

    /// Registered kinds in id order.
    #[must_use]
    pub fn kinds(&self) -> Vec<SensorKind> {
        self.sensors.keys().copied().collect()
    }

    /// Number of registered sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Returns `true` if no sensor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// See [`Sensor::configure`].
    ///
    /// # Errors
    ///
    /// [`SensingError::SensorNotRegistered`], or whatever the sensor reports.
    pub fn configure(&self, kind: SensorKind, config: SensorConfig) -> Result<()> {
        self.sensor(kind)?.configure(config)
    }

    /// See [`Sensor::start`].
    ///
    /// # Errors
    ///
    /// [`SensingError::SensorNotRegistered`], or whatever the sensor reports.
    pub fn start(&self, kind: SensorKind) -> Result<()> {
        self.sensor(kind)?.start()
    }

    /// See [`Sensor::stop`].
    ///
    /// # Errors
    ///
    /// [`SensingError::SensorNotRegistered`] for an unknown kind.
    pub fn stop(&self, kind: SensorKind) -> Result<()> {
        self.sensor(kind)?.stop();
        Ok(())
    }

    /// Subscribe to the sensor for `kind`.
    ///
    /// # Errors
    ///
    /// [`SensingError::SensorNotRegistered`] for an unknown kind.
    pub fn subscribe(
        &self,
        kind: SensorKind,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<SubscriberId> {
        Ok(self.sensor(kind)?.subscribe(subscriber))
    }

    /// Subscribe one subscriber to every registered sensor.
    pub fn subscribe_all(&self, subscriber: &Arc<dyn Subscriber>) -> Vec<(SensorKind, SubscriberId)> {
        self.sensors
            .iter()
            .map(|(kind, sensor)| (*kind, sensor.subscribe(Arc::clone(subscriber))))
            .collect()
    }

    /// Start every idle sensor, continuing past failures.
    ///
    /// # Errors
    ///
    /// Returns one error per sensor that failed to start.
    pub fn start_all(&self) -> std::result::Result<(), Vec<SensingError>> {
        let errors: Vec<SensingError> = self
            .sensors
            .values()
            .filter(|sensor| !sensor.is_sensing())
            .filter_map(|sensor| sensor.start().err())
            .collect();

        info!(
            started = self.sensors.values().filter(|s| s.is_sensing()).count(),
            failed = errors.len(),
            "start_all finished"
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Stop every active sensor. Returns how many were stopped.
    pub fn stop_all(&self) -> usize {
        let mut stopped = 0;
        for sensor in self.sensors.values().filter(|sensor| sensor.is_sensing()) {
            sensor.stop();
            stopped += 1;
        }
        info!(stopped, "stop_all finished");
        stopped
    }

    /// Counters for every registered sensor.
    #[must_use]
    pub fn stats(&self) -> Vec<(SensorKind, SensorStats)> {
        self.sensors
            .iter()
            .map(|(kind, sensor)| (*kind, sensor.stats()))
            .collect()
    }
}
