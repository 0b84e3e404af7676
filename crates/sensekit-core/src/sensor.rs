//! The sensor lifecycle state machine.
//!
//! A [`Sensor`] owns one [`SensorConfig`], one [`SensorDriver`] and one
//! [`Dispatcher`]. It is either idle or active:
//!
//! ```text
//!   configure ─┐
//!              ▼
//!           ┌──────┐  start   ┌────────┐
//!           │ Idle │ ───────▶ │ Active │
//!           └──────┘ ◀─────── └────────┘
//!                       stop
//! ```
//!
//! Raw events arrive from the driver through an [`EventSink`] on whatever
//! thread the platform uses. Records are built and dispatched on that same
//! thread; the sensor never spawns threads of its own.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SensorConfig;
use crate::dispatch::{Dispatcher, RecordFilter, Subscriber, SubscriberId};
use crate::driver::{EventSink, RawEvent, RawPeer, RawReading, SensorDriver};
use crate::error::{Result, SensingError};
use crate::kind::{Discipline, KindFamily, SensorKind};
use crate::record::{
    AudioLevelRecord, BatteryRecord, BluetoothScanRecord, MotionRecord, PeerReading, Record,
    ScalarRecord, ScreenStatusRecord,
};

/// Lifecycle state of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SensorState {
    /// Not sensing; configuration may be replaced.
    #[default]
    Idle,
    /// Registered with the driver and producing records.
    Active,
}

impl SensorState {
    /// Lowercase name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
        }
    }
}

/// Counters describing what a sensor has done since it was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorStats {
    /// Records built from raw events.
    pub produced: u64,
    /// Records dropped by the filter.
    pub rejected: u64,
    /// Successful subscriber deliveries.
    pub delivered: u64,
    /// Failed subscriber deliveries.
    pub delivery_failures: u64,
    /// Raw events that did not fit the sensor or arrived while idle.
    pub discarded_events: u64,
}

#[derive(Debug, Default)]
struct Counters {
    produced: AtomicU64,
    rejected: AtomicU64,
    delivered: AtomicU64,
    delivery_failures: AtomicU64,
    discarded_events: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SensorStats {
        SensorStats {
            produced: self.produced.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            discarded_events: self.discarded_events.load(Ordering::Relaxed),
        }
    }
}

/// Shared state behind a [`Sensor`] and the sinks handed to its driver.
pub(crate) struct SensorCore {
    kind: SensorKind,
    me: Weak<SensorCore>,
    clock: Arc<dyn Clock>,
    state: Mutex<SensorState>,
    accepting: AtomicBool,
    config: RwLock<SensorConfig>,
    dispatcher: Dispatcher,
    batch: Mutex<Vec<PeerReading>>,
    driver: Mutex<Box<dyn SensorDriver>>,
    counters: Counters,
}

impl SensorCore {
    fn state_error(&self, state: SensorState, operation: &'static str) -> SensingError {
        SensingError::InvalidStateTransition {
            kind: self.kind,
            state: state.as_str(),
            operation,
        }
    }

    fn configure(&self, config: SensorConfig) -> Result<()> {
        if config.kind() != self.kind {
            return Err(SensingError::ConfigurationTypeMismatch {
                expected: self.kind,
                actual: config.kind(),
            });
        }
        let state = self.state.lock();
        if *state == SensorState::Active {
            return Err(self.state_error(*state, "configure"));
        }
        config.validate()?;

        let filter = config.default_filter();
        *self.config.write() = config;
        self.dispatcher.set_filter(filter);
        debug!(kind = %self.kind, settings = ?config.settings(), "sensor configured");
        Ok(())
    }

    fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        if *state == SensorState::Active {
            debug!(kind = %self.kind, "start ignored; sensor already active");
            return Err(self.state_error(*state, "start"));
        }

        let config = *self.config.read();
        let mut driver = self.driver.lock();
        if let Some(reason) = driver.availability().reason() {
            warn!(kind = %self.kind, %reason, "sensor unavailable");
            return Err(SensingError::DeviceUnavailable {
                kind: self.kind,
                reason,
            });
        }

        self.batch.lock().clear();
        self.accepting.store(true, Ordering::SeqCst);
        if let Err(err) = driver.register(&config, EventSink::new(self.me.clone())) {
            self.accepting.store(false, Ordering::SeqCst);
            warn!(kind = %self.kind, error = %err, "driver registration failed");
            return Err(SensingError::DeviceUnavailable {
                kind: self.kind,
                reason: err.to_string(),
            });
        }

        if self.kind.is_scan_batch() {
            if let Err(err) = driver.begin_scan() {
                self.accepting.store(false, Ordering::SeqCst);
                driver.unregister();
                warn!(kind = %self.kind, error = %err, "first scan failed to start");
                return Err(SensingError::DeviceUnavailable {
                    kind: self.kind,
                    reason: err.to_string(),
                });
            }
        }

        *state = SensorState::Active;
        info!(kind = %self.kind, "sensing started");
        Ok(())
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        if *state == SensorState::Idle {
            debug!(kind = %self.kind, "stop ignored; sensor already idle");
            return;
        }

        self.accepting.store(false, Ordering::SeqCst);
        self.driver.lock().unregister();
        let discarded = std::mem::take(&mut *self.batch.lock()).len();
        if discarded > 0 {
            debug!(kind = %self.kind, discarded, "partial scan batch discarded");
        }

        *state = SensorState::Idle;
        info!(kind = %self.kind, "sensing stopped");
    }

    /// Entry point for driver events. Returns `false` if the event was not used.
    pub(crate) fn handle_event(&self, event: RawEvent) -> bool {
        if !self.accepting.load(Ordering::SeqCst) {
            self.counters.discarded_events.fetch_add(1, Ordering::Relaxed);
            debug!(kind = %self.kind, "event dropped; sensor is not sensing");
            return false;
        }

        match (self.kind.discipline(), event) {
            (Discipline::Continuous, RawEvent::Reading(reading)) => {
                match self.build_record(reading) {
                    Some(record) => {
                        self.emit(&record);
                        true
                    }
                    None => self.discard("reading does not match sensor kind"),
                }
            }
            (Discipline::ScanBatch, RawEvent::Peer(peer)) => self.accumulate(peer),
            (Discipline::ScanBatch, RawEvent::BatchComplete) => {
                self.complete_batch();
                true
            }
            (_, RawEvent::Reading(_)) => self.discard("scan sensors do not take readings"),
            (_, RawEvent::Peer(_) | RawEvent::BatchComplete) => {
                self.discard("continuous sensors do not scan")
            }
        }
    }

    fn discard(&self, why: &str) -> bool {
        self.counters.discarded_events.fetch_add(1, Ordering::Relaxed);
        warn!(kind = %self.kind, reason = why, "raw event discarded");
        false
    }

    fn build_record(&self, reading: RawReading) -> Option<Record> {
        let kind = self.kind;
        let timestamp = self.clock.now_millis();
        let record: Record = match (kind.family(), reading) {
            (KindFamily::Motion, RawReading::Axes { x, y, z }) => {
                MotionRecord::new(kind, timestamp, x, y, z).ok()?.into()
            }
            (KindFamily::Scalar, RawReading::Scalar(value)) => {
                ScalarRecord::new(kind, timestamp, value).ok()?.into()
            }
            (KindFamily::AudioLevel, RawReading::Level(level)) => {
                AudioLevelRecord::new(timestamp, level).into()
            }
            (
                KindFamily::SystemState,
                RawReading::Battery {
                    level,
                    scale,
                    temperature,
                    voltage,
                    plugged,
                    status,
                },
            ) if kind == SensorKind::Battery => BatteryRecord::new(
                timestamp,
                level,
                scale,
                temperature,
                voltage,
                plugged,
                status,
            )
            .into(),
            (KindFamily::SystemState, RawReading::Screen(status))
                if kind == SensorKind::ScreenStatus =>
            {
                ScreenStatusRecord::new(timestamp, status).into()
            }
            _ => return None,
        };
        Some(record)
    }

    fn accumulate(&self, peer: RawPeer) -> bool {
        let floor = self
            .config
            .read()
            .proximity_scan()
            .and_then(|settings| settings.rssi_floor_dbm);
        if floor.is_some_and(|floor| peer.rssi < floor) {
            debug!(kind = %self.kind, address = %peer.address, rssi = peer.rssi, "peer below rssi floor");
            return false;
        }

        let sighting = PeerReading::new(self.clock.now_millis(), peer.name, peer.address, peer.rssi);
        self.batch.lock().push(sighting);
        true
    }

    fn complete_batch(&self) {
        // Swap under the lock: a peer arriving now lands in the fresh buffer.
        let devices = std::mem::take(&mut *self.batch.lock());
        let record = BluetoothScanRecord::new(self.clock.now_millis(), devices);
        debug!(kind = %self.kind, peers = record.len(), "scan batch complete");
        self.emit(&record.into());

        let rearm = self
            .config
            .read()
            .proximity_scan()
            .is_some_and(|settings| settings.rearm_scan);
        if rearm {
            self.rearm_scan();
        }
    }

    fn rearm_scan(&self) {
        let mut driver = self.driver.lock();
        // stop() may have run while the batch was being dispatched
        if !self.accepting.load(Ordering::SeqCst) {
            return;
        }
        if let Err(err) = driver.begin_scan() {
            warn!(kind = %self.kind, error = %err, "failed to re-arm scan");
        }
    }

    fn emit(&self, record: &Record) {
        self.counters.produced.fetch_add(1, Ordering::Relaxed);
        let report = self.dispatcher.submit(record);
        if !report.accepted {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.counters
            .delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.counters
            .delivery_failures
            .fetch_add(report.failures.len() as u64, Ordering::Relaxed);
    }
}

/// One sensing unit: configuration, lifecycle, driver and subscribers.
///
/// Dropping an active sensor stops it, releasing its driver registration.
pub struct Sensor {
    core: Arc<SensorCore>,
}

impl std::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sensor")
            .field("kind", &self.core.kind)
            .field("state", &self.state())
            .field("subscribers", &self.core.dispatcher.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl Sensor {
    /// Create an idle sensor with the default configuration for `kind`.
    #[must_use]
    pub fn new(kind: SensorKind, driver: Box<dyn SensorDriver>) -> Self {
        Self::build(SensorConfig::default_for(kind), driver, Arc::new(SystemClock))
    }

    /// Create an idle sensor with `config`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is invalid.
    pub fn with_config(config: SensorConfig, driver: Box<dyn SensorDriver>) -> Result<Self> {
        Self::with_clock(config, driver, Arc::new(SystemClock))
    }

    /// Create an idle sensor that timestamps records with `clock`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is invalid.
    pub fn with_clock(
        config: SensorConfig,
        driver: Box<dyn SensorDriver>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, driver, clock))
    }

    fn build(config: SensorConfig, driver: Box<dyn SensorDriver>, clock: Arc<dyn Clock>) -> Self {
        let dispatcher = Dispatcher::new();
        dispatcher.set_filter(config.default_filter());
        let core = Arc::new_cyclic(|me| SensorCore {
            kind: config.kind(),
            me: me.clone(),
            clock,
            state: Mutex::new(SensorState::Idle),
            accepting: AtomicBool::new(false),
            config: RwLock::new(config),
            dispatcher,
            batch: Mutex::new(Vec::new()),
            driver: Mutex::new(driver),
            counters: Counters::default(),
        });
        Self { core }
    }

    /// Kind of records this sensor produces.
    #[must_use]
    pub fn kind(&self) -> SensorKind {
        self.core.kind
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SensorState {
        *self.core.state.lock()
    }

    /// Returns `true` while the sensor is active.
    #[must_use]
    pub fn is_sensing(&self) -> bool {
        self.state() == SensorState::Active
    }

    /// A copy of the current configuration.
    #[must_use]
    pub fn configuration(&self) -> SensorConfig {
        *self.core.config.read()
    }

    /// Replace the configuration. Only allowed while idle.
    ///
    /// Also reinstalls the configuration's default filter, replacing any
    /// filter set with [`set_filter`](Self::set_filter).
    ///
    /// # Errors
    ///
    /// - [`SensingError::ConfigurationTypeMismatch`] if `config` is for another kind
    /// - [`SensingError::InvalidStateTransition`] if the sensor is active
    /// - a validation error if `config` is invalid
    ///
    /// The previous configuration is kept on every error.
    pub fn configure(&self, config: SensorConfig) -> Result<()> {
        self.core.configure(config)
    }

    /// Begin sensing.
    ///
    /// # Errors
    ///
    /// - [`SensingError::DeviceUnavailable`] if the facility is missing,
    ///   disabled, or refuses registration; the sensor stays idle
    /// - [`SensingError::InvalidStateTransition`] if already active; nothing
    ///   is re-registered
    pub fn start(&self) -> Result<()> {
        self.core.start()
    }

    /// Stop sensing and discard any partial scan batch. No-op while idle.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Add a subscriber at the end of the delivery order.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        self.core.dispatcher.subscribe(subscriber)
    }

    /// Add a closure subscriber at the end of the delivery order.
    pub fn subscribe_fn<F>(&self, name: impl Into<String>, handler: F) -> SubscriberId
    where
        F: Fn(&Record) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.core.dispatcher.subscribe_fn(name, handler)
    }

    /// Remove a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.core.dispatcher.unsubscribe(id)
    }

    /// Replace the accept/reject hook. Applies from the next record.
    pub fn set_filter(&self, filter: impl RecordFilter + 'static) {
        self.core.dispatcher.set_filter(Box::new(filter));
    }

    /// Restore the current configuration's default filter.
    pub fn reset_filter(&self) {
        let filter = self.core.config.read().default_filter();
        self.core.dispatcher.set_filter(filter);
    }

    /// Counters since creation.
    #[must_use]
    pub fn stats(&self) -> SensorStats {
        self.core.counters.snapshot()
    }
}

impl Drop for Sensor {
    fn drop(&mut self) {
        self.core.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{ProximityScanSettings, ScalarSettings, Settings};
    use crate::driver::Availability;
    use crate::drivers::simulated::{SimulatedDriver, SimulatedHandle};
    use crate::record::SensorRecord;

    fn simulated(kind: SensorKind) -> (Sensor, SimulatedHandle, Arc<ManualClock>) {
        let (driver, handle) = SimulatedDriver::new();
        let clock = Arc::new(ManualClock::new(1_000));
        let sensor = Sensor::with_clock(
            SensorConfig::default_for(kind),
            Box::new(driver),
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap();
        (sensor, handle, clock)
    }

    fn collect(sensor: &Sensor) -> Arc<Mutex<Vec<Record>>> {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        sensor.subscribe_fn("collector", move |record| {
            sink.lock().push(record.clone());
            Ok(())
        });
        records
    }

    #[test]
    fn test_start_and_stop_register_exactly_once_for_every_kind() {
        for kind in SensorKind::ALL {
            let (sensor, handle, _) = simulated(kind);
            assert_eq!(sensor.state(), SensorState::Idle);

            sensor.start().unwrap();
            assert!(sensor.is_sensing());
            assert_eq!(handle.registrations(), 1);

            sensor.stop();
            sensor.stop();
            assert_eq!(sensor.state(), SensorState::Idle);
            assert_eq!(handle.unregistrations(), 1, "{kind}");
        }
    }

    #[test]
    fn test_start_while_active_is_reported_without_reregistering() {
        let (sensor, handle, _) = simulated(SensorKind::Light);
        sensor.start().unwrap();

        let err = sensor.start().unwrap_err();
        assert!(err.is_expected_state());
        assert_eq!(handle.registrations(), 1);
        assert!(sensor.is_sensing());
    }

    #[test]
    fn test_restart_after_stop() {
        let (sensor, handle, _) = simulated(SensorKind::Gyroscope);
        for _ in 0..3 {
            sensor.start().unwrap();
            sensor.stop();
        }
        assert_eq!(handle.registrations(), 3);
        assert_eq!(handle.unregistrations(), 3);
    }

    #[test]
    fn test_unavailable_device_keeps_sensor_idle() {
        let (sensor, handle, _) = simulated(SensorKind::Bluetooth);
        handle.set_availability(Availability::Disabled("radio off".into()));

        let err = sensor.start().unwrap_err();
        assert!(matches!(err, SensingError::DeviceUnavailable { .. }));
        assert!(err.to_string().contains("radio off"));
        assert_eq!(sensor.state(), SensorState::Idle);
        assert_eq!(handle.registrations(), 0);

        handle.set_availability(Availability::Available);
        sensor.start().unwrap();
    }

    #[test]
    fn test_refused_registration_keeps_sensor_idle() {
        let (sensor, handle, _) = simulated(SensorKind::Accelerometer);
        handle.refuse_registration(Some("permission denied"));

        let err = sensor.start().unwrap_err();
        assert!(matches!(err, SensingError::DeviceUnavailable { .. }));
        assert_eq!(sensor.state(), SensorState::Idle);
        assert!(!handle.reading(RawReading::Axes { x: 0.0, y: 0.0, z: 0.0 }));
    }

    #[test]
    fn test_configure_returns_copies() {
        let (sensor, _, _) = simulated(SensorKind::Light);
        let config = SensorConfig::new(
            SensorKind::Light,
            Settings::Scalar(ScalarSettings {
                suppress_unchanged: false,
                ..ScalarSettings::default()
            }),
        )
        .unwrap();

        sensor.configure(config).unwrap();
        assert_eq!(sensor.configuration(), config);
        assert_ne!(sensor.configuration(), SensorConfig::default_for(SensorKind::Light));
    }

    #[test]
    fn test_configure_with_other_kind_keeps_previous_config() {
        let (sensor, _, _) = simulated(SensorKind::Light);
        let before = sensor.configuration();

        let err = sensor
            .configure(SensorConfig::default_for(SensorKind::Humidity))
            .unwrap_err();
        assert!(matches!(
            err,
            SensingError::ConfigurationTypeMismatch {
                expected: SensorKind::Light,
                actual: SensorKind::Humidity,
            }
        ));
        assert_eq!(sensor.configuration(), before);
    }

    #[test]
    fn test_configure_while_active_is_rejected() {
        let (sensor, _, _) = simulated(SensorKind::Light);
        sensor.start().unwrap();
        let err = sensor
            .configure(SensorConfig::default_for(SensorKind::Light))
            .unwrap_err();
        assert!(matches!(err, SensingError::InvalidStateTransition { operation: "configure", .. }));
    }

    #[test]
    fn test_continuous_readings_become_records() {
        let (sensor, handle, clock) = simulated(SensorKind::Accelerometer);
        let records = collect(&sensor);
        sensor.start().unwrap();

        handle.reading(RawReading::Axes { x: 1.0, y: 2.0, z: 3.0 });
        clock.advance(20);
        handle.reading(RawReading::Axes { x: 1.0, y: 2.0, z: 3.0 });

        let records = records.lock();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].to_csv(), "1000,1,2,3");
        assert_eq!(records[1].timestamp(), 1_020);
    }

    #[test]
    fn test_mismatched_and_idle_events_are_discarded() {
        let (sensor, handle, _) = simulated(SensorKind::Light);
        let records = collect(&sensor);
        sensor.start().unwrap();

        assert!(!handle.reading(RawReading::Level(4)));
        assert!(!handle.batch_complete());
        sensor.stop();
        assert!(!handle.reading(RawReading::Scalar(3.0)));

        assert!(records.lock().is_empty());
        assert_eq!(sensor.stats().discarded_events, 2);
    }

    #[test]
    fn test_scalar_default_suppresses_unchanged_readings() {
        let (sensor, handle, _) = simulated(SensorKind::Light);
        let records = collect(&sensor);
        sensor.start().unwrap();

        for lux in [5.0, 5.0, 6.0, 6.0, 5.0] {
            handle.reading(RawReading::Scalar(lux));
        }

        let values: Vec<f32> = records
            .lock()
            .iter()
            .map(|r| match r {
                Record::Scalar(s) => s.value(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(values, vec![5.0, 6.0, 5.0]);
        assert_eq!(sensor.stats().rejected, 2);
    }

    #[test]
    fn test_custom_filter_and_reset() {
        let (sensor, handle, _) = simulated(SensorKind::AudioLevel);
        let records = collect(&sensor);
        sensor.set_filter(|record: &Record| matches!(record, Record::AudioLevel(r) if r.level() >= 50));
        sensor.start().unwrap();

        handle.reading(RawReading::Level(10));
        handle.reading(RawReading::Level(55));
        sensor.reset_filter();
        handle.reading(RawReading::Level(10));

        assert_eq!(records.lock().len(), 2);
    }

    #[test]
    fn test_scan_batch_collects_peers_until_complete() {
        let (sensor, handle, clock) = simulated(SensorKind::Bluetooth);
        let records = collect(&sensor);
        sensor.start().unwrap();
        assert_eq!(handle.scans_started(), 1);

        for i in 0..4 {
            handle.peer(None, &format!("00:00:00:00:00:0{i}"), -50);
        }
        clock.set(9_000);
        handle.batch_complete();
        handle.peer(Some("late"), "00:00:00:00:00:09", -60);

        {
            let records = records.lock();
            assert_eq!(records.len(), 1);
            let Record::Bluetooth(batch) = &records[0] else {
                panic!("expected a scan batch");
            };
            assert_eq!(batch.len(), 4);
            assert_eq!(batch.timestamp(), 9_000);
        }
        assert_eq!(handle.scans_started(), 2);

        handle.batch_complete();
        let records = records.lock();
        let Record::Bluetooth(second) = &records[1] else {
            panic!("expected a scan batch");
        };
        assert_eq!(second.len(), 1);
        assert_eq!(second.devices()[0].name(), Some("late"));
    }

    #[test]
    fn test_concurrent_peers_land_in_exactly_one_batch() {
        const SENDERS: usize = 4;
        const PEERS_PER_SENDER: usize = 5_000;
        const COMPLETIONS: usize = 2_000;

        let (sensor, handle, _) = simulated(SensorKind::Bluetooth);
        let batched = Arc::new(AtomicU64::new(0));
        let batches = Arc::new(AtomicU64::new(0));
        {
            let batched = Arc::clone(&batched);
            let batches = Arc::clone(&batches);
            sensor.subscribe_fn("counter", move |record| {
                if let Record::Bluetooth(batch) = record {
                    batched.fetch_add(batch.len() as u64, Ordering::SeqCst);
                    batches.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            });
        }
        sensor.start().unwrap();

        std::thread::scope(|scope| {
            for sender in 0..SENDERS {
                let handle = handle.clone();
                scope.spawn(move || {
                    for n in 0..PEERS_PER_SENDER {
                        let address = format!("{sender:02X}:{n:04X}");
                        assert!(handle.peer(None, &address, -40));
                    }
                });
            }
            let handle = handle.clone();
            scope.spawn(move || {
                for _ in 0..COMPLETIONS {
                    assert!(handle.batch_complete());
                    std::thread::yield_now();
                }
            });
        });
        handle.batch_complete();
        sensor.stop();

        assert_eq!(
            batched.load(Ordering::SeqCst),
            (SENDERS * PEERS_PER_SENDER) as u64
        );
        assert_eq!(batches.load(Ordering::SeqCst), COMPLETIONS as u64 + 1);
        assert_eq!(handle.scans_started(), COMPLETIONS + 2);
        assert_eq!(sensor.stats().produced, COMPLETIONS as u64 + 1);
    }

    #[test]
    fn test_stop_discards_partial_batch() {
        let (sensor, handle, _) = simulated(SensorKind::Bluetooth);
        let records = collect(&sensor);
        sensor.start().unwrap();
        handle.peer(None, "00:00:00:00:00:01", -50);
        sensor.stop();

        sensor.start().unwrap();
        handle.batch_complete();
        let records = records.lock();
        let Record::Bluetooth(batch) = &records[0] else {
            panic!("expected a scan batch");
        };
        assert!(batch.is_empty());
    }

    #[test]
    fn test_rssi_floor_and_no_rearm() {
        let (sensor, handle, _) = simulated(SensorKind::Bluetooth);
        sensor
            .configure(
                SensorConfig::new(
                    SensorKind::Bluetooth,
                    Settings::ProximityScan(ProximityScanSettings {
                        rearm_scan: false,
                        rssi_floor_dbm: Some(-70),
                    }),
                )
                .unwrap(),
            )
            .unwrap();
        let records = collect(&sensor);
        sensor.start().unwrap();

        assert!(handle.peer(None, "00:00:00:00:00:01", -60));
        assert!(!handle.peer(None, "00:00:00:00:00:02", -90));
        handle.batch_complete();

        assert_eq!(handle.scans_started(), 1);
        let records = records.lock();
        let Record::Bluetooth(batch) = &records[0] else {
            panic!("expected a scan batch");
        };
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_stop_from_subscriber_prevents_rearm() {
        let (driver, handle) = SimulatedDriver::new();
        let sensor = Arc::new(Sensor::new(SensorKind::Bluetooth, Box::new(driver)));
        let weak = Arc::downgrade(&sensor);
        sensor.subscribe_fn("stopper", move |_| {
            if let Some(sensor) = weak.upgrade() {
                sensor.stop();
            }
            Ok(())
        });
        sensor.start().unwrap();

        handle.batch_complete();
        assert_eq!(sensor.state(), SensorState::Idle);
        assert_eq!(handle.scans_started(), 1);
    }

    #[test]
    fn test_subscriber_failures_are_counted_not_fatal() {
        let (sensor, handle, _) = simulated(SensorKind::AudioLevel);
        sensor.subscribe_fn("broken", |_| Err(anyhow::anyhow!("nope")));
        let records = collect(&sensor);
        sensor.start().unwrap();

        handle.reading(RawReading::Level(1));
        assert_eq!(records.lock().len(), 1);
        let stats = sensor.stats();
        assert_eq!(stats.delivery_failures, 1);
        assert_eq!(stats.delivered, 1);
        assert!(sensor.is_sensing());
    }

    #[test]
    fn test_drop_releases_registration() {
        let (sensor, handle, _) = simulated(SensorKind::ScreenStatus);
        sensor.start().unwrap();
        drop(sensor);

        assert_eq!(handle.unregistrations(), 1);
        assert!(!handle.is_registered());
    }

    #[test]
    fn test_sensor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Sensor>();
    }
}
