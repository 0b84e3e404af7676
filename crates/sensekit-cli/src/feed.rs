//! Synthetic raw events for simulated drivers.
//!
//! Each [`Feed`] plays the platform for one sensor: on every tick it pushes
//! a plausible reading, or for Bluetooth a peer sighting with a batch
//! completion every few ticks.

use std::time::Duration;

use sensekit_core::drivers::SimulatedHandle;
use sensekit_core::record::{ChargeStatus, PowerSource, ScreenState};
use sensekit_core::{KindFamily, RawEvent, RawPeer, RawReading, SensorKind};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Ticks per Bluetooth scan window.
pub const TICKS_PER_SCAN: u32 = 4;

/// Synthetic event source for one sensor.
#[derive(Debug)]
pub struct Feed {
    kind: SensorKind,
    handle: SimulatedHandle,
    step: u32,
}

impl Feed {
    /// A feed pushing into the sensor behind `handle`.
    #[must_use]
    pub const fn new(kind: SensorKind, handle: SimulatedHandle) -> Self {
        Self {
            kind,
            handle,
            step: 0,
        }
    }

    /// Kind of sensor being fed.
    #[must_use]
    pub const fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Events for the next tick.
    pub fn next_events(&mut self) -> Vec<RawEvent> {
        let step = self.step;
        self.step = self.step.wrapping_add(1);

        if self.kind.is_scan_batch() {
            let mut events = vec![RawEvent::Peer(peer(step))];
            if (step + 1) % TICKS_PER_SCAN == 0 {
                events.push(RawEvent::BatchComplete);
            }
            return events;
        }
        vec![RawEvent::Reading(reading(self.kind, step))]
    }

    /// Push the next tick's events. Returns how many the sensor used.
    pub fn pump(&mut self) -> usize {
        let events = self.next_events();
        events
            .into_iter()
            .map(|event| self.handle.emit(event))
            .filter(|used| *used)
            .count()
    }
}

#[allow(clippy::cast_precision_loss)]
fn reading(kind: SensorKind, step: u32) -> RawReading {
    let phase = step as f32 * 0.1;
    match kind {
        SensorKind::AudioLevel => {
            RawReading::Level(i32::try_from(step.wrapping_mul(37) % 100).unwrap_or(0))
        }
        SensorKind::Battery => RawReading::Battery {
            level: 100 - i32::try_from(step / 10 % 100).unwrap_or(0),
            scale: 100,
            temperature: 250 + i32::try_from(step % 20).unwrap_or(0),
            voltage: 4_000,
            plugged: PowerSource::Unplugged,
            status: ChargeStatus::Discharging,
        },
        SensorKind::ScreenStatus => RawReading::Screen(if step / 10 % 2 == 0 {
            ScreenState::On
        } else {
            ScreenState::Off
        }),
        SensorKind::StepCounter => RawReading::Scalar((step / 3) as f32),
        SensorKind::AmbientTemperature => RawReading::Scalar(21.0 + (step % 4) as f32 * 0.5),
        SensorKind::AirPressure => RawReading::Scalar(1013.25),
        SensorKind::Humidity => RawReading::Scalar(40.0 + (step % 3) as f32),
        SensorKind::Light => RawReading::Scalar(300.0 + (step % 5) as f32 * 10.0),
        kind if kind.family() == KindFamily::Motion => RawReading::Axes {
            x: phase.sin(),
            y: phase.cos(),
            z: 9.81,
        },
        _ => RawReading::Scalar(0.0),
    }
}

fn peer(step: u32) -> RawPeer {
    let n = step % 6;
    RawPeer {
        name: (n % 2 == 0).then(|| format!("peer-{n}")),
        address: format!("02:00:00:00:00:{n:02X}"),
        rssi: -40 - i16::try_from(step % 50).unwrap_or(0),
    }
}

/// Tick every feed on its own task until `duration` has passed.
///
/// Returns the total number of events the sensors used.
pub async fn drive(feeds: Vec<Feed>, interval: Duration, duration: Duration) -> usize {
    let deadline = Instant::now() + duration;
    let tasks: Vec<_> = feeds
        .into_iter()
        .map(|mut feed| {
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                let mut used = 0;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => used += feed.pump(),
                        () = tokio::time::sleep_until(deadline) => break,
                    }
                }
                debug!(kind = %feed.kind(), used, "feed finished");
                used
            })
        })
        .collect();

    let mut total = 0;
    for task in tasks {
        match task.await {
            Ok(used) => total += used,
            Err(err) => warn!(error = %err, "feed task failed"),
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensekit_core::drivers::SimulatedDriver;
    use sensekit_core::{Record, Sensor};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_every_continuous_kind_gets_a_fitting_reading() {
        for kind in SensorKind::ALL.into_iter().filter(|k| !k.is_scan_batch()) {
            let (driver, handle) = SimulatedDriver::new();
            let sensor = Sensor::new(kind, Box::new(driver));
            sensor.start().unwrap();

            let mut feed = Feed::new(kind, handle);
            assert_eq!(feed.pump(), 1, "{kind}");
            assert_eq!(sensor.stats().discarded_events, 0);
        }
    }

    #[test]
    fn test_bluetooth_completes_a_batch_every_few_ticks() {
        let (driver, handle) = SimulatedDriver::new();
        let sensor = Sensor::new(SensorKind::Bluetooth, Box::new(driver));
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&batches);
        sensor.subscribe_fn("batches", move |record| {
            if let Record::Bluetooth(batch) = record {
                sink.lock().unwrap().push(batch.len());
            }
            Ok(())
        });
        sensor.start().unwrap();

        let mut feed = Feed::new(SensorKind::Bluetooth, handle);
        for _ in 0..TICKS_PER_SCAN * 2 {
            feed.pump();
        }
        assert_eq!(*batches.lock().unwrap(), vec![4, 4]);
    }

    #[test]
    fn test_drive_stops_at_deadline() {
        let (driver, handle) = SimulatedDriver::new();
        let sensor = Sensor::new(SensorKind::AudioLevel, Box::new(driver));
        sensor.start().unwrap();

        let used = tokio_test::block_on(drive(
            vec![Feed::new(SensorKind::AudioLevel, handle)],
            Duration::from_millis(5),
            Duration::from_millis(40),
        ));
        assert!(used > 0);
        assert_eq!(sensor.stats().produced, used as u64);
    }
}
