//! # sensekit-core
//!
//! A device-sensing abstraction layer.
//!
//! This crate provides:
//! - A uniform lifecycle (configure, start, stop) over heterogeneous sensors
//! - Kind-bound configuration with validation
//! - Per-sensor filtering and ordered fan-out to subscribers
//! - Typed records with text, JSON tree and key-value map forms
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`kind`] - The closed set of sensor kinds and their families
//! - [`record`] - Record variants and their serialized forms
//! - [`config`] - Per-sensor settings and validation
//! - [`session`] - The on-disk session configuration file
//! - [`dispatch`] - Filters, subscribers and the dispatcher
//! - [`driver`] - The interface a platform binding implements
//! - [`drivers`] - Bundled drivers
//! - [`sensor`] - The sensor state machine
//! - [`manager`] - One sensor per kind, addressed by kind
//! - [`clock`] - Timestamp sources
//! - [`error`] - Unified error types for the crate
//!
//! ## Example
//!
//! ```rust
//! use sensekit_core::drivers::SimulatedDriver;
//! use sensekit_core::record::SensorRecord;
//! use sensekit_core::{RawReading, Sensor, SensorKind};
//!
//! let (driver, platform) = SimulatedDriver::new();
//! let sensor = Sensor::new(SensorKind::AudioLevel, Box::new(driver));
//! sensor.subscribe_fn("printer", |record| {
//!     println!("{}", record.to_csv());
//!     Ok(())
//! });
//!
//! sensor.start()?;
//! platform.reading(RawReading::Level(42));
//! sensor.stop();
//! # Ok::<(), sensekit_core::SensingError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod kind;
pub mod manager;
pub mod record;
pub mod sensor;
pub mod session;

// Re-export primary types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AudioLevelSettings, MotionSettings, ProximityScanSettings, SamplingRate, ScalarSettings,
    SensorConfig, Settings, SystemStateSettings,
};
pub use dispatch::{
    AcceptAll, DispatchReport, Dispatcher, FnSubscriber, RecordFilter, Subscriber, SubscriberId,
    UnchangedFilter,
};
pub use driver::{Availability, DriverError, EventSink, RawEvent, RawPeer, RawReading, SensorDriver};
pub use error::{Result, SensingError};
pub use kind::{Discipline, KindFamily, SensorKind};
pub use manager::SensorManager;
pub use record::{FieldMap, FieldValue, Record, SensorRecord};
pub use sensor::{Sensor, SensorState, SensorStats};
pub use session::{LogSettings, OutputFormat, SessionConfig};
