//! Bundled [`SensorDriver`](crate::driver::SensorDriver) implementations.
//!
//! - `simulated` - an in-process driver whose events are pushed by hand,
//!   used by tests and the command-line feed

pub mod simulated;

pub use simulated::{SimulatedDriver, SimulatedHandle};
