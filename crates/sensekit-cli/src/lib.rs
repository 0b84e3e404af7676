//! # sensekit-cli
//!
//! Command-line consumer for the sensekit framework.
//!
//! This library provides the pieces the `sensekit` binary is built from:
//!
//! - [`args`] - Command-line arguments and overrides
//! - [`app`] - Session setup and run loop
//! - [`feed`] - Synthetic events for simulated drivers
//! - [`output`] - The record-printing subscriber
//! - [`logging`] - Logging initialization

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod app;
pub mod args;
pub mod feed;
pub mod logging;
pub mod output;
