//! Unified error types for the sensekit core library.
//!
//! This module provides a unified error type [`SensingError`] that covers all
//! failure modes of the sensing framework. Driver implementations report
//! their own [`DriverError`](crate::driver::DriverError), which is converted
//! at the sensor boundary.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Actionable messages**: Error messages guide users toward resolution
//! - **State-preserving**: Lifecycle errors never leave a sensor half-transitioned
//!
//! # Example
//!
//! ```rust
//! use sensekit_core::error::{Result, SensingError};
//! use sensekit_core::SensorKind;
//!
//! fn require_idle(active: bool) -> Result<()> {
//!     if active {
//!         return Err(SensingError::InvalidStateTransition {
//!             kind: SensorKind::Light,
//!             state: "active",
//!             operation: "configure",
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::kind::SensorKind;

/// The unified error type for all sensing operations.
#[derive(Debug, Error)]
pub enum SensingError {
    // =========================================================================
    // LIFECYCLE ERRORS
    // =========================================================================
    /// A configuration built for one kind was applied to a sensor of another.
    #[error("Configuration for {actual} cannot be applied to a {expected} sensor")]
    ConfigurationTypeMismatch {
        /// Kind of the target sensor.
        expected: SensorKind,
        /// Kind the configuration is bound to.
        actual: SensorKind,
    },

    /// The sensing facility is missing or disabled.
    #[error("{kind} sensor is unavailable: {reason}")]
    DeviceUnavailable {
        /// Kind of the sensor that failed to start.
        kind: SensorKind,
        /// Why the facility could not be used.
        reason: String,
    },

    /// The operation is not allowed in the sensor's current state.
    #[error("Cannot {operation} {kind} sensor while it is {state}")]
    InvalidStateTransition {
        /// Kind of the sensor.
        kind: SensorKind,
        /// Current lifecycle state.
        state: &'static str,
        /// Rejected operation.
        operation: &'static str,
    },

    // =========================================================================
    // DISPATCH ERRORS
    // =========================================================================
    /// A subscriber failed while receiving a record.
    #[error("Subscriber '{subscriber}' failed to handle {kind} record: {message}")]
    SubscriberDeliveryFailure {
        /// Kind of the record being delivered.
        kind: SensorKind,
        /// Name of the failing subscriber.
        subscriber: String,
        /// Failure description.
        message: String,
    },

    // =========================================================================
    // REGISTRY ERRORS
    // =========================================================================
    /// No sensor of this kind is registered with the manager.
    #[error("No {0} sensor is registered")]
    SensorNotRegistered(SensorKind),

    /// A sensor of this kind is already registered with the manager.
    #[error("A {0} sensor is already registered")]
    SensorAlreadyRegistered(SensorKind),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// A configuration value is out of range or inconsistent.
    #[error("Invalid configuration for '{field}': {message}")]
    ConfigValidation {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several configuration values are invalid.
    #[error("Configuration has {} invalid values: {}", .0.len(), join_messages(.0))]
    MultipleValidationErrors(Vec<SensingError>),

    /// The configuration source could not be read or deserialized.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    // =========================================================================
    // RECORD & I/O ERRORS
    // =========================================================================
    /// A text-form record could not be parsed back.
    #[error("Failed to parse {kind} record: {message}")]
    RecordParse {
        /// Kind the text was parsed as.
        kind: SensorKind,
        /// What went wrong.
        message: String,
    },

    /// A record constructor was given a kind outside its family.
    #[error("{kind} is not a {family} kind")]
    WrongRecordKind {
        /// Kind that was supplied.
        kind: SensorKind,
        /// Family the constructor builds.
        family: &'static str,
    },

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for sensing operations.
pub type Result<T> = std::result::Result<T, SensingError>;

fn join_messages(errors: &[SensingError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SensingError {
    /// Returns `true` if this error comes from a lifecycle operation
    /// (`configure`, `start`, `stop`).
    #[inline]
    #[must_use]
    pub const fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationTypeMismatch { .. }
                | Self::DeviceUnavailable { .. }
                | Self::InvalidStateTransition { .. }
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationTypeMismatch { .. }
                | Self::ConfigValidation { .. }
                | Self::MultipleValidationErrors(_)
                | Self::ConfigParse(_)
        )
    }

    /// Returns `true` if this error reports a state rather than a failure.
    ///
    /// Starting an active sensor is reported this way: nothing was changed.
    #[inline]
    #[must_use]
    pub const fn is_expected_state(&self) -> bool {
        matches!(self, Self::InvalidStateTransition { .. })
    }

    /// Returns `true` if retrying later may succeed without user intervention.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable { .. } | Self::SubscriberDeliveryFailure { .. }
        )
    }

    /// Returns a machine-readable error code.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigurationTypeMismatch { .. } => "CONFIGURATION_TYPE_MISMATCH",
            Self::DeviceUnavailable { .. } => "DEVICE_UNAVAILABLE",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::SubscriberDeliveryFailure { .. } => "SUBSCRIBER_DELIVERY_FAILURE",
            Self::SensorNotRegistered(_) => "SENSOR_NOT_REGISTERED",
            Self::SensorAlreadyRegistered(_) => "SENSOR_ALREADY_REGISTERED",
            Self::ConfigValidation { .. } => "CONFIG_VALIDATION_ERROR",
            Self::MultipleValidationErrors(_) => "CONFIG_VALIDATION_ERRORS",
            Self::ConfigParse(_) => "CONFIG_PARSE_ERROR",
            Self::RecordParse { .. } => "RECORD_PARSE_ERROR",
            Self::WrongRecordKind { .. } => "WRONG_RECORD_KIND",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM LIBRARY ERRORS
// =============================================================================

impl From<config::ConfigError> for SensingError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

impl From<toml::ser::Error> for SensingError {
    fn from(err: toml::ser::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    fn mismatch() -> SensingError {
        SensingError::ConfigurationTypeMismatch {
            expected: SensorKind::Light,
            actual: SensorKind::Gyroscope,
        }
    }

    #[test]
    fn test_lifecycle_error_classification() {
        assert!(mismatch().is_lifecycle_error());
        assert!(SensingError::DeviceUnavailable {
            kind: SensorKind::Bluetooth,
            reason: "adapter disabled".into(),
        }
        .is_lifecycle_error());
        assert!(!SensingError::SensorNotRegistered(SensorKind::Light).is_lifecycle_error());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(mismatch().is_config_error());
        assert!(SensingError::ConfigParse("bad toml".into()).is_config_error());
        assert!(!SensingError::Io(IoErr::new(ErrorKind::NotFound, "x")).is_config_error());
    }

    #[test]
    fn test_state_transition_is_expected_state() {
        let err = SensingError::InvalidStateTransition {
            kind: SensorKind::Light,
            state: "active",
            operation: "start",
        };
        assert!(err.is_expected_state());
        assert!(!mismatch().is_expected_state());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(mismatch().error_code(), "CONFIGURATION_TYPE_MISMATCH");
        assert_eq!(
            SensingError::SubscriberDeliveryFailure {
                kind: SensorKind::Light,
                subscriber: "logger".into(),
                message: "disk full".into(),
            }
            .error_code(),
            "SUBSCRIBER_DELIVERY_FAILURE"
        );
    }

    #[test]
    fn test_error_display_messages() {
        assert_eq!(
            mismatch().to_string(),
            "Configuration for Gyroscope cannot be applied to a Light sensor"
        );

        let err = SensingError::MultipleValidationErrors(vec![
            SensingError::ConfigValidation {
                field: "a".into(),
                message: "bad".into(),
            },
            SensingError::ConfigValidation {
                field: "b".into(),
                message: "worse".into(),
            },
        ]);
        let text = err.to_string();
        assert!(text.starts_with("Configuration has 2 invalid values"));
        assert!(text.contains("'a': bad; "));
    }

    #[test]
    fn test_from_io_error() {
        let err: SensingError = IoErr::new(ErrorKind::NotFound, "file not found").into();
        assert!(matches!(err, SensingError::Io(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<SensingError>();
        assert_sync::<SensingError>();
    }
}
