// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the heater bridge.
//!
//! Only startup failures (driver initialization, invalid broker settings)
//! surface as errors to the caller of [`Bridge::run`](crate::Bridge::run).
//! Everything that can go wrong at runtime is logged and contained so the
//! bridge keeps running unattended.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Error raised by the radio driver.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// Error occurred while talking to the MQTT broker.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A value could not be parsed or validated.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to value parsing and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The text is not a hexadecimal device address.
    #[error("invalid device address: {0:?}")]
    InvalidAddress(String),

    /// An invalid power state string was provided.
    #[error("invalid power state: {0:?}")]
    InvalidPowerState(String),

    /// An invalid heater mode string was provided.
    #[error("invalid heater mode: {0:?}")]
    InvalidMode(String),
}

/// Errors related to the radio driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The radio could not be brought up.
    #[error("driver initialization failed: {0}")]
    Initialization(String),

    /// The blocking task running a driver operation failed.
    #[error("driver task for {operation} failed: {message}")]
    TaskFailed {
        /// The driver operation that was running.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },
}

/// Errors related to MQTT communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A request could not be queued on the MQTT client.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The connection to the broker failed.
    #[error("connection failed: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::InvalidAddress("zz".to_string());
        assert_eq!(err.to_string(), "invalid device address: \"zz\"");
    }

    #[test]
    fn error_from_driver_error() {
        let err: Error = DriverError::Initialization("no radio".to_string()).into();
        assert!(matches!(err, Error::Driver(DriverError::Initialization(_))));
        assert_eq!(
            err.to_string(),
            "driver error: driver initialization failed: no radio"
        );
    }

    #[test]
    fn task_failed_display() {
        let err = DriverError::TaskFailed {
            operation: "poll_state",
            message: "panicked".to_string(),
        };
        assert_eq!(err.to_string(), "driver task for poll_state failed: panicked");
    }
}
