// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Radio driver seam.
//!
//! The bridge talks to the heater through the [`HeaterDriver`] trait. Its
//! methods block for up to the timeout they are given, the way a
//! bit-banged radio transceiver does. [`DriverHandle`] moves each call onto
//! the blocking thread pool and serializes them behind a mutex, so the
//! state poller and the command router never drive the radio at the same
//! instant.
//!
//! [`SimulatedHeater`] implements the trait without hardware.

mod simulated;

pub use simulated::SimulatedHeater;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::DriverError;
use crate::state::DeviceStateSnapshot;
use crate::types::{CommandKind, DeviceAddress};

/// Operations offered by a heater radio driver.
///
/// Absence results (`None`) are normal outcomes: no heater announced itself
/// during a learn window, or no state frame arrived before the timeout.
pub trait HeaterDriver: Send + 'static {
    /// Brings up the radio.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Initialization`] if the hardware cannot be
    /// configured. The bridge cannot run without it.
    fn initialize(&mut self) -> Result<(), DriverError>;

    /// Listens for a heater in pairing mode for up to `timeout`.
    fn learn_address(&mut self, timeout: Duration) -> Option<DeviceAddress>;

    /// Sets the address used for subsequent commands and polls.
    fn set_address(&mut self, address: DeviceAddress);

    /// Transmits one command to the heater at the active address.
    fn send_command(&mut self, command: CommandKind);

    /// Waits up to `timeout` for a state frame from the heater.
    fn poll_state(&mut self, timeout: Duration) -> Option<DeviceStateSnapshot>;
}

/// Shared, serialized access to a [`HeaterDriver`].
///
/// Cloning the handle shares the same driver.
pub struct DriverHandle<D> {
    inner: Arc<Mutex<D>>,
}

impl<D> Clone for DriverHandle<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D> std::fmt::Debug for DriverHandle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverHandle")
            .field("busy", &self.inner.is_locked())
            .finish()
    }
}

impl<D: HeaterDriver> DriverHandle<D> {
    /// Wraps a driver.
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self {
            inner: Arc::new(Mutex::new(driver)),
        }
    }

    /// Runs one driver operation on the blocking pool while holding the lock.
    async fn call<R, F>(&self, operation: &'static str, f: F) -> Result<R, DriverError>
    where
        R: Send + 'static,
        F: FnOnce(&mut D) -> R + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut driver = inner.lock();
            f(&mut driver)
        })
        .await
        .map_err(|e| DriverError::TaskFailed {
            operation,
            message: e.to_string(),
        })
    }

    /// Initializes the radio.
    ///
    /// # Errors
    ///
    /// Returns the driver's initialization error, or
    /// [`DriverError::TaskFailed`] if the blocking task panicked.
    pub async fn initialize(&self) -> Result<(), DriverError> {
        self.call("initialize", |d| d.initialize()).await?
    }

    /// Runs one bounded learn window.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::TaskFailed`] if the blocking task panicked.
    pub async fn learn_address(
        &self,
        timeout: Duration,
    ) -> Result<Option<DeviceAddress>, DriverError> {
        self.call("learn_address", move |d| d.learn_address(timeout))
            .await
    }

    /// Sets the active address.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::TaskFailed`] if the blocking task panicked.
    pub async fn set_address(&self, address: DeviceAddress) -> Result<(), DriverError> {
        self.call("set_address", move |d| d.set_address(address))
            .await
    }

    /// Transmits one command.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::TaskFailed`] if the blocking task panicked.
    pub async fn send_command(&self, command: CommandKind) -> Result<(), DriverError> {
        self.call("send_command", move |d| d.send_command(command))
            .await
    }

    /// Waits for one state frame.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::TaskFailed`] if the blocking task panicked.
    pub async fn poll_state(
        &self,
        timeout: Duration,
    ) -> Result<Option<DeviceStateSnapshot>, DriverError> {
        self.call("poll_state", move |d| d.poll_state(timeout)).await
    }
}
