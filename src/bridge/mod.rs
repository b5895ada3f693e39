// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bridge controller.
//!
//! [`Bridge::run`] wires the pieces together and supervises three units:
//!
//! - the **network loop** (in `run` itself) drives the broker session,
//!   re-announces the bridge on every connect and forwards inbound
//!   messages to a bounded queue
//! - the **command worker** drains that queue through a [`CommandRouter`];
//!   a pairing session blocks it, but not the network loop
//! - the **state poller** ([`StatePoller`]) republishes telemetry
//!
//! All three share one [`SharedState`] and one [`DriverHandle`], which
//! serializes driver calls.
//!
//! # Examples
//!
//! ```no_run
//! use dieselheater_mqtt::bridge::{Bridge, BridgeConfig};
//! use dieselheater_mqtt::driver::SimulatedHeater;
//! use dieselheater_mqtt::types::DeviceAddress;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> dieselheater_mqtt::Result<()> {
//! let bridge = Bridge::new(
//!     BridgeConfig::default().with_address_file("/var/lib/heater/address"),
//!     SimulatedHeater::new(DeviceAddress::new(0x00AB_CDEF)),
//! );
//!
//! let cancel = CancellationToken::new();
//! let stop = cancel.clone();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     stop.cancel();
//! });
//!
//! bridge.run(cancel).await
//! # }
//! ```

mod config;
mod pairing;
mod poller;
mod router;

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use config::{BridgeConfig, ReconnectionPolicy};
pub use pairing::{PairingState, PairingWorkflow};
pub use poller::StatePoller;
pub use router::{CommandRouter, InboundCommand};

use crate::discovery::Discovery;
use crate::driver::{DriverHandle, HeaterDriver};
use crate::error::{DriverError, Result};
use crate::protocol::{AVAILABILITY_ONLINE, BrokerSession, Channel, SessionEvent, StatePublisher};
use crate::state::SharedState;
use crate::store::AddressStore;

/// Long-running bridge between one heater and the broker.
pub struct Bridge<D> {
    config: BridgeConfig,
    driver: DriverHandle<D>,
}

impl<D> std::fmt::Debug for Bridge<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<D: HeaterDriver> Bridge<D> {
    /// Creates a bridge for `driver`.
    #[must_use]
    pub fn new(config: BridgeConfig, driver: D) -> Self {
        Self {
            config,
            driver: DriverHandle::new(driver),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Runs the bridge until `cancel` fires.
    ///
    /// Connection errors are retried according to the configured
    /// [`ReconnectionPolicy`]. On return the poller and the command worker
    /// have stopped and the retained `offline` status has been flushed.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to initialize, if the broker
    /// session cannot be created, or if the reconnection policy gives up.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let Self { config, driver } = self;

        driver.initialize().await?;
        tracing::info!("Heater radio initialized");

        let state = SharedState::default();
        let store = AddressStore::new(config.address_file.clone());
        let address = store.load();
        if address.is_set() {
            driver.set_address(address).await?;
            state.set_address(address);
            tracing::info!(%address, "Using stored heater address");
        } else {
            tracing::info!("Heater not paired yet, waiting for a pairing request");
        }

        let topics = Arc::new(config.topics());
        let mut session = BrokerSession::open(&config.broker, Arc::clone(&topics))?;
        let out = StatePublisher::new(Arc::new(session.publisher()), Arc::clone(&topics));
        let discovery = Discovery::new(&config.discovery, &topics);

        let worker_cancel = cancel.child_token();
        let poller_cancel = cancel.child_token();

        let (inbound, queue) = mpsc::channel(config.command_queue);
        let router = CommandRouter::new(
            driver.clone(),
            state.clone(),
            store,
            out.clone(),
            config.pairing,
            worker_cancel.clone(),
        );
        let worker = tokio::spawn(router.run(queue));
        let mut poller: Option<JoinHandle<()>> = None;

        let mut failures: u32 = 0;
        let outcome: Result<()> = loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break Ok(()),
                event = session.next_event() => event,
            };

            match event {
                Ok(SessionEvent::Connected) => {
                    failures = 0;
                    tracing::info!(
                        host = %config.broker.host(),
                        port = config.broker.port(),
                        "Connected to MQTT broker"
                    );

                    if let Err(e) = session.subscribe_commands() {
                        tracing::warn!(error = %e, "Failed to subscribe to command topics");
                    }
                    discovery.publish(out.publisher());

                    if poller.is_none() {
                        let task = StatePoller::new(
                            driver.clone(),
                            state.clone(),
                            out.clone(),
                            config.poll_interval,
                            config.poll_timeout,
                        );
                        poller = Some(tokio::spawn(task.run(poller_cancel.clone())));
                    }

                    out.publish_retained(Channel::Status, AVAILABILITY_ONLINE);
                }
                Ok(SessionEvent::Message { topic, payload }) => {
                    match inbound.try_send(InboundCommand { topic, payload }) {
                        Ok(()) => {}
                        Err(TrySendError::Full(dropped)) => {
                            tracing::warn!(topic = %dropped.topic, "Command queue full, dropping message");
                        }
                        Err(TrySendError::Closed(_)) => {
                            break Err(DriverError::TaskFailed {
                                operation: "command worker",
                                message: "worker stopped unexpectedly".to_string(),
                            }
                            .into());
                        }
                    }
                }
                Ok(SessionEvent::Disconnected | SessionEvent::Idle) => {}
                Err(e) => {
                    if !config.reconnection.should_retry(failures) {
                        tracing::error!(error = %e, attempts = failures, "Giving up on MQTT broker");
                        break Err(e.into());
                    }

                    let delay = config.reconnection.delay_for_attempt(failures);
                    failures = failures.saturating_add(1);
                    tracing::warn!(
                        error = %e,
                        attempt = failures,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "MQTT connection error, retrying"
                    );

                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break Ok(()),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        tracing::info!("Stopping bridge");

        worker_cancel.cancel();
        poller_cancel.cancel();
        drop(inbound);

        if let Some(poller) = poller
            && let Err(e) = poller.await
        {
            tracing::warn!(error = %e, "State poller task failed");
        }
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "Command worker task failed");
        }

        session.close(config.shutdown_timeout).await;

        outcome
    }
}
