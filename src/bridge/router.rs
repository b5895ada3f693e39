// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound command handling.
//!
//! | Topic        | Payload            | Effect                                     |
//! |--------------|--------------------|--------------------------------------------|
//! | `power/set`  | `ON` / `OFF`       | `POWER` only if the heater is not there yet |
//! | `mode/set`   | anything           | `MODE`; `mode/state` echoed for valid modes |
//! | `pair/set`   | `ON`               | pairing session, `pair/state` pulse         |
//! | `cmd/*`      | anything           | raw command                                 |
//!
//! Device-directed commands are dropped while the bridge is not paired.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::PairingWorkflow;
use crate::driver::{DriverHandle, HeaterDriver};
use crate::protocol::{Channel, Publisher, StatePublisher};
use crate::state::SharedState;
use crate::store::AddressStore;
use crate::types::{CommandKind, DeviceAddress, HeaterMode, PowerState};

/// A message received on one of the command topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    /// Full topic.
    pub topic: String,
    /// Payload text.
    pub payload: String,
}

impl InboundCommand {
    /// Creates an inbound command.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Translates inbound messages into driver actions.
///
/// Messages are handled one at a time. A pairing session runs inline, so
/// nothing else is handled until it ends.
pub struct CommandRouter<D, P> {
    driver: DriverHandle<D>,
    state: SharedState,
    store: AddressStore,
    out: StatePublisher<P>,
    pairing: PairingWorkflow,
    cancel: CancellationToken,
}

impl<D: HeaterDriver, P: Publisher> CommandRouter<D, P> {
    /// Creates a router. `cancel` interrupts a running pairing session.
    #[must_use]
    pub fn new(
        driver: DriverHandle<D>,
        state: SharedState,
        store: AddressStore,
        out: StatePublisher<P>,
        pairing: PairingWorkflow,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            driver,
            state,
            store,
            out,
            pairing,
            cancel,
        }
    }

    /// Handles one inbound message.
    pub async fn handle(&self, topic: &str, payload: &str) {
        let Some(channel) = self.out.topics().resolve(topic) else {
            tracing::debug!(topic = %topic, "Ignoring message on unknown topic");
            return;
        };

        if channel == Channel::PairSet {
            self.pair(payload).await;
            return;
        }

        if !self.state.address().is_set() {
            tracing::debug!(%channel, "Heater not paired, ignoring command");
            return;
        }

        match channel {
            Channel::PowerSet => self.set_power(payload).await,
            Channel::ModeSet => self.set_mode(payload).await,
            Channel::CmdWakeup => self.send(CommandKind::Wakeup).await,
            Channel::CmdMode => self.send(CommandKind::Mode).await,
            Channel::CmdPower => self.send(CommandKind::Power).await,
            Channel::CmdUp => self.send(CommandKind::Up).await,
            Channel::CmdDown => self.send(CommandKind::Down).await,
            _ => {}
        }
    }

    /// Handles messages from `inbound` until it closes or `cancel` fires.
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundCommand>) {
        tracing::debug!("Command worker started");

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                message = inbound.recv() => match message {
                    Some(message) => self.handle(&message.topic, &message.payload).await,
                    None => break,
                },
            }
        }

        tracing::debug!("Command worker stopped");
    }

    async fn set_power(&self, payload: &str) {
        let intent = match payload.parse::<PowerState>() {
            Ok(intent) => intent,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring power request");
                return;
            }
        };

        // No frame yet counts as off.
        let observed = self
            .state
            .snapshot()
            .map_or(PowerState::Off, |s| s.power_state());

        if observed == intent {
            tracing::debug!(%intent, "Heater already in requested power state");
        } else {
            tracing::info!(%observed, %intent, "Toggling heater power");
            self.send(CommandKind::Power).await;
        }

        self.out.publish(Channel::PowerState, intent.as_str());
    }

    async fn set_mode(&self, payload: &str) {
        // The radio only knows a mode toggle, so it is sent whatever the payload.
        self.send(CommandKind::Mode).await;

        if let Ok(mode) = payload.parse::<HeaterMode>() {
            self.out.publish(Channel::ModeState, mode.as_str());
        }
    }

    async fn pair(&self, payload: &str) {
        if !payload.eq_ignore_ascii_case(PowerState::On.as_str()) {
            tracing::debug!(payload = %payload, "Ignoring pairing request");
            return;
        }

        self.out.publish(Channel::PairState, PowerState::On.as_str());

        let outcome = self.pairing.pair(&self.driver, &self.cancel).await;
        match outcome.address() {
            Some(address) => {
                if let Err(e) = self.driver.set_address(address).await {
                    tracing::warn!(error = %e, "Failed to apply heater address");
                }
                self.state.set_address(address);
                self.persist(address).await;
                tracing::info!(%address, "Heater paired");
            }
            None => tracing::info!("No heater address learned"),
        }

        self.out.publish(Channel::PairState, PowerState::Off.as_str());
    }

    /// Writes the address file off the async worker threads.
    async fn persist(&self, address: DeviceAddress) {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.save(address)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                path = %self.store.path().display(),
                error = %e,
                "Failed to persist heater address"
            ),
            Err(e) => tracing::warn!(error = %e, "Address persistence task failed"),
        }
    }

    async fn send(&self, command: CommandKind) {
        tracing::debug!(%command, code = command.code(), "Sending heater command");
        if let Err(e) = self.driver.send_command(command).await {
            tracing::warn!(%command, error = %e, "Failed to send heater command");
        }
    }
}
