// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic telemetry polling.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::driver::{DriverHandle, HeaterDriver};
use crate::protocol::{Channel, Publisher, StatePublisher};
use crate::state::{DeviceStateSnapshot, SharedState};

/// Background unit that polls the heater and republishes its telemetry.
pub struct StatePoller<D, P> {
    driver: DriverHandle<D>,
    state: SharedState,
    out: StatePublisher<P>,
    interval: Duration,
    timeout: Duration,
}

impl<D: HeaterDriver, P: Publisher> StatePoller<D, P> {
    /// Creates a poller.
    #[must_use]
    pub fn new(
        driver: DriverHandle<D>,
        state: SharedState,
        out: StatePublisher<P>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            driver,
            state,
            out,
            interval,
            timeout,
        }
    }

    /// Runs one poll cycle. Returns `true` if a frame was received.
    ///
    /// Without a paired address, or when no frame arrives within the poll
    /// timeout, nothing is published and the stored snapshot is kept.
    pub async fn poll_once(&self) -> bool {
        if !self.state.address().is_set() {
            tracing::trace!("Skipping poll, heater not paired");
            return false;
        }

        let snapshot = match self.driver.poll_state(self.timeout).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!("No state frame received");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "State poll failed");
                return false;
            }
        };

        self.state.replace_snapshot(snapshot);
        self.publish(&snapshot);

        tracing::debug!(
            state = %snapshot.state_code,
            ambient_temp = snapshot.ambient_temp,
            "Published heater state"
        );
        true
    }

    /// Polls until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::debug!(
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "State poller started"
        );

        while !cancel.is_cancelled() {
            self.poll_once().await;

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::debug!("State poller stopped");
    }

    fn publish(&self, s: &DeviceStateSnapshot) {
        let out = &self.out;
        out.publish(Channel::AmbientTemp, &s.ambient_temp.to_string());
        out.publish(Channel::CaseTemp, &s.case_temp.to_string());
        out.publish(Channel::Voltage, &format!("{:.1}", s.voltage));
        out.publish(Channel::PumpFreq, &format!("{:.1}", s.pump_freq));
        out.publish(Channel::Setpoint, &s.setpoint.to_string());
        out.publish(Channel::StateCode, &s.state_code.code().to_string());
        out.publish(Channel::StateText, s.state_code.label());
        out.publish(Channel::Rssi, &s.rssi.to_string());
        out.publish(Channel::PowerState, s.power_state().as_str());
        out.publish(Channel::ModeState, s.mode().as_str());
        out.publish(Channel::StateRaw, &s.to_json());
    }
}
