// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded-time address learning.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::driver::{DriverHandle, HeaterDriver};
use crate::types::DeviceAddress;

/// Progress of one pairing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairingState {
    /// Not started.
    #[default]
    Idle,
    /// Learn windows are being issued.
    Listening,
    /// The heater answered with its address.
    Succeeded(DeviceAddress),
    /// The budget ran out (or shutdown was requested) without an address.
    TimedOut,
}

impl PairingState {
    /// Returns the learned address, if any.
    #[must_use]
    pub const fn address(self) -> Option<DeviceAddress> {
        match self {
            Self::Succeeded(address) => Some(address),
            _ => None,
        }
    }

    /// Returns `true` once the session has an outcome.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::TimedOut)
    }
}

/// Repeats the driver's learn primitive until it yields an address or the
/// budget is spent.
///
/// A timeout is a normal outcome. The workflow never touches the active
/// address or the store: the caller applies a successful result.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dieselheater_mqtt::bridge::PairingWorkflow;
///
/// let workflow = PairingWorkflow::default().with_budget(Duration::from_secs(30));
/// assert_eq!(workflow.budget(), Duration::from_secs(30));
/// assert_eq!(workflow.attempt_timeout(), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingWorkflow {
    budget: Duration,
    attempt_timeout: Duration,
    retry_delay: Duration,
}

impl Default for PairingWorkflow {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(60),
            attempt_timeout: Duration::from_millis(500),
            retry_delay: Duration::from_millis(100),
        }
    }
}

impl PairingWorkflow {
    /// Sets the total time budget (default: 60 seconds).
    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Sets the length of one learn window (default: 500 ms).
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Sets the pause between learn windows (default: 100 ms).
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Returns the total time budget.
    #[must_use]
    pub fn budget(self) -> Duration {
        self.budget
    }

    /// Returns the length of one learn window.
    #[must_use]
    pub fn attempt_timeout(self) -> Duration {
        self.attempt_timeout
    }

    /// Returns the pause between learn windows.
    #[must_use]
    pub fn retry_delay(self) -> Duration {
        self.retry_delay
    }

    /// Runs one pairing session and returns its terminal state.
    ///
    /// Driver failures on a single attempt are logged and the session keeps
    /// listening. Cancellation is observed between attempts and ends the
    /// session as [`PairingState::TimedOut`].
    pub async fn pair<D: HeaterDriver>(
        &self,
        driver: &DriverHandle<D>,
        cancel: &CancellationToken,
    ) -> PairingState {
        let mut state = PairingState::Idle;
        let started = Instant::now();
        let mut attempts: u32 = 0;

        tracing::info!(budget_ms = duration_ms(self.budget), "Pairing started");

        while !state.is_finished() {
            if cancel.is_cancelled() {
                tracing::debug!(attempts, "Pairing interrupted by shutdown");
                state = PairingState::TimedOut;
                break;
            }

            state = PairingState::Listening;
            attempts += 1;

            match driver.learn_address(self.attempt_timeout).await {
                Ok(Some(address)) if address.is_set() => {
                    tracing::info!(%address, attempts, "Heater address learned");
                    state = PairingState::Succeeded(address);
                    continue;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, attempts, "Learn attempt failed"),
            }

            if started.elapsed() >= self.budget {
                tracing::info!(attempts, "Pairing timed out");
                state = PairingState::TimedOut;
                continue;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(self.retry_delay) => {}
            }
        }

        state
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SimulatedHeater;

    const ADDR: DeviceAddress = DeviceAddress::new(0x00AB_CDEF);

    fn quick() -> PairingWorkflow {
        PairingWorkflow::default()
            .with_budget(Duration::from_millis(60))
            .with_attempt_timeout(Duration::from_millis(5))
            .with_retry_delay(Duration::from_millis(5))
    }

    #[test]
    fn defaults() {
        let workflow = PairingWorkflow::default();
        assert_eq!(workflow.budget(), Duration::from_secs(60));
        assert_eq!(workflow.attempt_timeout(), Duration::from_millis(500));
        assert_eq!(workflow.retry_delay(), Duration::from_millis(100));
    }

    #[test]
    fn state_accessors() {
        assert_eq!(PairingState::default(), PairingState::Idle);
        assert_eq!(PairingState::Succeeded(ADDR).address(), Some(ADDR));
        assert_eq!(PairingState::TimedOut.address(), None);
        assert!(!PairingState::Listening.is_finished());
        assert!(PairingState::TimedOut.is_finished());
    }

    #[tokio::test]
    async fn learns_address_on_first_answer() {
        let heater = SimulatedHeater::new(ADDR).with_pairing_mode(true);
        let driver = DriverHandle::new(heater.clone());

        let state = quick().pair(&driver, &CancellationToken::new()).await;

        assert_eq!(state, PairingState::Succeeded(ADDR));
        assert_eq!(heater.learn_attempts(), 1);
        // The workflow itself never applies the address.
        assert_eq!(heater.address(), DeviceAddress::UNSET);
    }

    #[tokio::test]
    async fn times_out_when_heater_is_silent() {
        let heater = SimulatedHeater::new(ADDR);
        let driver = DriverHandle::new(heater.clone());

        let state = quick().pair(&driver, &CancellationToken::new()).await;

        assert_eq!(state, PairingState::TimedOut);
        assert!(heater.learn_attempts() > 1);
        assert_eq!(heater.address(), DeviceAddress::UNSET);
    }

    #[tokio::test]
    async fn cancelled_token_ends_immediately() {
        let heater = SimulatedHeater::new(ADDR).with_pairing_mode(true);
        let driver = DriverHandle::new(heater.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let state = PairingWorkflow::default().pair(&driver, &cancel).await;

        assert_eq!(state, PairingState::TimedOut);
        assert_eq!(heater.learn_attempts(), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_long_budget() {
        let heater = SimulatedHeater::new(ADDR);
        let driver = DriverHandle::new(heater);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let state = tokio::time::timeout(
            Duration::from_secs(5),
            PairingWorkflow::default().pair(&driver, &cancel),
        )
        .await
        .unwrap();

        assert_eq!(state, PairingState::TimedOut);
    }
}
