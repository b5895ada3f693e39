// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration.

use std::path::PathBuf;
use std::time::Duration;

use super::PairingWorkflow;
use crate::discovery::DiscoveryConfig;
use crate::protocol::{BrokerConfig, TopicTable};

/// Everything the bridge needs to run.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dieselheater_mqtt::bridge::BridgeConfig;
/// use dieselheater_mqtt::protocol::BrokerConfig;
///
/// # fn example() -> dieselheater_mqtt::Result<()> {
/// let config = BridgeConfig::new(BrokerConfig::builder().host("10.0.0.2").build()?)
///     .with_base_topic("van/heater")
///     .with_address_file("/var/lib/heater/address")
///     .with_poll_interval(Duration::from_secs(10));
///
/// assert_eq!(config.topics().base(), "van/heater");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Broker connection settings.
    pub broker: BrokerConfig,
    /// Base topic prefix.
    pub base_topic: String,
    /// Home Assistant discovery identity.
    pub discovery: DiscoveryConfig,
    /// File holding the learned heater address.
    pub address_file: PathBuf,
    /// Pause between two state polls.
    pub poll_interval: Duration,
    /// How long one poll waits for a state frame.
    pub poll_timeout: Duration,
    /// Pairing timings.
    pub pairing: PairingWorkflow,
    /// Backoff after connection errors.
    pub reconnection: ReconnectionPolicy,
    /// Inbound messages buffered while a command is being handled.
    pub command_queue: usize,
    /// How long shutdown waits for the broker to flush.
    pub shutdown_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

impl BridgeConfig {
    /// Creates a configuration with default settings for the given broker.
    #[must_use]
    pub fn new(broker: BrokerConfig) -> Self {
        Self {
            broker,
            base_topic: "dieselheater".to_string(),
            discovery: DiscoveryConfig::default(),
            address_file: PathBuf::from("heater_address.txt"),
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(2),
            pairing: PairingWorkflow::default(),
            reconnection: ReconnectionPolicy::default(),
            command_queue: 128,
            shutdown_timeout: Duration::from_secs(2),
        }
    }

    /// Sets the base topic prefix.
    #[must_use]
    pub fn with_base_topic(mut self, base: impl Into<String>) -> Self {
        self.base_topic = base.into();
        self
    }

    /// Sets the discovery identity.
    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Sets the address file.
    #[must_use]
    pub fn with_address_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.address_file = path.into();
        self
    }

    /// Sets the pause between state polls.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets how long one poll waits for a frame.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the pairing timings.
    #[must_use]
    pub fn with_pairing(mut self, pairing: PairingWorkflow) -> Self {
        self.pairing = pairing;
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_reconnection(mut self, policy: ReconnectionPolicy) -> Self {
        self.reconnection = policy;
        self
    }

    /// Sets the inbound command queue capacity (minimum 1).
    #[must_use]
    pub fn with_command_queue(mut self, capacity: usize) -> Self {
        self.command_queue = capacity.max(1);
        self
    }

    /// Sets the shutdown flush timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Returns the topic table for the configured base.
    #[must_use]
    pub fn topics(&self) -> TopicTable {
        TopicTable::new(self.base_topic.clone())
    }
}

/// Backoff between broker reconnection attempts.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dieselheater_mqtt::bridge::ReconnectionPolicy;
///
/// let policy = ReconnectionPolicy::new()
///     .with_max_retries(5)
///     .with_initial_delay(Duration::from_millis(500))
///     .with_max_delay(Duration::from_secs(10));
///
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectionPolicy {
    /// Maximum number of consecutive retries (None = infinite).
    pub max_retries: Option<u32>,
    /// Delay before the first retry. Each further retry doubles it.
    pub initial_delay: Duration,
    /// Upper bound on the delay.
    pub max_delay: Duration,
}

impl ReconnectionPolicy {
    /// Creates a policy that retries forever, from 1 s up to 30 s.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives up after `max_retries` consecutive failures.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the upper bound on the delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Returns the delay before retry number `attempt` (0-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Returns `true` if retry number `attempt` is allowed.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_retries.is_none_or(|max| attempt < max)
    }
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_defaults() {
        let config = BridgeConfig::default();

        assert_eq!(config.base_topic, "dieselheater");
        assert_eq!(config.address_file, PathBuf::from("heater_address.txt"));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.poll_timeout, Duration::from_secs(2));
        assert_eq!(config.pairing.budget(), Duration::from_secs(60));
        assert_eq!(config.command_queue, 128);
        assert_eq!(config.discovery.prefix(), "homeassistant");
    }

    #[test]
    fn bridge_with_options() {
        let config = BridgeConfig::default()
            .with_base_topic("garage/heater/")
            .with_address_file("/tmp/addr")
            .with_poll_interval(Duration::from_secs(1))
            .with_command_queue(0);

        assert_eq!(config.topics().base(), "garage/heater");
        assert_eq!(config.address_file, PathBuf::from("/tmp/addr"));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.command_queue, 1);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = ReconnectionPolicy::new();

        let delays: Vec<u64> = (0..7)
            .map(|attempt| policy.delay_for_attempt(attempt).as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn short_test_delays_stay_below_the_cap() {
        let policy = ReconnectionPolicy::new()
            .with_initial_delay(Duration::from_millis(50))
            .with_max_delay(Duration::from_millis(200));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(200));
    }

    #[test]
    fn retries_are_unbounded_unless_limited() {
        assert!(ReconnectionPolicy::default().should_retry(u32::MAX - 1));

        let bounded = ReconnectionPolicy::new().with_max_retries(2);
        let allowed: Vec<bool> = (0..4).map(|attempt| bounded.should_retry(attempt)).collect();
        assert_eq!(allowed, vec![true, true, false, false]);
    }
}
