// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker session for the bridge.
//!
//! A [`BrokerSession`] owns the rumqttc event loop. The bridge drives it by
//! calling [`BrokerSession::next_event`] in its network loop; rumqttc
//! reconnects on the next poll after a connection error. The broker holds a
//! retained `offline` last will on the availability topic, so consumers see
//! the bridge go away even when it dies without a clean shutdown.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use dieselheater_mqtt::protocol::{BrokerConfig, BrokerSession, SessionEvent, TopicTable};
//!
//! # async fn example() -> dieselheater_mqtt::Result<()> {
//! let config = BrokerConfig::builder()
//!     .host("192.168.1.50")
//!     .credentials("user", "password")
//!     .build()?;
//! let mut session = BrokerSession::open(&config, Arc::new(TopicTable::default()))?;
//!
//! while let Ok(event) = session.next_event().await {
//!     if let SessionEvent::Message { topic, payload } = event {
//!         println!("{topic}: {payload}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS};

use super::{AVAILABILITY_OFFLINE, Channel, MqttPublisher, TopicTable};
use crate::error::ProtocolError;

/// Client identifier the bridge connects with.
pub const DEFAULT_CLIENT_ID: &str = "dieselheater-bridge";

/// Connection settings for the broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    host: String,
    port: u16,
    client_id: String,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    request_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            credentials: None,
            keep_alive: Duration::from_secs(30),
            request_capacity: 128,
        }
    }
}

impl BrokerConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> BrokerConfigBuilder {
        BrokerConfigBuilder::default()
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the MQTT client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns whether authentication is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Returns the keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }
}

/// Builder for [`BrokerConfig`].
#[derive(Debug, Default)]
pub struct BrokerConfigBuilder {
    config: BrokerConfig,
}

impl BrokerConfigBuilder {
    /// Sets the broker host address (default: `localhost`).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the client identifier (default: [`DEFAULT_CLIENT_ID`]).
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets how many outbound requests may be queued (default: 128).
    #[must_use]
    pub fn request_capacity(mut self, capacity: usize) -> Self {
        self.config.request_capacity = capacity;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidAddress`] if the host or client
    /// identifier is empty.
    pub fn build(self) -> Result<BrokerConfig, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }
        if self.config.client_id.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT client id is required".to_string(),
            ));
        }
        Ok(self.config)
    }
}

/// Something that happened on the broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The broker accepted the connection (first connect or reconnect).
    Connected,
    /// An inbound message on a subscribed topic.
    Message {
        /// Full topic.
        topic: String,
        /// UTF-8 payload.
        payload: String,
    },
    /// The broker closed the connection.
    Disconnected,
    /// Protocol traffic with nothing for the bridge to do.
    Idle,
}

/// A live broker session.
pub struct BrokerSession {
    client: AsyncClient,
    event_loop: EventLoop,
    topics: Arc<TopicTable>,
}

impl std::fmt::Debug for BrokerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerSession")
            .field("base", &self.topics.base())
            .finish_non_exhaustive()
    }
}

impl BrokerSession {
    /// Creates the client and event loop. No network traffic happens until
    /// [`next_event`](Self::next_event) is polled.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidAddress`] if the host is empty.
    pub fn open(config: &BrokerConfig, topics: Arc<TopicTable>) -> Result<Self, ProtocolError> {
        if config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);
        options.set_clean_session(true);
        options.set_last_will(LastWill::new(
            topics.topic(Channel::Status),
            AVAILABILITY_OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));

        if let Some((ref username, ref password)) = config.credentials {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, config.request_capacity);

        tracing::info!(
            host = %config.host,
            port = %config.port,
            client_id = %config.client_id,
            "Opened MQTT session"
        );

        Ok(Self {
            client,
            event_loop,
            topics,
        })
    }

    /// Returns a publisher sharing this session's client.
    #[must_use]
    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher::new(self.client.clone())
    }

    /// Returns the topic table.
    #[must_use]
    pub fn topics(&self) -> &TopicTable {
        &self.topics
    }

    /// Queues subscriptions for every command topic.
    ///
    /// # Errors
    ///
    /// Returns error if a subscription cannot be queued.
    pub fn subscribe_commands(&self) -> Result<(), ProtocolError> {
        for (_, topic) in self.topics.command_topics() {
            self.client
                .try_subscribe(topic.as_str(), QoS::AtLeastOnce)
                .map_err(ProtocolError::Mqtt)?;
            tracing::debug!(topic = %topic, "Subscribed to command topic");
        }
        Ok(())
    }

    /// Drives the connection until the next event.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Connection`] on network or protocol errors.
    /// Polling again after an error reconnects.
    pub async fn next_event(&mut self) -> Result<SessionEvent, ProtocolError> {
        match self.event_loop.poll().await? {
            Event::Incoming(Packet::ConnAck(connack)) => {
                tracing::debug!(?connack, "MQTT broker connected");
                Ok(SessionEvent::Connected)
            }
            Event::Incoming(Packet::SubAck(suback)) => {
                tracing::trace!(?suback, "MQTT subscription acknowledged");
                Ok(SessionEvent::Idle)
            }
            Event::Incoming(Packet::Publish(publish)) => {
                match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => {
                        tracing::debug!(
                            topic = %publish.topic,
                            payload = %payload,
                            "MQTT message received"
                        );
                        Ok(SessionEvent::Message {
                            topic: publish.topic,
                            payload,
                        })
                    }
                    Err(_) => {
                        tracing::debug!(topic = %publish.topic, "Ignoring non UTF-8 payload");
                        Ok(SessionEvent::Idle)
                    }
                }
            }
            Event::Incoming(Packet::Disconnect) => {
                tracing::info!("MQTT broker disconnected");
                Ok(SessionEvent::Disconnected)
            }
            _ => Ok(SessionEvent::Idle),
        }
    }

    /// Publishes the retained `offline` status and disconnects.
    ///
    /// Keeps polling the event loop for up to `drain_timeout` so that the
    /// queued messages reach the broker.
    pub async fn close(mut self, drain_timeout: Duration) {
        let status = self.topics.topic(Channel::Status);
        if let Err(e) = self.client.try_publish(
            status.as_str(),
            QoS::AtLeastOnce,
            true,
            AVAILABILITY_OFFLINE.as_bytes().to_vec(),
        ) {
            tracing::warn!(topic = %status, error = %e, "Failed to queue offline status");
        }
        if let Err(e) = self.client.try_disconnect() {
            tracing::warn!(error = %e, "Failed to queue MQTT disconnect");
        }

        let drain = async {
            loop {
                match self.event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(error = %e, "MQTT event loop closed");
                        break;
                    }
                }
            }
        };

        if tokio::time::timeout(drain_timeout, drain).await.is_err() {
            tracing::warn!(
                timeout_ms = u64::try_from(drain_timeout.as_millis()).unwrap_or(u64::MAX),
                "Timed out flushing MQTT session"
            );
        }

        tracing::info!("MQTT session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_default_values() {
        let config = BrokerConfig::builder().build().unwrap();
        assert_eq!(config.host(), "localhost");
        assert_eq!(config.port(), 1883);
        assert_eq!(config.client_id(), DEFAULT_CLIENT_ID);
        assert!(!config.has_credentials());
        assert_eq!(config.keep_alive(), Duration::from_secs(30));
    }

    #[test]
    fn builder_chain() {
        let config = BrokerConfig::builder()
            .host("192.168.1.50")
            .port(8883)
            .client_id("garage-heater")
            .credentials("admin", "secret")
            .keep_alive(Duration::from_secs(45))
            .build()
            .unwrap();

        assert_eq!(config.host(), "192.168.1.50");
        assert_eq!(config.port(), 8883);
        assert_eq!(config.client_id(), "garage-heater");
        assert!(config.has_credentials());
        assert_eq!(config.keep_alive(), Duration::from_secs(45));
    }

    #[test]
    fn builder_missing_host_fails() {
        let err = BrokerConfig::builder().host("").build().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidAddress(_)));
    }

    #[test]
    fn builder_missing_client_id_fails() {
        let err = BrokerConfig::builder().client_id("").build().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn open_does_not_touch_the_network() {
        let config = BrokerConfig::builder().host("127.0.0.1").port(1).build().unwrap();
        let session = BrokerSession::open(&config, Arc::new(TopicTable::default())).unwrap();

        session.subscribe_commands().unwrap();
        assert_eq!(session.topics().base(), "dieselheater");
    }
}
