// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound message seam.

use std::sync::Arc;

use rumqttc::{AsyncClient, QoS};

use super::{Channel, TopicTable};
use crate::error::ProtocolError;

/// Sink for outbound MQTT messages.
///
/// Publishing never waits on the network: implementations queue the
/// message and return.
pub trait Publisher: Send + Sync + 'static {
    /// Queues one message.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message cannot be queued.
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), ProtocolError>;
}

/// [`Publisher`] backed by a rumqttc client.
#[derive(Debug, Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub(crate) fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl Publisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), ProtocolError> {
        tracing::trace!(topic = %topic, payload = %payload, retain, "Publishing MQTT message");
        self.client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes().to_vec())
            .map_err(ProtocolError::Mqtt)
    }
}

/// Publishes channel values under the bridge's topic table.
///
/// Publish failures are logged and dropped: state is republished on the
/// next poll cycle anyway.
pub struct StatePublisher<P> {
    publisher: Arc<P>,
    topics: Arc<TopicTable>,
}

impl<P> Clone for StatePublisher<P> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
            topics: Arc::clone(&self.topics),
        }
    }
}

impl<P> std::fmt::Debug for StatePublisher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePublisher")
            .field("base", &self.topics.base())
            .finish_non_exhaustive()
    }
}

impl<P: Publisher> StatePublisher<P> {
    /// Creates a state publisher.
    #[must_use]
    pub fn new(publisher: Arc<P>, topics: Arc<TopicTable>) -> Self {
        Self { publisher, topics }
    }

    /// Returns the topic table.
    #[must_use]
    pub fn topics(&self) -> &TopicTable {
        &self.topics
    }

    /// Returns the underlying publisher.
    #[must_use]
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Publishes a non-retained value on a channel.
    pub fn publish(&self, channel: Channel, payload: &str) {
        self.send(channel, payload, false);
    }

    /// Publishes a retained value on a channel.
    pub fn publish_retained(&self, channel: Channel, payload: &str) {
        self.send(channel, payload, true);
    }

    fn send(&self, channel: Channel, payload: &str, retain: bool) {
        debug_assert!(!channel.is_command(), "publishing on command channel {channel}");
        let topic = self.topics.topic(channel);
        if let Err(e) = self.publisher.publish(&topic, payload, retain) {
            tracing::warn!(topic = %topic, error = %e, "Failed to publish");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// A message captured by [`RecordingPublisher`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Published {
        pub topic: String,
        pub payload: String,
        pub retain: bool,
    }

    /// Publisher that keeps every message in memory.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingPublisher {
        messages: Mutex<Vec<Published>>,
    }

    impl RecordingPublisher {
        pub(crate) fn messages(&self) -> Vec<Published> {
            self.messages.lock().clone()
        }

        pub(crate) fn payloads_on(&self, topic: &str) -> Vec<String> {
            self.messages
                .lock()
                .iter()
                .filter(|m| m.topic == topic)
                .map(|m| m.payload.clone())
                .collect()
        }

        pub(crate) fn clear(&self) {
            self.messages.lock().clear();
        }
    }

    impl Publisher for RecordingPublisher {
        fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), ProtocolError> {
            self.messages.lock().push(Published {
                topic: topic.to_string(),
                payload: payload.to_string(),
                retain,
            });
            Ok(())
        }
    }

    /// Returns a state publisher over a fresh recorder with the default topics.
    pub(crate) fn recording() -> (StatePublisher<RecordingPublisher>, Arc<RecordingPublisher>) {
        let recorder = Arc::new(RecordingPublisher::default());
        let out = StatePublisher::new(Arc::clone(&recorder), Arc::new(TopicTable::default()));
        (out, recorder)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::recording;
    use super::*;

    #[test]
    fn publishes_under_base_topic() {
        let (out, recorder) = recording();

        out.publish(Channel::PowerState, "ON");
        out.publish_retained(Channel::Status, "online");

        let messages = recorder.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].topic, "dieselheater/power/state");
        assert!(!messages[0].retain);
        assert_eq!(messages[1].topic, "dieselheater/status");
        assert_eq!(messages[1].payload, "online");
        assert!(messages[1].retain);
    }
}
