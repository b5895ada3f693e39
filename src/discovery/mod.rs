// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant MQTT discovery.
//!
//! Each entity is announced with a retained JSON config on
//!
//! ```text
//! <prefix>/<component>/<node_id>/<object_id>/config
//! ```
//!
//! Home Assistant builds the entities from these configs and tracks the
//! bridge through the availability topic, so the configs are published
//! again on every broker (re)connect.
//!
//! # Examples
//!
//! ```
//! use dieselheater_mqtt::discovery::{Discovery, DiscoveryConfig};
//! use dieselheater_mqtt::protocol::TopicTable;
//!
//! let discovery = Discovery::new(&DiscoveryConfig::default(), &TopicTable::default());
//! let messages = discovery.messages();
//!
//! assert!(messages
//!     .iter()
//!     .any(|m| m.topic == "homeassistant/switch/dieselheater/power/config"));
//! ```

use serde::Serialize;

use crate::protocol::{AVAILABILITY_OFFLINE, AVAILABILITY_ONLINE, Channel, Publisher, TopicTable};

/// Home Assistant entity platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// On/off entity with a command topic.
    Switch,
    /// Entity choosing among fixed options.
    Select,
    /// Read-only value.
    Sensor,
    /// Stateless trigger.
    Button,
}

impl Component {
    /// Returns the platform name used in discovery topics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Switch => "switch",
            Self::Select => "select",
            Self::Sensor => "sensor",
            Self::Button => "button",
        }
    }
}

/// Identity of the announced device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    prefix: String,
    node_id: String,
    device_name: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            prefix: "homeassistant".to_string(),
            node_id: "dieselheater".to_string(),
            device_name: "Diesel Heater".to_string(),
        }
    }
}

impl DiscoveryConfig {
    /// Sets the discovery prefix (default: `homeassistant`).
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        self.prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Sets the node id used in topics and unique ids (default: `dieselheater`).
    #[must_use]
    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = node_id.into();
        self
    }

    /// Sets the device name shown in Home Assistant.
    #[must_use]
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Returns the discovery prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the node id.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

#[derive(Debug, Clone, Serialize)]
struct DeviceInfo {
    identifiers: Vec<String>,
    name: String,
    manufacturer: &'static str,
    model: &'static str,
    sw_version: &'static str,
}

#[derive(Debug, Serialize)]
struct EntityConfig<'a> {
    name: &'a str,
    unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    command_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_off: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_press: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'static [&'static str]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity_category: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'static str>,
    availability_topic: String,
    payload_available: &'static str,
    payload_not_available: &'static str,
    device: &'a DeviceInfo,
}

/// Static description of one entity.
struct Entity {
    component: Component,
    object_id: &'static str,
    name: &'static str,
    command: Option<Channel>,
    state: Option<Channel>,
    unit: Option<&'static str>,
    device_class: Option<&'static str>,
    state_class: Option<&'static str>,
    diagnostic: bool,
    icon: Option<&'static str>,
}

impl Entity {
    const fn new(component: Component, object_id: &'static str, name: &'static str) -> Self {
        Self {
            component,
            object_id,
            name,
            command: None,
            state: None,
            unit: None,
            device_class: None,
            state_class: None,
            diagnostic: false,
            icon: None,
        }
    }

    const fn command(mut self, channel: Channel) -> Self {
        self.command = Some(channel);
        self
    }

    const fn state(mut self, channel: Channel) -> Self {
        self.state = Some(channel);
        self
    }

    const fn measurement(mut self, unit: &'static str, device_class: &'static str) -> Self {
        self.unit = Some(unit);
        self.device_class = Some(device_class);
        self.state_class = Some("measurement");
        self
    }

    const fn diagnostic(mut self) -> Self {
        self.diagnostic = true;
        self
    }

    const fn icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }
}

const MODE_OPTIONS: &[&str] = &["auto", "manual"];

const ENTITIES: [Entity; 14] = [
    Entity::new(Component::Switch, "power", "Power")
        .command(Channel::PowerSet)
        .state(Channel::PowerState)
        .icon("mdi:radiator"),
    Entity::new(Component::Switch, "pair", "Pairing")
        .command(Channel::PairSet)
        .state(Channel::PairState)
        .icon("mdi:link-variant"),
    Entity::new(Component::Select, "mode", "Mode")
        .command(Channel::ModeSet)
        .state(Channel::ModeState),
    Entity::new(Component::Sensor, "ambient_temp", "Ambient temperature")
        .state(Channel::AmbientTemp)
        .measurement("°C", "temperature"),
    Entity::new(Component::Sensor, "case_temp", "Case temperature")
        .state(Channel::CaseTemp)
        .measurement("°C", "temperature"),
    Entity::new(Component::Sensor, "voltage", "Supply voltage")
        .state(Channel::Voltage)
        .measurement("V", "voltage"),
    Entity::new(Component::Sensor, "pump_freq", "Pump frequency")
        .state(Channel::PumpFreq)
        .measurement("Hz", "frequency"),
    Entity::new(Component::Sensor, "setpoint", "Setpoint")
        .state(Channel::Setpoint)
        .measurement("°C", "temperature")
        .icon("mdi:thermometer-lines"),
    Entity::new(Component::Sensor, "state_code", "State code")
        .state(Channel::StateCode)
        .diagnostic(),
    Entity::new(Component::Sensor, "state_text", "State")
        .state(Channel::StateText)
        .icon("mdi:fire"),
    Entity::new(Component::Sensor, "rssi", "Signal strength")
        .state(Channel::Rssi)
        .measurement("dBm", "signal_strength")
        .diagnostic(),
    Entity::new(Component::Button, "wakeup", "Wake up")
        .command(Channel::CmdWakeup)
        .icon("mdi:bell-ring"),
    Entity::new(Component::Button, "up", "Setpoint up")
        .command(Channel::CmdUp)
        .icon("mdi:chevron-up"),
    Entity::new(Component::Button, "down", "Setpoint down")
        .command(Channel::CmdDown)
        .icon("mdi:chevron-down"),
];

/// A retained discovery config ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMessage {
    /// Config topic.
    pub topic: String,
    /// JSON payload.
    pub payload: String,
}

/// Builds and publishes the discovery configs of the heater.
#[derive(Debug, Clone)]
pub struct Discovery {
    messages: Vec<DiscoveryMessage>,
}

impl Discovery {
    /// Renders every entity config for the given topic table.
    #[must_use]
    pub fn new(config: &DiscoveryConfig, topics: &TopicTable) -> Self {
        let device = DeviceInfo {
            identifiers: vec![config.node_id.clone()],
            name: config.device_name.clone(),
            manufacturer: "Generic",
            model: "Diesel air heater (433 MHz)",
            sw_version: env!("CARGO_PKG_VERSION"),
        };
        let availability = topics.topic(Channel::Status);

        let messages = ENTITIES
            .iter()
            .filter_map(|entity| {
                let payload = EntityConfig {
                    name: entity.name,
                    unique_id: format!("{}_{}", config.node_id, entity.object_id),
                    command_topic: entity.command.map(|c| topics.topic(c)),
                    state_topic: entity.state.map(|c| topics.topic(c)),
                    payload_on: (entity.component == Component::Switch).then_some("ON"),
                    payload_off: (entity.component == Component::Switch).then_some("OFF"),
                    payload_press: (entity.component == Component::Button).then_some("PRESS"),
                    options: (entity.component == Component::Select).then_some(MODE_OPTIONS),
                    unit_of_measurement: entity.unit,
                    device_class: entity.device_class,
                    state_class: entity.state_class,
                    entity_category: entity.diagnostic.then_some("diagnostic"),
                    icon: entity.icon,
                    availability_topic: availability.clone(),
                    payload_available: AVAILABILITY_ONLINE,
                    payload_not_available: AVAILABILITY_OFFLINE,
                    device: &device,
                };

                match serde_json::to_string(&payload) {
                    Ok(payload) => Some(DiscoveryMessage {
                        topic: format!(
                            "{}/{}/{}/{}/config",
                            config.prefix,
                            entity.component.as_str(),
                            config.node_id,
                            entity.object_id
                        ),
                        payload,
                    }),
                    Err(e) => {
                        tracing::warn!(entity = entity.object_id, error = %e, "Failed to encode discovery config");
                        None
                    }
                }
            })
            .collect();

        Self { messages }
    }

    /// Returns the rendered configs.
    #[must_use]
    pub fn messages(&self) -> &[DiscoveryMessage] {
        &self.messages
    }

    /// Publishes every config retained. Returns how many were queued.
    pub fn publish<P: Publisher + ?Sized>(&self, publisher: &P) -> usize {
        let mut queued = 0;
        for message in &self.messages {
            match publisher.publish(&message.topic, &message.payload, true) {
                Ok(()) => queued += 1,
                Err(e) => {
                    tracing::warn!(topic = %message.topic, error = %e, "Failed to publish discovery config");
                }
            }
        }
        tracing::debug!(count = queued, "Published discovery configs");
        queued
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::Value;

    use super::*;
    use crate::protocol::testing::RecordingPublisher;

    fn payload_of(discovery: &Discovery, topic: &str) -> Value {
        let message = discovery
            .messages()
            .iter()
            .find(|m| m.topic == topic)
            .unwrap();
        serde_json::from_str(&message.payload).unwrap()
    }

    #[test]
    fn topics_and_unique_ids_are_unique() {
        let discovery = Discovery::new(&DiscoveryConfig::default(), &TopicTable::default());

        let topics: HashSet<&str> = discovery.messages().iter().map(|m| m.topic.as_str()).collect();
        assert_eq!(topics.len(), ENTITIES.len());

        let ids: HashSet<String> = discovery
            .messages()
            .iter()
            .map(|m| {
                let value: Value = serde_json::from_str(&m.payload).unwrap();
                value["unique_id"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(ids.len(), ENTITIES.len());
    }

    #[test]
    fn power_switch_config() {
        let discovery = Discovery::new(&DiscoveryConfig::default(), &TopicTable::new("garage"));
        let value = payload_of(&discovery, "homeassistant/switch/dieselheater/power/config");

        assert_eq!(value["command_topic"], "garage/power/set");
        assert_eq!(value["state_topic"], "garage/power/state");
        assert_eq!(value["payload_on"], "ON");
        assert_eq!(value["payload_off"], "OFF");
        assert_eq!(value["availability_topic"], "garage/status");
        assert_eq!(value["payload_available"], "online");
        assert_eq!(value["payload_not_available"], "offline");
        assert_eq!(value["device"]["identifiers"][0], "dieselheater");
    }

    #[test]
    fn mode_select_has_options() {
        let discovery = Discovery::new(&DiscoveryConfig::default(), &TopicTable::default());
        let value = payload_of(&discovery, "homeassistant/select/dieselheater/mode/config");

        assert_eq!(value["options"], serde_json::json!(["auto", "manual"]));
        assert!(value.get("payload_on").is_none());
    }

    #[test]
    fn sensor_hints_are_skipped_when_absent() {
        let discovery = Discovery::new(&DiscoveryConfig::default(), &TopicTable::default());

        let voltage = payload_of(&discovery, "homeassistant/sensor/dieselheater/voltage/config");
        assert_eq!(voltage["unit_of_measurement"], "V");
        assert_eq!(voltage["state_class"], "measurement");
        assert!(voltage.get("command_topic").is_none());

        let text = payload_of(&discovery, "homeassistant/sensor/dieselheater/state_text/config");
        assert!(text.get("unit_of_measurement").is_none());
        assert!(text.get("device_class").is_none());
    }

    #[test]
    fn buttons_target_raw_commands() {
        let discovery = Discovery::new(&DiscoveryConfig::default(), &TopicTable::default());

        for (object_id, topic) in [
            ("wakeup", "dieselheater/cmd/wakeup"),
            ("up", "dieselheater/cmd/up"),
            ("down", "dieselheater/cmd/down"),
        ] {
            let value = payload_of(
                &discovery,
                &format!("homeassistant/button/dieselheater/{object_id}/config"),
            );
            assert_eq!(value["command_topic"], topic);
            assert!(value.get("state_topic").is_none());
        }
    }

    #[test]
    fn custom_prefix_and_node_id() {
        let config = DiscoveryConfig::default()
            .with_prefix("ha/")
            .with_node_id("van_heater");
        let discovery = Discovery::new(&config, &TopicTable::default());

        let value = payload_of(&discovery, "ha/sensor/van_heater/rssi/config");
        assert_eq!(value["unique_id"], "van_heater_rssi");
        assert_eq!(value["entity_category"], "diagnostic");
    }

    #[test]
    fn publish_is_retained() {
        let discovery = Discovery::new(&DiscoveryConfig::default(), &TopicTable::default());
        let recorder = RecordingPublisher::default();

        let queued = discovery.publish(&recorder);

        let messages = recorder.messages();
        assert_eq!(queued, ENTITIES.len());
        assert_eq!(messages.len(), ENTITIES.len());
        assert!(messages.iter().all(|m| m.retain));
    }
}
