// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic table for the bridge.
//!
//! Every logical channel lives under one base prefix:
//!
//! ```text
//! dieselheater/power/set     → Channel::PowerSet     (subscribed)
//! dieselheater/power/state   → Channel::PowerState   (published)
//! dieselheater/state/raw     → Channel::StateRaw     (published)
//! dieselheater/status        → Channel::Status       (published, retained)
//! ```

use std::fmt;

/// Whether the bridge subscribes to or publishes on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Inbound commands; the bridge subscribes.
    Command,
    /// Outbound state; the bridge publishes.
    State,
}

/// A logical channel of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// High-level `ON`/`OFF` request.
    PowerSet,
    /// `auto`/`manual` request.
    ModeSet,
    /// Start pairing.
    PairSet,
    /// Raw wakeup command.
    CmdWakeup,
    /// Raw mode command.
    CmdMode,
    /// Raw power toggle.
    CmdPower,
    /// Raw setpoint up.
    CmdUp,
    /// Raw setpoint down.
    CmdDown,
    /// Reported power state.
    PowerState,
    /// Reported mode.
    ModeState,
    /// Pairing in progress pulse.
    PairState,
    /// Aggregate JSON state.
    StateRaw,
    /// Ambient temperature.
    AmbientTemp,
    /// Case temperature.
    CaseTemp,
    /// Supply voltage.
    Voltage,
    /// Pump frequency.
    PumpFreq,
    /// Setpoint temperature.
    Setpoint,
    /// Numeric run state.
    StateCode,
    /// Run state label.
    StateText,
    /// Signal strength.
    Rssi,
    /// Bridge availability.
    Status,
}

impl Channel {
    /// Every channel.
    pub const ALL: [Self; 21] = [
        Self::PowerSet,
        Self::ModeSet,
        Self::PairSet,
        Self::CmdWakeup,
        Self::CmdMode,
        Self::CmdPower,
        Self::CmdUp,
        Self::CmdDown,
        Self::PowerState,
        Self::ModeState,
        Self::PairState,
        Self::StateRaw,
        Self::AmbientTemp,
        Self::CaseTemp,
        Self::Voltage,
        Self::PumpFreq,
        Self::Setpoint,
        Self::StateCode,
        Self::StateText,
        Self::Rssi,
        Self::Status,
    ];

    /// Returns the topic suffix below the base prefix.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::PowerSet => "power/set",
            Self::ModeSet => "mode/set",
            Self::PairSet => "pair/set",
            Self::CmdWakeup => "cmd/wakeup",
            Self::CmdMode => "cmd/mode",
            Self::CmdPower => "cmd/power",
            Self::CmdUp => "cmd/up",
            Self::CmdDown => "cmd/down",
            Self::PowerState => "power/state",
            Self::ModeState => "mode/state",
            Self::PairState => "pair/state",
            Self::StateRaw => "state/raw",
            Self::AmbientTemp => "ambient_temp",
            Self::CaseTemp => "case_temp",
            Self::Voltage => "voltage",
            Self::PumpFreq => "pump_freq",
            Self::Setpoint => "setpoint",
            Self::StateCode => "state_code",
            Self::StateText => "state/text",
            Self::Rssi => "rssi",
            Self::Status => "status",
        }
    }

    /// Returns the direction of the channel.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::PowerSet
            | Self::ModeSet
            | Self::PairSet
            | Self::CmdWakeup
            | Self::CmdMode
            | Self::CmdPower
            | Self::CmdUp
            | Self::CmdDown => Direction::Command,
            _ => Direction::State,
        }
    }

    /// Returns `true` for subscribed channels.
    #[must_use]
    pub const fn is_command(self) -> bool {
        matches!(self.direction(), Direction::Command)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Maps channels to full topics under a base prefix.
///
/// # Examples
///
/// ```
/// use dieselheater_mqtt::protocol::{Channel, TopicTable};
///
/// let topics = TopicTable::new("garage/heater");
/// assert_eq!(topics.topic(Channel::PowerSet), "garage/heater/power/set");
/// assert_eq!(topics.resolve("garage/heater/cmd/up"), Some(Channel::CmdUp));
/// assert_eq!(topics.resolve("garage/heater/power/state"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTable {
    base: String,
}

impl TopicTable {
    /// Creates a table rooted at `base`. Trailing slashes are dropped.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the base prefix.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the full topic for a channel.
    #[must_use]
    pub fn topic(&self, channel: Channel) -> String {
        format!("{}/{}", self.base, channel.suffix())
    }

    /// Returns the full topics of all command channels.
    pub fn command_topics(&self) -> impl Iterator<Item = (Channel, String)> + '_ {
        Channel::ALL
            .into_iter()
            .filter(|c| c.is_command())
            .map(|c| (c, self.topic(c)))
    }

    /// Resolves an inbound topic to its command channel.
    ///
    /// Returns `None` for foreign topics and for state channels.
    #[must_use]
    pub fn resolve(&self, topic: &str) -> Option<Channel> {
        let suffix = topic.strip_prefix(&self.base)?.strip_prefix('/')?;
        Channel::ALL
            .into_iter()
            .find(|c| c.is_command() && c.suffix() == suffix)
    }
}

impl Default for TopicTable {
    fn default() -> Self {
        Self::new("dieselheater")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn suffixes_are_unique() {
        let suffixes: HashSet<&str> = Channel::ALL.iter().map(|c| c.suffix()).collect();
        assert_eq!(suffixes.len(), Channel::ALL.len());
    }

    #[test]
    fn command_channels() {
        let topics = TopicTable::default();
        let commands: Vec<String> = topics.command_topics().map(|(_, t)| t).collect();
        assert_eq!(
            commands,
            vec![
                "dieselheater/power/set",
                "dieselheater/mode/set",
                "dieselheater/pair/set",
                "dieselheater/cmd/wakeup",
                "dieselheater/cmd/mode",
                "dieselheater/cmd/power",
                "dieselheater/cmd/up",
                "dieselheater/cmd/down",
            ]
        );
    }

    #[test]
    fn resolve_every_command() {
        let topics = TopicTable::new("heater/");
        for (channel, topic) in topics.command_topics() {
            assert_eq!(topics.resolve(&topic), Some(channel));
        }
    }

    #[test]
    fn resolve_rejects_state_and_foreign_topics() {
        let topics = TopicTable::new("heater");
        assert_eq!(topics.resolve("heater/status"), None);
        assert_eq!(topics.resolve("heater/state/raw"), None);
        assert_eq!(topics.resolve("heaterx/power/set"), None);
        assert_eq!(topics.resolve("other/power/set"), None);
        assert_eq!(topics.resolve("heater"), None);
    }
}
