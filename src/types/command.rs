// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Commands the radio driver can transmit to the heater.

use std::fmt;

/// A single remote-control command.
///
/// The bridge only interprets [`CommandKind::Power`], which toggles the
/// heater. The rest are forwarded as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Toggle the heater on or off.
    Power,
    /// Wake the heater's receiver.
    Wakeup,
    /// Switch between automatic and manual mode.
    Mode,
    /// Raise the setpoint (or pump frequency in manual mode).
    Up,
    /// Lower the setpoint (or pump frequency in manual mode).
    Down,
}

impl CommandKind {
    /// All commands.
    pub const ALL: [Self; 5] = [Self::Power, Self::Wakeup, Self::Mode, Self::Up, Self::Down];

    /// Returns the command byte sent over the air.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Wakeup => 0x02,
            Self::Mode => 0x06,
            Self::Power => 0x2B,
            Self::Up => 0x3C,
            Self::Down => 0x3E,
        }
    }

    /// Returns the command name used in logs and topic suffixes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Wakeup => "wakeup",
            Self::Mode => "mode",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes_are_distinct() {
        let mut codes: Vec<u8> = CommandKind::ALL.iter().map(|c| c.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), CommandKind::ALL.len());
    }

    #[test]
    fn power_code() {
        assert_eq!(CommandKind::Power.code(), 0x2B);
        assert_eq!(CommandKind::Power.to_string(), "power");
    }
}
