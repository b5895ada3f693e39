// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heater run-state codes and their on/off classification.

use std::fmt;

/// Run state reported by the heater in every state frame.
///
/// Any byte outside the known set maps to [`StateCode::Unknown`], which
/// keeps the raw value for diagnostics.
///
/// # Examples
///
/// ```
/// use dieselheater_mqtt::types::StateCode;
///
/// assert!(StateCode::from(5).is_on());
/// assert!(!StateCode::from(8).is_on());
/// assert_eq!(StateCode::from(0x42), StateCode::Unknown(0x42));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateCode {
    /// Heater is off.
    Off,
    /// Ignition sequence started.
    Startup,
    /// Glow plug warming.
    Warming,
    /// Waiting for the combustion chamber to warm up.
    WarmingWait,
    /// Ramp-up before normal operation.
    PreRun,
    /// Normal operation.
    Running,
    /// Shutdown requested.
    Shutdown,
    /// Burning off remaining fuel.
    ShuttingDown,
    /// Fan running to cool the chamber.
    Cooling,
    /// Code not known to this bridge.
    Unknown(u8),
}

impl StateCode {
    /// Returns `true` while the heater is starting or producing heat.
    ///
    /// Shutdown, shutting-down and cooling phases count as off: a power
    /// command issued during them must restart the heater.
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(
            self,
            Self::Startup | Self::Warming | Self::WarmingWait | Self::PreRun | Self::Running
        )
    }

    /// Returns the code as transmitted by the heater.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Off => 0x00,
            Self::Startup => 0x01,
            Self::Warming => 0x02,
            Self::WarmingWait => 0x03,
            Self::PreRun => 0x04,
            Self::Running => 0x05,
            Self::Shutdown => 0x06,
            Self::ShuttingDown => 0x07,
            Self::Cooling => 0x08,
            Self::Unknown(raw) => raw,
        }
    }

    /// Returns a human-readable label for the `state/text` topic.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Startup => "Startup",
            Self::Warming => "Warming",
            Self::WarmingWait => "Warming wait",
            Self::PreRun => "Pre-run",
            Self::Running => "Running",
            Self::Shutdown => "Shutdown",
            Self::ShuttingDown => "Shutting down",
            Self::Cooling => "Cooling",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl From<u8> for StateCode {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 => Self::Off,
            0x01 => Self::Startup,
            0x02 => Self::Warming,
            0x03 => Self::WarmingWait,
            0x04 => Self::PreRun,
            0x05 => Self::Running,
            0x06 => Self::Shutdown,
            0x07 => Self::ShuttingDown,
            0x08 => Self::Cooling,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
