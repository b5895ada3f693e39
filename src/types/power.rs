// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power and mode values carried on the command and state topics.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Desired or reported power state of the heater.
///
/// Parsing is case-insensitive but only accepts the exact tokens `ON` and
/// `OFF`.
///
/// # Examples
///
/// ```
/// use dieselheater_mqtt::types::PowerState;
///
/// assert_eq!("on".parse::<PowerState>().unwrap(), PowerState::On);
/// assert_eq!(PowerState::Off.as_str(), "OFF");
/// assert!("1".parse::<PowerState>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    /// Heater is off.
    Off,
    /// Heater is on.
    On,
}

impl PowerState {
    /// Returns the payload representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    /// Returns `true` for [`PowerState::On`].
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            _ => Err(ValueError::InvalidPowerState(s.to_string())),
        }
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// Operating mode of the heater.
///
/// Only the exact lowercase tokens `auto` and `manual` are recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaterMode {
    /// Thermostat mode: the heater regulates towards the setpoint.
    Auto,
    /// Fixed pump frequency.
    Manual,
}

impl HeaterMode {
    /// Returns the payload representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for HeaterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeaterMode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            _ => Err(ValueError::InvalidMode(s.to_string())),
        }
    }
}

impl From<bool> for HeaterMode {
    /// Maps the heater's `auto` flag.
    fn from(auto: bool) -> Self {
        if auto { Self::Auto } else { Self::Manual }
    }
}
