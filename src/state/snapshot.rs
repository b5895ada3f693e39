// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Telemetry frame decoded from the heater.

use serde::Serialize;

use crate::types::{HeaterMode, PowerState, StateCode};

/// One complete telemetry frame.
///
/// A snapshot is produced only by a successful poll and is never patched
/// field by field: the poller replaces the previous snapshot as a whole.
///
/// # Examples
///
/// ```
/// use dieselheater_mqtt::state::DeviceStateSnapshot;
/// use dieselheater_mqtt::types::StateCode;
///
/// let snapshot = DeviceStateSnapshot {
///     state_code: StateCode::Running,
///     ..DeviceStateSnapshot::default()
/// };
/// assert!(snapshot.is_on());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceStateSnapshot {
    /// Run state.
    pub state_code: StateCode,
    /// Power level byte as reported by the heater.
    pub power: u8,
    /// Supply voltage in volts.
    pub voltage: f32,
    /// Ambient temperature in °C.
    pub ambient_temp: i16,
    /// Heat exchanger temperature in °C.
    pub case_temp: i16,
    /// Target temperature in °C.
    pub setpoint: u8,
    /// `true` in thermostat mode, `false` in manual mode.
    pub auto_mode: bool,
    /// Fuel pump frequency in Hz.
    pub pump_freq: f32,
    /// Received signal strength of the frame in dBm.
    pub rssi: i16,
}

impl Default for DeviceStateSnapshot {
    fn default() -> Self {
        Self {
            state_code: StateCode::Off,
            power: 0,
            voltage: 0.0,
            ambient_temp: 0,
            case_temp: 0,
            setpoint: 0,
            auto_mode: false,
            pump_freq: 0.0,
            rssi: 0,
        }
    }
}

impl DeviceStateSnapshot {
    /// Returns `true` when the run state counts as on.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        self.state_code.is_on()
    }

    /// Returns the power state derived from the run state.
    #[must_use]
    pub fn power_state(&self) -> PowerState {
        PowerState::from(self.is_on())
    }

    /// Returns the operating mode.
    #[must_use]
    pub fn mode(&self) -> HeaterMode {
        HeaterMode::from(self.auto_mode)
    }

    /// Serializes the aggregate payload published on `state/raw`.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::json!(RawState::from(self)).to_string()
    }
}

/// Wire shape of the aggregate state payload.
#[derive(Debug, Serialize)]
struct RawState {
    state_code: u8,
    state: &'static str,
    power: u8,
    voltage: f32,
    ambient_temp: i16,
    case_temp: i16,
    setpoint: u8,
    auto_mode: bool,
    pump_freq: f32,
    rssi: i16,
}

impl From<&DeviceStateSnapshot> for RawState {
    fn from(s: &DeviceStateSnapshot) -> Self {
        Self {
            state_code: s.state_code.code(),
            state: s.state_code.label(),
            power: s.power,
            voltage: s.voltage,
            ambient_temp: s.ambient_temp,
            case_temp: s.case_temp,
            setpoint: s.setpoint,
            auto_mode: s.auto_mode,
            pump_freq: s.pump_freq,
            rssi: s.rssi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_json_carries_every_field() {
        let snapshot = DeviceStateSnapshot {
            state_code: StateCode::Running,
            power: 1,
            voltage: 12.5,
            ambient_temp: 18,
            case_temp: 95,
            setpoint: 22,
            auto_mode: true,
            pump_freq: 3.5,
            rssi: -61,
        };

        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json()).unwrap();
        assert_eq!(value["state_code"], 5);
        assert_eq!(value["state"], "Running");
        assert_eq!(value["power"], 1);
        assert_eq!(value["voltage"], 12.5);
        assert_eq!(value["ambient_temp"], 18);
        assert_eq!(value["case_temp"], 95);
        assert_eq!(value["setpoint"], 22);
        assert_eq!(value["auto_mode"], true);
        assert_eq!(value["pump_freq"], 3.5);
        assert_eq!(value["rssi"], -61);
    }

    #[test]
    fn derived_values() {
        let snapshot = DeviceStateSnapshot {
            state_code: StateCode::Cooling,
            auto_mode: true,
            ..DeviceStateSnapshot::default()
        };
        assert_eq!(snapshot.power_state(), PowerState::Off);
        assert_eq!(snapshot.mode(), HeaterMode::Auto);
    }
}
