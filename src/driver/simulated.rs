// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory heater for running the bridge without a radio.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::HeaterDriver;
use crate::error::DriverError;
use crate::state::DeviceStateSnapshot;
use crate::types::{CommandKind, DeviceAddress, StateCode};

const SETPOINT_MIN: u8 = 8;
const SETPOINT_MAX: u8 = 36;

/// A heater simulated in memory.
///
/// The simulated heater has its own radio address. It only reacts to
/// commands and answers polls when the driver's active address matches it,
/// and announces that address to `learn_address` while in pairing mode.
/// Power toggles walk through the startup and shutdown phases, one phase
/// per poll.
///
/// Clones share the same heater, so a test can keep a clone to inspect
/// what the bridge transmitted.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dieselheater_mqtt::driver::{HeaterDriver, SimulatedHeater};
/// use dieselheater_mqtt::types::{CommandKind, DeviceAddress, StateCode};
///
/// let addr = DeviceAddress::new(0x00AB_CDEF);
/// let mut heater = SimulatedHeater::new(addr).with_pairing_mode(true);
///
/// assert_eq!(heater.learn_address(Duration::from_millis(500)), Some(addr));
/// heater.set_address(addr);
/// heater.send_command(CommandKind::Power);
///
/// let frame = heater.poll_state(Duration::from_secs(1)).unwrap();
/// assert_eq!(frame.state_code, StateCode::Warming);
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedHeater {
    inner: Arc<Mutex<SimState>>,
}

#[derive(Debug)]
struct SimState {
    heater_address: DeviceAddress,
    active_address: DeviceAddress,
    initialized: bool,
    fail_initialization: bool,
    pairing_mode: bool,
    responsive: bool,
    state_code: StateCode,
    auto_mode: bool,
    setpoint: u8,
    commands: Vec<CommandKind>,
    polls: usize,
    learn_attempts: usize,
}

impl SimulatedHeater {
    /// Creates a switched-off heater answering to `heater_address`.
    #[must_use]
    pub fn new(heater_address: DeviceAddress) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState {
                heater_address,
                active_address: DeviceAddress::UNSET,
                initialized: false,
                fail_initialization: false,
                pairing_mode: false,
                responsive: true,
                state_code: StateCode::Off,
                auto_mode: true,
                setpoint: 20,
                commands: Vec::new(),
                polls: 0,
                learn_attempts: 0,
            })),
        }
    }

    /// Makes `initialize` fail.
    #[must_use]
    pub fn with_failing_initialization(self) -> Self {
        self.inner.lock().fail_initialization = true;
        self
    }

    /// Puts the heater in or out of pairing mode.
    #[must_use]
    pub fn with_pairing_mode(self, enabled: bool) -> Self {
        self.set_pairing_mode(enabled);
        self
    }

    /// Sets the initial run state.
    #[must_use]
    pub fn with_state(self, state_code: StateCode) -> Self {
        self.inner.lock().state_code = state_code;
        self
    }

    /// Puts the heater in or out of pairing mode.
    pub fn set_pairing_mode(&self, enabled: bool) {
        self.inner.lock().pairing_mode = enabled;
    }

    /// Controls whether polls receive a state frame.
    pub fn set_responsive(&self, responsive: bool) {
        self.inner.lock().responsive = responsive;
    }

    /// Returns whether `initialize` succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Returns the driver's active address.
    #[must_use]
    pub fn address(&self) -> DeviceAddress {
        self.inner.lock().active_address
    }

    /// Returns every command transmitted so far.
    #[must_use]
    pub fn commands(&self) -> Vec<CommandKind> {
        self.inner.lock().commands.clone()
    }

    /// Returns the current run state.
    #[must_use]
    pub fn state_code(&self) -> StateCode {
        self.inner.lock().state_code
    }

    /// Returns the number of polls issued.
    #[must_use]
    pub fn poll_count(&self) -> usize {
        self.inner.lock().polls
    }

    /// Returns the number of learn windows issued.
    #[must_use]
    pub fn learn_attempts(&self) -> usize {
        self.inner.lock().learn_attempts
    }
}

impl SimState {
    fn addressed(&self) -> bool {
        self.active_address.is_set() && self.active_address == self.heater_address
    }

    fn apply(&mut self, command: CommandKind) {
        match command {
            CommandKind::Power => {
                self.state_code = if self.state_code.is_on() {
                    StateCode::Shutdown
                } else {
                    StateCode::Startup
                };
            }
            CommandKind::Mode => self.auto_mode = !self.auto_mode,
            CommandKind::Up => self.setpoint = (self.setpoint + 1).min(SETPOINT_MAX),
            CommandKind::Down => {
                self.setpoint = self.setpoint.saturating_sub(1).max(SETPOINT_MIN);
            }
            CommandKind::Wakeup => {}
        }
    }

    fn advance(&mut self) {
        self.state_code = match self.state_code {
            StateCode::Startup => StateCode::Warming,
            StateCode::Warming => StateCode::WarmingWait,
            StateCode::WarmingWait => StateCode::PreRun,
            StateCode::PreRun => StateCode::Running,
            StateCode::Shutdown => StateCode::ShuttingDown,
            StateCode::ShuttingDown => StateCode::Cooling,
            StateCode::Cooling => StateCode::Off,
            other => other,
        };
    }

    fn frame(&self) -> DeviceStateSnapshot {
        let on = self.state_code.is_on();
        DeviceStateSnapshot {
            state_code: self.state_code,
            power: u8::from(on),
            voltage: 12.6,
            ambient_temp: 19,
            case_temp: if on { 85 } else { 21 },
            setpoint: self.setpoint,
            auto_mode: self.auto_mode,
            pump_freq: if on { 2.8 } else { 0.0 },
            rssi: -58,
        }
    }
}

impl HeaterDriver for SimulatedHeater {
    fn initialize(&mut self) -> Result<(), DriverError> {
        let mut state = self.inner.lock();
        if state.fail_initialization {
            return Err(DriverError::Initialization(
                "simulated radio did not respond".to_string(),
            ));
        }
        state.initialized = true;
        Ok(())
    }

    fn learn_address(&mut self, _timeout: Duration) -> Option<DeviceAddress> {
        let mut state = self.inner.lock();
        state.learn_attempts += 1;
        state.pairing_mode.then_some(state.heater_address)
    }

    fn set_address(&mut self, address: DeviceAddress) {
        self.inner.lock().active_address = address;
    }

    fn send_command(&mut self, command: CommandKind) {
        let mut state = self.inner.lock();
        state.commands.push(command);
        if state.addressed() {
            state.apply(command);
        }
    }

    fn poll_state(&mut self, _timeout: Duration) -> Option<DeviceStateSnapshot> {
        let mut state = self.inner.lock();
        state.polls += 1;
        if !state.responsive || !state.addressed() {
            return None;
        }
        state.advance();
        Some(state.frame())
    }
}
