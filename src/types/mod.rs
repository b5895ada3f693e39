// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types exchanged with the heater and the broker.
//!
//! # Types
//!
//! - [`DeviceAddress`] - 32-bit radio address, `0` when unpaired
//! - [`StateCode`] - Run state reported by the heater, with on/off classification
//! - [`CommandKind`] - Remote-control commands the driver can transmit
//! - [`PowerState`] - `ON`/`OFF` payloads
//! - [`HeaterMode`] - `auto`/`manual` payloads

mod address;
mod command;
mod power;
mod state_code;

pub use address::DeviceAddress;
pub use command::CommandKind;
pub use power::{HeaterMode, PowerState};
pub use state_code::StateCode;
