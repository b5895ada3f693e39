// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heater state types.
//!
//! [`DeviceStateSnapshot`] is one decoded telemetry frame. [`SharedState`]
//! holds the last-known snapshot together with the active device address
//! and is handed to both the state poller (writer) and the command router
//! (reader).
//!
//! # Examples
//!
//! ```
//! use dieselheater_mqtt::state::{DeviceStateSnapshot, SharedState};
//! use dieselheater_mqtt::types::{DeviceAddress, StateCode};
//!
//! let shared = SharedState::new(DeviceAddress::UNSET);
//! shared.replace_snapshot(DeviceStateSnapshot {
//!     state_code: StateCode::Warming,
//!     ..DeviceStateSnapshot::default()
//! });
//!
//! assert!(shared.snapshot().is_some_and(|s| s.is_on()));
//! ```

mod shared;
mod snapshot;

pub use shared::SharedState;
pub use snapshot::DeviceStateSnapshot;
