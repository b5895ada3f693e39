// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Diesel heater MQTT bridge.
//!
//! Connects a 433 MHz diesel air heater to an MQTT broker: inbound
//! commands become radio commands, polled telemetry becomes state topics,
//! and Home Assistant discovers the heater on its own.
//!
//! # Features
//!
//! - **Pairing**: learn the heater address on demand and persist it
//! - **Power control**: idempotent `ON`/`OFF` against the last known state
//! - **Raw commands**: wakeup, mode, power toggle, setpoint up/down
//! - **Telemetry**: temperatures, voltage, pump frequency, run state, RSSI
//! - **Availability**: retained `online`/`offline` with a broker last will
//! - **Discovery**: Home Assistant MQTT discovery on every (re)connect
//!
//! # Quick Start
//!
//! ```no_run
//! use dieselheater_mqtt::bridge::{Bridge, BridgeConfig};
//! use dieselheater_mqtt::driver::SimulatedHeater;
//! use dieselheater_mqtt::protocol::BrokerConfig;
//! use dieselheater_mqtt::types::DeviceAddress;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> dieselheater_mqtt::Result<()> {
//!     let broker = BrokerConfig::builder()
//!         .host("192.168.1.50")
//!         .credentials("user", "password")
//!         .build()?;
//!
//!     let bridge = Bridge::new(
//!         BridgeConfig::new(broker).with_base_topic("dieselheater"),
//!         SimulatedHeater::new(DeviceAddress::new(0x00AB_CDEF)),
//!     );
//!
//!     bridge.run(CancellationToken::new()).await
//! }
//! ```
//!
//! # Drivers
//!
//! The radio is abstracted by [`driver::HeaterDriver`]. Its operations are
//! blocking and bounded by the timeouts passed in; the bridge runs them on
//! the blocking thread pool and never lets two of them overlap.

pub mod bridge;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod state;
pub mod store;
pub mod types;

pub use bridge::{Bridge, BridgeConfig, ReconnectionPolicy};
pub use error::{DriverError, Error, ProtocolError, Result, ValueError};
pub use protocol::{BrokerConfig, TopicTable};
pub use state::{DeviceStateSnapshot, SharedState};
pub use store::AddressStore;
pub use types::{CommandKind, DeviceAddress, HeaterMode, PowerState, StateCode};
