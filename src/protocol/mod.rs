// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT side of the bridge.
//!
//! - [`TopicTable`] / [`Channel`]: the fixed topic layout under one base prefix
//! - [`Publisher`] / [`StatePublisher`]: outbound seam used by the command
//!   router and the state poller
//! - [`BrokerSession`]: connection, subscriptions, last will and shutdown

mod publisher;
mod session;
mod topics;

pub use publisher::{MqttPublisher, Publisher, StatePublisher};
pub use session::{
    BrokerConfig, BrokerConfigBuilder, BrokerSession, DEFAULT_CLIENT_ID, SessionEvent,
};
pub use topics::{Channel, Direction, TopicTable};

#[cfg(test)]
pub(crate) use publisher::testing;

/// Availability payload while the bridge is running.
pub const AVAILABILITY_ONLINE: &str = "online";

/// Availability payload once the bridge is gone.
pub const AVAILABILITY_OFFLINE: &str = "offline";
