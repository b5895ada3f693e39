// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State shared between the command router and the state poller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;

use super::DeviceStateSnapshot;
use crate::types::DeviceAddress;

/// Synchronized container for the active address and last-known snapshot.
///
/// Cheaply cloneable; all clones observe the same state. The snapshot is
/// swapped under a lock, so readers always see a complete frame.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

#[derive(Debug, Default)]
struct SharedStateInner {
    address: AtomicU32,
    snapshot: RwLock<Option<DeviceStateSnapshot>>,
}

impl SharedState {
    /// Creates shared state with the given initial address and no snapshot.
    #[must_use]
    pub fn new(address: DeviceAddress) -> Self {
        let state = Self::default();
        state.set_address(address);
        state
    }

    /// Returns the active device address.
    #[must_use]
    pub fn address(&self) -> DeviceAddress {
        DeviceAddress::new(self.inner.address.load(Ordering::Acquire))
    }

    /// Replaces the active device address.
    pub fn set_address(&self, address: DeviceAddress) {
        self.inner.address.store(address.value(), Ordering::Release);
    }

    /// Returns a copy of the latest snapshot, if any poll has succeeded.
    #[must_use]
    pub fn snapshot(&self) -> Option<DeviceStateSnapshot> {
        *self.inner.snapshot.read()
    }

    /// Replaces the latest snapshot.
    pub fn replace_snapshot(&self, snapshot: DeviceStateSnapshot) {
        *self.inner.snapshot.write() = Some(snapshot);
    }
}
