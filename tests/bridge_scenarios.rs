// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios through the public API, without a broker.

use std::sync::Arc;
use std::time::Duration;

use dieselheater_mqtt::bridge::{CommandRouter, PairingWorkflow, StatePoller};
use dieselheater_mqtt::driver::{DriverHandle, SimulatedHeater};
use dieselheater_mqtt::protocol::{Publisher, StatePublisher, TopicTable};
use dieselheater_mqtt::{
    AddressStore, CommandKind, DeviceAddress, ProtocolError, SharedState, StateCode,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

const HEATER: DeviceAddress = DeviceAddress::new(0x00AB_CDEF);

/// Keeps every published message.
#[derive(Default)]
struct Recorder {
    messages: Mutex<Vec<(String, String)>>,
}

impl Recorder {
    fn on(&self, topic: &str) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl Publisher for Recorder {
    fn publish(&self, topic: &str, payload: &str, _retain: bool) -> Result<(), ProtocolError> {
        self.messages
            .lock()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

struct Harness {
    heater: SimulatedHeater,
    state: SharedState,
    store: AddressStore,
    recorder: Arc<Recorder>,
    router: CommandRouter<SimulatedHeater, Recorder>,
    poller: StatePoller<SimulatedHeater, Recorder>,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let heater = SimulatedHeater::new(HEATER);
    let driver = DriverHandle::new(heater.clone());
    let store = AddressStore::new(dir.path().join("heater_address.txt"));
    let state = SharedState::new(store.load());
    let recorder = Arc::new(Recorder::default());
    let out = StatePublisher::new(Arc::clone(&recorder), Arc::new(TopicTable::default()));

    let pairing = PairingWorkflow::default()
        .with_budget(Duration::from_millis(200))
        .with_attempt_timeout(Duration::from_millis(5))
        .with_retry_delay(Duration::from_millis(5));
    let router = CommandRouter::new(
        driver.clone(),
        state.clone(),
        store.clone(),
        out.clone(),
        pairing,
        CancellationToken::new(),
    );
    let poller = StatePoller::new(
        driver,
        state.clone(),
        out,
        Duration::from_millis(10),
        Duration::from_millis(10),
    );

    Harness {
        heater,
        state,
        store,
        recorder,
        router,
        poller,
        _dir: dir,
    }
}

#[tokio::test]
async fn pair_persist_then_power_on() {
    let h = harness();
    assert_eq!(h.state.address(), DeviceAddress::UNSET);

    // Commands are ignored until the heater is paired.
    h.router.handle("dieselheater/power/set", "ON").await;
    assert!(h.heater.commands().is_empty());

    h.heater.set_pairing_mode(true);
    h.router.handle("dieselheater/pair/set", "ON").await;

    assert_eq!(h.state.address(), HEATER);
    assert_eq!(h.store.load(), HEATER);
    assert_eq!(
        std::fs::read_to_string(h.store.path()).unwrap(),
        "00abcdef\n"
    );
    assert_eq!(h.recorder.on("dieselheater/pair/state"), vec!["ON", "OFF"]);

    h.router.handle("dieselheater/power/set", "ON").await;

    assert_eq!(h.heater.commands(), vec![CommandKind::Power]);
    assert_eq!(h.recorder.on("dieselheater/power/state"), vec!["ON"]);
}

#[tokio::test]
async fn power_request_converges_with_polled_state() {
    let h = harness();
    h.heater.set_pairing_mode(true);
    h.router.handle("dieselheater/pair/set", "ON").await;

    h.router.handle("dieselheater/power/set", "ON").await;
    assert!(h.poller.poll_once().await);
    assert!(h.state.snapshot().unwrap().is_on());

    // The heater reports on now, so a repeated request is a no-op.
    h.router.handle("dieselheater/power/set", "ON").await;
    assert_eq!(h.heater.commands(), vec![CommandKind::Power]);

    h.router.handle("dieselheater/power/set", "OFF").await;
    assert_eq!(h.heater.commands(), vec![CommandKind::Power, CommandKind::Power]);

    for _ in 0..3 {
        h.poller.poll_once().await;
    }
    assert_eq!(h.heater.state_code(), StateCode::Off);
    assert_eq!(
        h.recorder.on("dieselheater/state/text").last().map(String::as_str),
        Some("Off")
    );
}

#[tokio::test]
async fn stored_address_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = AddressStore::new(dir.path().join("heater_address.txt"));
    store.save(HEATER).unwrap();

    // A fresh store on the same file sees the pairing.
    let reloaded = AddressStore::new(store.path());
    assert_eq!(SharedState::new(reloaded.load()).address(), HEATER);
}

#[tokio::test]
async fn silent_heater_publishes_nothing() {
    let h = harness();
    h.heater.set_pairing_mode(true);
    h.router.handle("dieselheater/pair/set", "ON").await;
    h.heater.set_responsive(false);

    let before = h.recorder.messages.lock().len();
    assert!(!h.poller.poll_once().await);

    assert_eq!(h.recorder.messages.lock().len(), before);
    assert!(h.state.snapshot().is_none());
}
