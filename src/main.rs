// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `heater-bridge`: runs the diesel heater MQTT bridge.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use dieselheater_mqtt::discovery::DiscoveryConfig;
use dieselheater_mqtt::driver::SimulatedHeater;
use dieselheater_mqtt::protocol::BrokerConfig;
use dieselheater_mqtt::{Bridge, BridgeConfig, DeviceAddress};

/// Bridge a radio-controlled diesel heater to MQTT.
#[derive(Debug, Parser)]
#[command(name = "heater-bridge", version, about)]
struct Args {
    /// MQTT broker host.
    #[arg(long, env = "MQTT_HOST", default_value = "localhost")]
    mqtt_host: String,

    /// MQTT broker port.
    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    mqtt_port: u16,

    /// MQTT username.
    #[arg(long, env = "MQTT_USERNAME")]
    mqtt_username: Option<String>,

    /// MQTT password.
    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    mqtt_password: Option<String>,

    /// Base topic for command and state channels.
    #[arg(long, env = "HEATER_BASE_TOPIC", default_value = "dieselheater")]
    base_topic: String,

    /// Home Assistant discovery prefix.
    #[arg(long, env = "HA_DISCOVERY_PREFIX", default_value = "homeassistant")]
    discovery_prefix: String,

    /// File holding the learned heater address.
    #[arg(long, env = "HEATER_ADDRESS_FILE", default_value = "heater_address.txt")]
    address_file: PathBuf,

    /// Seconds between state polls.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 5)]
    poll_interval_secs: u64,

    /// Address the simulated heater answers to.
    #[arg(long, env = "HEATER_SIM_ADDRESS", default_value = "00abcdef")]
    sim_address: DeviceAddress,

    /// Start the simulated heater in pairing mode so `pair/set` succeeds.
    #[arg(long, env = "HEATER_SIM_PAIRING")]
    sim_pairing: bool,
}

impl Args {
    fn bridge_config(&self) -> dieselheater_mqtt::Result<BridgeConfig> {
        let mut broker = BrokerConfig::builder()
            .host(&self.mqtt_host)
            .port(self.mqtt_port);
        if let Some(username) = &self.mqtt_username {
            broker = broker.credentials(username, self.mqtt_password.clone().unwrap_or_default());
        }

        Ok(BridgeConfig::new(broker.build()?)
            .with_base_topic(&self.base_topic)
            .with_discovery(DiscoveryConfig::default().with_prefix(&self.discovery_prefix))
            .with_address_file(&self.address_file)
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs.max(1))))
    }

    fn simulated_heater(&self) -> SimulatedHeater {
        SimulatedHeater::new(self.sim_address).with_pairing_mode(self.sim_pairing)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// Resolves once `signal` fires.
///
/// A listener that cannot be registered is logged and never resolves.
async fn watch<F>(name: &'static str, signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("Received {name}"),
        Err(e) => {
            tracing::warn!(error = %e, "Cannot listen for {name}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(unix)]
async fn sigterm() -> io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    terminate
        .recv()
        .await
        .ok_or_else(|| io::Error::other("signal stream closed"))
}

#[cfg(not(unix))]
async fn sigterm() -> io::Result<()> {
    std::future::pending().await
}

async fn shutdown_signal<A, B>(interrupt: A, terminate: B)
where
    A: Future<Output = io::Result<()>>,
    B: Future<Output = io::Result<()>>,
{
    tokio::select! {
        () = watch("SIGINT", interrupt) => {}
        () = watch("SIGTERM", terminate) => {}
    }
}

/// Cancels `token` on SIGINT or SIGTERM.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal(tokio::signal::ctrl_c(), sigterm()).await;
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    let config = match args.bridge_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::warn!(
        address = %args.sim_address,
        pairing = args.sim_pairing,
        "No radio driver linked in, running against a simulated heater"
    );
    let driver = args.simulated_heater();

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    match Bridge::new(config, driver).run(cancel).await {
        Ok(()) => {
            tracing::info!("Bridge stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Bridge failed");
            ExitCode::FAILURE
        }
    }
}
