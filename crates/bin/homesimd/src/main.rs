//! # homesimd
//!
//! Composition root that wires the simulator to an MQTT broker.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialise logging
//! - Load and validate the device file, build the registry
//! - Connect the MQTT transport and put it behind the publish gate
//! - Start the simulator workers and the dispatcher
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;
mod devices;

use std::sync::Arc;
use std::time::Duration;

use homesim_app::dispatcher::Dispatcher;
use homesim_app::publish_gate::PublishGate;
use homesim_app::simulator::Simulator;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// How long the MQTT pump may take to flush the disconnect.
const PUMP_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = match devices::load(&config.devices.file, &config.devices.kinds) {
        Ok(registry) => Arc::new(registry),
        Err(err) => {
            tracing::error!(error = %err, cause = ?std::error::Error::source(&err), "cannot start");
            return Err(err.into());
        }
    };
    tracing::info!(
        broker = %config.broker_addr(),
        devices = registry.len(),
        "starting homesim"
    );

    // Transport
    let (transport, events, pump) = homesim_adapter_mqtt::connect(&config.mqtt);
    let gate = PublishGate::with_timeout(transport, config.mqtt.request_timeout());

    // Workers
    let simulator = Simulator::start(&registry, &gate, config.devices.inbox_capacity);
    let (dispatch_stop, dispatch_stop_rx) = watch::channel(false);
    let dispatcher = Dispatcher::new(
        Arc::clone(&registry),
        simulator.command_routes(),
        gate.clone(),
    );
    let dispatcher = tokio::spawn(dispatcher.run(events, dispatch_stop_rx));

    shutdown_signal().await;

    let joined = simulator.shutdown().await;
    dispatch_stop.send_replace(true);
    if let Err(err) = dispatcher.await {
        tracing::error!(error = %err, "dispatcher failed");
    }
    if let Err(err) = gate.disconnect().await {
        tracing::warn!(error = %err, "disconnect failed");
    }
    let pump_abort = pump.abort_handle();
    if tokio::time::timeout(PUMP_GRACE, pump).await.is_err() {
        tracing::warn!("mqtt pump did not stop in time");
        pump_abort.abort();
    }

    tracing::info!(workers = joined, "homesim stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
