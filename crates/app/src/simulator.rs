//! Simulator controller: owns every device worker and the stop flag.
//!
//! Starting the simulator spawns one publish loop per periodic device and one
//! command worker per device that accepts commands. Every worker observes a
//! single `watch` stop flag through its own receiver, so raising the flag
//! wakes all of them at once, and [`Simulator::shutdown`] joins them all.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use homesim_domain::id::DeviceKey;

use crate::ports::Transport;
use crate::publish_gate::PublishGate;
use crate::registry::DeviceRegistry;
use crate::services::{CommandHandler, PublishLoop};

/// Why a command could not be handed to its device.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ForwardError {
    #[error("device {0} has no command inbox")]
    NoInbox(DeviceKey),
    #[error("command inbox of device {0} is full")]
    Full(DeviceKey),
    #[error("command inbox of device {0} is closed")]
    Closed(DeviceKey),
}

/// Inboxes of the command workers, keyed by device.
#[derive(Debug, Clone, Default)]
pub struct CommandRoutes {
    inboxes: Arc<HashMap<DeviceKey, mpsc::Sender<String>>>,
}

impl CommandRoutes {
    /// Queue `state` for the device without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError`] when the device has no inbox or its inbox
    /// cannot take the command right now.
    pub fn forward(&self, key: DeviceKey, state: String) -> Result<(), ForwardError> {
        let inbox = self.inboxes.get(&key).ok_or(ForwardError::NoInbox(key))?;
        inbox.try_send(state).map_err(|err| match err {
            TrySendError::Full(_) => ForwardError::Full(key),
            TrySendError::Closed(_) => ForwardError::Closed(key),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inboxes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty()
    }
}

/// Resolve once the stop flag is raised, or once its sender is gone.
pub async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

/// Running set of device workers.
pub struct Simulator {
    stop: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    routes: CommandRoutes,
}

impl Simulator {
    /// Spawn the workers of every registered device.
    ///
    /// Each command worker gets a bounded inbox of `inbox_capacity` commands.
    pub fn start<T: Transport + 'static>(
        registry: &DeviceRegistry,
        gate: &PublishGate<T>,
        inbox_capacity: usize,
    ) -> Self {
        let (stop, _) = watch::channel(false);
        let handler = CommandHandler::new(gate.clone());
        let mut workers = Vec::new();
        let mut inboxes = HashMap::new();

        for device in registry.iter() {
            if device.is_periodic() {
                let worker = PublishLoop::new(Arc::clone(device), gate.clone(), stop.subscribe());
                workers.push(worker.spawn());
            }
            if device.routing_key().is_some() {
                let (inbox_tx, inbox_rx) = mpsc::channel(inbox_capacity.max(1));
                inboxes.insert(device.key(), inbox_tx);
                workers.push(handler.clone().spawn(
                    Arc::clone(device),
                    inbox_rx,
                    stop.subscribe(),
                ));
            }
        }

        tracing::info!(
            devices = registry.len(),
            workers = workers.len(),
            "simulator started"
        );
        Self {
            stop,
            workers,
            routes: CommandRoutes {
                inboxes: Arc::new(inboxes),
            },
        }
    }

    /// Inboxes the dispatcher forwards commands to.
    #[must_use]
    pub fn command_routes(&self) -> CommandRoutes {
        self.routes.clone()
    }

    /// A receiver of the stop flag, for tasks that should stop with the
    /// simulator.
    #[must_use]
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Raise the stop flag and wait for every worker; returns how many
    /// workers finished cleanly.
    pub async fn shutdown(self) -> usize {
        self.stop.send_replace(true);
        let mut joined = 0;
        for worker in self.workers {
            match worker.await {
                Ok(()) => joined += 1,
                Err(err) => tracing::error!(error = %err, "device worker failed"),
            }
        }
        tracing::info!(joined, "simulator stopped");
        joined
    }
}
