//! Dispatcher: consumes transport events and routes inbound commands.
//!
//! The dispatcher is the single consumer of the [`TransportEvent`] channel.
//! It tracks the connection lifecycle
//! (`Disconnected → Connecting → Connected → Subscribing → Active`),
//! subscribes to every receive topic once connected, and while active turns
//! each inbound message into a command forwarded to the target device's
//! inbox. Forwarding never waits, so one slow device cannot stall the
//! notification path.
//!
//! A lost or failed connection moves to `Disconnected` and then to
//! `Connecting` while the transport retries on its own. A refused or failed
//! subscription moves to `Disconnected` and stays there until the transport
//! reports a new connection; the dispatcher never retries a subscription.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use homesim_domain::id::DeviceKey;
use homesim_domain::message::InboundMessage;

use crate::ports::{Transport, TransportEvent};
use crate::publish_gate::PublishGate;
use crate::registry::DeviceRegistry;
use crate::simulator::{CommandRoutes, stopped};

/// Connection lifecycle as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Disconnected,
    Connecting,
    Connected,
    Subscribing,
    Active,
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Subscribing => "subscribing",
            Self::Active => "active",
        })
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queued for the device's command worker.
    Forwarded(DeviceKey),
    /// Arrived before every subscription was acknowledged.
    NotActive,
    /// Not a valid command payload.
    Undecodable,
    /// No device is registered for the topic and id.
    Unrouted,
    /// The device's inbox could not take the command.
    Dropped,
}

/// Routes transport events to the simulation.
pub struct Dispatcher<T> {
    registry: Arc<DeviceRegistry>,
    routes: CommandRoutes,
    gate: PublishGate<T>,
    state: watch::Sender<DispatcherState>,
    pending: HashSet<String>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(registry: Arc<DeviceRegistry>, routes: CommandRoutes, gate: PublishGate<T>) -> Self {
        let (state, _) = watch::channel(DispatcherState::Disconnected);
        Self {
            registry,
            routes,
            gate,
            state,
            pending: HashSet::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> DispatcherState {
        *self.state.borrow()
    }

    /// Observe state transitions, e.g. to wait until the dispatcher is active.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<DispatcherState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: DispatcherState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, "dispatcher state changed");
        }
    }

    /// Handle events until the stop flag is raised or the transport closes
    /// the channel. Active subscriptions are dropped on the way out.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<TransportEvent>,
        mut stop: watch::Receiver<bool>,
    ) {
        if self.state() == DispatcherState::Disconnected {
            self.set_state(DispatcherState::Connecting);
        }
        loop {
            tokio::select! {
                biased;
                () = stopped(&mut stop) => break,
                event = events.recv() => {
                    let Some(event) = event else {
                        tracing::debug!("transport event channel closed");
                        break;
                    };
                    self.handle_event(event).await;
                }
            }
        }
        if matches!(
            self.state(),
            DispatcherState::Subscribing | DispatcherState::Active
        ) {
            for topic in self.registry.all_receive_topics() {
                if let Err(err) = self.gate.unsubscribe(&topic).await {
                    tracing::warn!(%topic, error = %err, "unsubscribe failed");
                }
            }
        }
        self.set_state(DispatcherState::Disconnected);
    }

    /// Apply one transport event.
    pub async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { cause } => {
                tracing::info!(%cause, "transport connected");
                self.set_state(DispatcherState::Connected);
                self.subscribe_all().await;
            }
            TransportEvent::ConnectionLost { cause } => {
                tracing::warn!(%cause, "transport connection lost");
                self.disconnected();
                self.set_state(DispatcherState::Connecting);
            }
            TransportEvent::ConnectFailure { reason } => {
                tracing::error!(%reason, "transport connection failed");
                self.disconnected();
                self.set_state(DispatcherState::Connecting);
            }
            TransportEvent::SubscribeResult { topic, success } => {
                self.on_subscribe_result(&topic, success);
            }
            TransportEvent::MessageArrived { topic, payload } => {
                self.on_message(&topic, &payload);
            }
            TransportEvent::DeliveryComplete { packet_id } => {
                tracing::debug!(packet_id, "delivery complete");
            }
        }
    }

    async fn subscribe_all(&mut self) {
        let topics = self.registry.all_receive_topics();
        self.set_state(DispatcherState::Subscribing);
        self.pending = topics.iter().cloned().collect();
        if self.pending.is_empty() {
            self.set_state(DispatcherState::Active);
            return;
        }
        for topic in &topics {
            match self.gate.subscribe(topic).await {
                Ok(()) => tracing::debug!(%topic, "subscription requested"),
                Err(err) => {
                    tracing::error!(%topic, error = %err, "subscription request failed, dispatcher inactive");
                    self.disconnected();
                    return;
                }
            }
        }
    }

    fn disconnected(&mut self) {
        self.pending.clear();
        self.set_state(DispatcherState::Disconnected);
    }

    fn on_subscribe_result(&mut self, topic: &str, success: bool) {
        if self.state() != DispatcherState::Subscribing {
            tracing::debug!(%topic, success, "ignoring subscription result");
            return;
        }
        if !success {
            tracing::error!(%topic, "subscription refused, dispatcher inactive");
            self.disconnected();
            return;
        }
        tracing::info!(%topic, "subscribed");
        self.pending.remove(topic);
        if self.pending.is_empty() {
            self.set_state(DispatcherState::Active);
        }
    }

    /// Decode, route and forward one inbound message.
    pub fn on_message(&self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        if self.state() != DispatcherState::Active {
            tracing::debug!(%topic, state = %self.state(), "message dropped, dispatcher not active");
            return DispatchOutcome::NotActive;
        }
        let message = match InboundMessage::decode(topic, payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(%topic, error = %err, "undecodable command dropped");
                return DispatchOutcome::Undecodable;
            }
        };
        let device = match self.registry.lookup(&message.topic, &message.id) {
            Ok(device) => device,
            Err(miss) => {
                tracing::warn!(error = %miss, "command dropped");
                return DispatchOutcome::Unrouted;
            }
        };
        let key = device.key();
        match self.routes.forward(key, message.state) {
            Ok(()) => {
                tracing::debug!(device = %device.name(), %topic, "command forwarded");
                DispatchOutcome::Forwarded(key)
            }
            Err(err) => {
                tracing::warn!(device = %device.name(), error = %err, "command dropped");
                DispatchOutcome::Dropped
            }
        }
    }
}
