//! Event pump: drives the rumqttc event loop and turns its notifications
//! into [`TransportEvent`]s.
//!
//! rumqttc only reports packet ids in subscription acknowledgements, so the
//! pump pairs every outgoing `SUBSCRIBE` with the topics requested through
//! [`SubscriptionTracker`], in request order.
//!
//! Delivery acknowledgements are informational: they are dropped when the
//! event channel is full, so a busy consumer never stops the pump from
//! polling the event loop that its own publishes depend on.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rumqttc::{Event, EventLoop, Outgoing, Packet, SubscribeReasonCode};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use homesim_app::ports::TransportEvent;

use crate::error::MqttError;

#[derive(Debug, Default)]
struct Subscriptions {
    requested: VecDeque<String>,
    in_flight: HashMap<u16, String>,
}

/// Topics of subscriptions requested but not yet acknowledged.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionTracker {
    inner: Arc<Mutex<Subscriptions>>,
}

impl SubscriptionTracker {
    fn with<R>(&self, f: impl FnOnce(&mut Subscriptions) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut inner)
    }

    /// Record a subscription about to be handed to the client.
    pub fn requested(&self, topic: String) {
        self.with(|s| s.requested.push_back(topic));
    }

    /// Forget the last request, when the client refused to queue it.
    pub fn cancel_last(&self) {
        self.with(|s| s.requested.pop_back());
    }

    /// The client sent a `SUBSCRIBE` with `pkid`.
    fn sent(&self, pkid: u16) {
        self.with(|s| {
            if let Some(topic) = s.requested.pop_front() {
                s.in_flight.insert(pkid, topic);
            }
        });
    }

    /// The broker acknowledged `pkid`; returns the matching topic.
    fn acknowledged(&self, pkid: u16) -> Option<String> {
        self.with(|s| s.in_flight.remove(&pkid))
    }

    /// Drop in-flight requests; the broker will never answer them.
    fn reset_in_flight(&self) {
        self.with(|s| s.in_flight.clear());
    }
}

/// What the pump should do after an event loop notification.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    /// Deliver, waiting for room in the channel.
    Emit(TransportEvent),
    /// Deliver if there is room right now, drop otherwise.
    Notify(TransportEvent),
    Skip,
    Stop,
}

/// Hand `step` to the consumer; returns `false` once the pump should stop.
async fn deliver(events: &mpsc::Sender<TransportEvent>, step: Step) -> bool {
    match step {
        Step::Emit(event) => {
            if events.send(event).await.is_err() {
                tracing::debug!("transport event receiver dropped");
                return false;
            }
            true
        }
        Step::Notify(event) => match events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::debug!(?event, "event channel full, notification dropped");
                true
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("transport event receiver dropped");
                false
            }
        },
        Step::Skip => true,
        Step::Stop => false,
    }
}

/// Maps rumqttc notifications onto transport events.
#[derive(Debug)]
pub struct EventPump {
    tracker: SubscriptionTracker,
    connected: bool,
    reconnect_delay: Duration,
}

impl EventPump {
    pub fn new(tracker: SubscriptionTracker, reconnect_delay: Duration) -> Self {
        Self {
            tracker,
            connected: false,
            reconnect_delay,
        }
    }

    /// Poll `eventloop` until the client disconnects or `events` is dropped.
    pub async fn run(mut self, mut eventloop: EventLoop, events: mpsc::Sender<TransportEvent>) {
        loop {
            let (step, failed) = match eventloop.poll().await {
                Ok(event) => (self.on_event(event), false),
                Err(err) => (self.on_error(&MqttError::Connection(err)), true),
            };
            if !deliver(&events, step).await {
                break;
            }
            if failed {
                tokio::time::sleep(self.reconnect_delay).await;
            }
        }
        tracing::debug!("mqtt event pump stopped");
    }

    fn on_event(&mut self, event: Event) -> Step {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                self.connected = true;
                Step::Emit(TransportEvent::Connected {
                    cause: format!("connack, session present: {}", ack.session_present),
                })
            }
            Event::Incoming(Packet::Publish(publish)) => Step::Emit(TransportEvent::MessageArrived {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            Event::Incoming(Packet::SubAck(ack)) => {
                let Some(topic) = self.tracker.acknowledged(ack.pkid) else {
                    tracing::debug!(pkid = ack.pkid, "suback for unknown subscription");
                    return Step::Skip;
                };
                let success = !ack.return_codes.is_empty()
                    && ack
                        .return_codes
                        .iter()
                        .all(|code| matches!(code, SubscribeReasonCode::Success(_)));
                Step::Emit(TransportEvent::SubscribeResult { topic, success })
            }
            Event::Incoming(Packet::PubAck(ack)) => {
                Step::Notify(TransportEvent::DeliveryComplete { packet_id: ack.pkid })
            }
            Event::Outgoing(Outgoing::Subscribe(pkid)) => {
                self.tracker.sent(pkid);
                Step::Skip
            }
            Event::Outgoing(Outgoing::Disconnect) => Step::Stop,
            _ => Step::Skip,
        }
    }

    fn on_error(&mut self, err: &MqttError) -> Step {
        self.tracker.reset_in_flight();
        let description = err.describe();
        if std::mem::replace(&mut self.connected, false) {
            tracing::warn!(error = %description, "mqtt connection lost");
            Step::Emit(TransportEvent::ConnectionLost { cause: description })
        } else {
            tracing::error!(error = %description, "mqtt connection failed");
            Step::Emit(TransportEvent::ConnectFailure {
                reason: description,
            })
        }
    }
}
