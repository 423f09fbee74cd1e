//! In-memory transport used by the unit tests of this crate.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use homesim_domain::error::TransportError;
use homesim_domain::message::Qos;

use crate::ports::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: Qos,
}

impl Published {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[derive(Debug, Default)]
struct Recorded {
    published: Vec<Published>,
    subscriptions: Vec<String>,
    unsubscriptions: Vec<String>,
    disconnected: bool,
}

/// Records every call; optionally fails or stalls every publish.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    recorded: Arc<Mutex<Recorded>>,
    fail_publish: bool,
    stall_publish: bool,
    fail_subscribe: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            fail_publish: true,
            ..Self::default()
        }
    }

    /// Every subscribe request is rejected by the client.
    pub fn refusing_subscribe() -> Self {
        Self {
            fail_subscribe: true,
            ..Self::default()
        }
    }

    /// Publishes never complete, like a client whose request queue is full
    /// while the broker is unreachable.
    pub fn stalled() -> Self {
        Self {
            stall_publish: true,
            ..Self::default()
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        let mut recorded = self.recorded.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut recorded)
    }

    pub fn published(&self) -> Vec<Published> {
        self.with(|r| r.published.clone())
    }

    /// Text of every payload published on `topic`, in order.
    pub fn texts_on(&self, topic: &str) -> Vec<String> {
        self.with(|r| {
            r.published
                .iter()
                .filter(|p| p.topic == topic)
                .map(Published::text)
                .collect()
        })
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.with(|r| r.subscriptions.clone())
    }

    pub fn unsubscriptions(&self) -> Vec<String> {
        self.with(|r| r.unsubscriptions.clone())
    }

    pub fn is_disconnected(&self) -> bool {
        self.with(|r| r.disconnected)
    }
}

impl Transport for RecordingTransport {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: Qos,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let stall = self.stall_publish;
        let result = if stall {
            Ok(())
        } else if self.fail_publish {
            Err(TransportError::new(
                "publish",
                std::io::Error::other("broker unavailable"),
            ))
        } else {
            self.with(|r| {
                r.published.push(Published {
                    topic: topic.to_string(),
                    payload,
                    qos,
                });
            });
            Ok(())
        };
        async move {
            if stall {
                std::future::pending::<()>().await;
            }
            result
        }
    }

    fn subscribe(
        &self,
        topic: &str,
        _qos: Qos,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let result = if self.fail_subscribe {
            Err(TransportError::new(
                "subscribe",
                std::io::Error::other("request queue closed"),
            ))
        } else {
            self.with(|r| r.subscriptions.push(topic.to_string()));
            Ok(())
        };
        async move { result }
    }

    fn unsubscribe(&self, topic: &str) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.with(|r| r.unsubscriptions.push(topic.to_string()));
        async { Ok(()) }
    }

    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.with(|r| r.disconnected = true);
        async { Ok(()) }
    }
}
