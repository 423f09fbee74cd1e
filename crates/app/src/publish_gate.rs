//! Publish gate: the single mutual-exclusion point in front of the shared
//! transport connection.
//!
//! Every publish and subscribe, from every device worker and from the
//! dispatcher, goes through the same gate. It is not a queue: callers wait
//! until the lock is granted and order between devices is unspecified.
//!
//! Lock ordering: a caller that also holds a device state lock must have
//! acquired that lock *before* entering the gate.
//!
//! Every operation, lock wait included, is bounded by the gate's timeout. A
//! transport whose request queue stopped draining (broker unreachable) fails
//! the call with a [`TransportError`] instead of parking the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use homesim_domain::error::TransportError;
use homesim_domain::message::Qos;

use crate::ports::Transport;

/// How long an operation may wait for the gate and the transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared, cloneable handle to the transport behind a mutex.
pub struct PublishGate<T> {
    transport: Arc<Mutex<T>>,
    timeout: Duration,
}

impl<T> Clone for PublishGate<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            timeout: self.timeout,
        }
    }
}

impl<T: Transport> PublishGate<T> {
    /// Wrap a transport, bounding operations by [`DEFAULT_TIMEOUT`].
    pub fn new(transport: T) -> Self {
        Self::with_timeout(transport, DEFAULT_TIMEOUT)
    }

    /// Wrap a transport, bounding every operation by `timeout`.
    pub fn with_timeout(transport: T, timeout: Duration) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            timeout,
        }
    }

    async fn bounded(
        &self,
        operation: &'static str,
        attempt: impl Future<Output = Result<(), TransportError>>,
    ) -> Result<(), TransportError> {
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(elapsed) => Err(TransportError::new(operation, elapsed)),
        }
    }

    /// Publish `payload` on `topic` with at-least-once delivery.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] raised by the transport, or one wrapping
    /// the elapsed timeout.
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
    ) -> Result<(), TransportError> {
        let payload = payload.into();
        let attempt = async {
            let transport = self.transport.lock().await;
            transport.publish(topic, payload, Qos::AtLeastOnce).await
        };
        self.bounded("publish", attempt).await
    }

    /// Subscribe to `topic` with at-least-once delivery.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] raised by the transport.
    pub async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        let attempt = async {
            let transport = self.transport.lock().await;
            transport.subscribe(topic, Qos::AtLeastOnce).await
        };
        self.bounded("subscribe", attempt).await
    }

    /// Unsubscribe from `topic`.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] raised by the transport.
    pub async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        let attempt = async {
            let transport = self.transport.lock().await;
            transport.unsubscribe(topic).await
        };
        self.bounded("unsubscribe", attempt).await
    }

    /// Close the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] raised by the transport.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        let attempt = async {
            let transport = self.transport.lock().await;
            transport.disconnect().await
        };
        self.bounded("disconnect", attempt).await
    }
}
