//! Transport port: the publish/subscribe client shared by every device.
//!
//! Operations only report whether the request could be handed to the
//! client. Their outcome on the wire (connection established, subscription
//! acknowledged, delivery completed) arrives later as a [`TransportEvent`]
//! on the channel returned by the adapter when it connects.

use std::future::Future;

use homesim_domain::error::TransportError;
use homesim_domain::message::Qos;

/// A publish/subscribe client.
///
/// Implementations live in adapter crates (e.g. `homesim-adapter-mqtt`).
pub trait Transport: Send + Sync {
    /// Queue `payload` for publication on `topic`.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: Qos,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Request a subscription to `topic`.
    fn subscribe(
        &self,
        topic: &str,
        qos: Qos,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Drop a subscription to `topic`.
    fn unsubscribe(&self, topic: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the connection.
    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Asynchronous notification emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established.
    Connected { cause: String },
    /// An established connection dropped.
    ConnectionLost { cause: String },
    /// A connection attempt failed.
    ConnectFailure { reason: String },
    /// A message arrived on a subscribed topic.
    MessageArrived { topic: String, payload: Vec<u8> },
    /// The broker answered a subscription request.
    SubscribeResult { topic: String, success: bool },
    /// The broker acknowledged a published message.
    DeliveryComplete { packet_id: u16 },
}
