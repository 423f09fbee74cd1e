//! MQTT adapter error types.

use homesim_domain::error::TransportError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client could not queue a request.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// The event loop lost or could not establish the connection.
    #[error("MQTT connection error")]
    Connection(#[source] rumqttc::ConnectionError),
}

impl MqttError {
    /// Convert into a [`TransportError`] for propagation across the port
    /// boundary.
    pub fn into_transport(self, operation: &'static str) -> TransportError {
        TransportError::new(operation, self)
    }

    /// One-line description including the underlying cause.
    #[must_use]
    pub fn describe(&self) -> String {
        match std::error::Error::source(self) {
            Some(source) => format!("{self}: {source}"),
            None => self.to_string(),
        }
    }
}
