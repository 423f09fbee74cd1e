//! MQTT connection configuration.

use std::time::Duration;

use serde::Deserialize;

/// Connection settings for the MQTT broker.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Optional broker credentials; both must be set to be used.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Capacity of the client request queue and of the event channel.
    pub channel_capacity: usize,
    /// Pause between two connection attempts, in seconds.
    pub reconnect_delay_secs: u64,
    /// Longest wait for one publish or subscribe request, in seconds.
    pub request_timeout_secs: u64,
}

impl MqttConfig {
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Credentials, when both halves are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "homesim".to_string(),
            keep_alive_secs: 30,
            username: None,
            password: None,
            channel_capacity: 64,
            reconnect_delay_secs: 5,
            request_timeout_secs: 5,
        }
    }
}
