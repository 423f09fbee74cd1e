//! Device registry: arena of devices plus the inbound routing index.
//!
//! Devices live in a growable arena addressed by [`DeviceKey`] slot indices.
//! Inbound commands are routed through a two-level map
//! `receive_topic -> id -> DeviceKey`, so a lookup costs two hash reads and the
//! set of receive topics is simply the outer key set.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use homesim_domain::device::{Device, DeviceKind};
use homesim_domain::error::{ConfigurationError, RoutingMiss};
use homesim_domain::id::{DeviceKey, RoutingKey};

/// A registered device: immutable identity plus its state lock.
///
/// Identity fields are copied out of the [`Device`] at registration so that
/// routing and validation never need the state lock.
#[derive(Debug)]
pub struct DeviceHandle {
    key: DeviceKey,
    name: String,
    kind: DeviceKind,
    publish_topic: String,
    routing: Option<RoutingKey>,
    allowed_states: Vec<String>,
    periodic: bool,
    state: Mutex<Device>,
}

impl DeviceHandle {
    fn new(key: DeviceKey, device: Device) -> Self {
        Self {
            key,
            name: device.name().to_string(),
            kind: device.kind(),
            publish_topic: device.publish_topic().to_string(),
            routing: device.routing_key().cloned(),
            allowed_states: device.allowed_states().map(<[String]>::to_vec).unwrap_or_default(),
            periodic: device.cadence().is_some(),
            state: Mutex::new(device),
        }
    }

    #[must_use]
    pub fn key(&self) -> DeviceKey {
        self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    #[must_use]
    pub fn publish_topic(&self) -> &str {
        &self.publish_topic
    }

    #[must_use]
    pub fn routing_key(&self) -> Option<&RoutingKey> {
        self.routing.as_ref()
    }

    /// Whether the device runs a publish loop.
    #[must_use]
    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Whether `state` is one of the device's allowed states.
    #[must_use]
    pub fn accepts(&self, state: &str) -> bool {
        self.allowed_states.iter().any(|allowed| allowed == state)
    }

    /// Acquire the device's state lock.
    pub async fn lock(&self) -> MutexGuard<'_, Device> {
        self.state.lock().await
    }
}

/// Every device of the simulation and the index used to route commands.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Arc<DeviceHandle>>,
    routes: HashMap<String, HashMap<String, DeviceKey>>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every device in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateRoutingKey`] on the first
    /// routing key registered twice.
    pub fn from_devices(
        devices: impl IntoIterator<Item = Device>,
    ) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for device in devices {
            registry.register(device)?;
        }
        Ok(registry)
    }

    /// Add a device and index its routing key, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateRoutingKey`] if another device
    /// already receives on the same topic with the same id. The registry is
    /// left unchanged in that case.
    pub fn register(&mut self, device: Device) -> Result<DeviceKey, ConfigurationError> {
        let key = DeviceKey::from_index(self.devices.len());
        if let Some(routing) = device.routing_key() {
            let ids = self.routes.entry(routing.receive_topic.clone()).or_default();
            if ids.contains_key(&routing.id) {
                return Err(ConfigurationError::DuplicateRoutingKey {
                    topic: routing.receive_topic.clone(),
                    id: routing.id.clone(),
                });
            }
            ids.insert(routing.id.clone(), key);
        }
        tracing::debug!(device = %device.name(), kind = %device.kind(), %key, "device registered");
        self.devices.push(Arc::new(DeviceHandle::new(key, device)));
        Ok(key)
    }

    /// Find the device addressed by an inbound command.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingMiss`] when nothing is registered for the pair.
    pub fn lookup(&self, topic: &str, id: &str) -> Result<&Arc<DeviceHandle>, RoutingMiss> {
        self.routes
            .get(topic)
            .and_then(|ids| ids.get(id))
            .and_then(|key| self.get(*key))
            .ok_or_else(|| RoutingMiss {
                topic: topic.to_string(),
                id: id.to_string(),
            })
    }

    #[must_use]
    pub fn get(&self, key: DeviceKey) -> Option<&Arc<DeviceHandle>> {
        self.devices.get(key.index())
    }

    /// Distinct receive topics, sorted.
    #[must_use]
    pub fn all_receive_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.routes.keys().cloned().collect();
        topics.sort_unstable();
        topics
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DeviceHandle>> {
        self.devices.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
