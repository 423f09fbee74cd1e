//! Device handles and inbound routing keys.

use std::fmt;

/// Stable handle of a device inside the registry arena.
///
/// The handle is a slot index assigned at registration. Slots are never
/// reused or removed, so a key stays valid for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey(usize);

impl DeviceKey {
    /// Wrap a slot index.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Access the slot index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inbound routing key: the receive topic paired with the device id.
///
/// Kept as two fields rather than a concatenated string so that
/// `("ab", "c")` and `("a", "bc")` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    pub receive_topic: String,
    pub id: String,
}

impl RoutingKey {
    #[must_use]
    pub fn new(receive_topic: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            receive_topic: receive_topic.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.receive_topic, self.id)
    }
}
