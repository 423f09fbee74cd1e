//! Common error types used across the workspace.
//!
//! Each failure class of the simulator has its own typed error. They are
//! gathered under [`SimError`] so ports and services can return a single
//! type while callers still match on the precise cause.

use crate::device::DeviceKind;

/// Top-level error for homesim.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The device configuration is invalid. Fatal, startup only.
    #[error("configuration error")]
    Configuration(#[from] ConfigurationError),

    /// An inbound payload could not be decoded.
    #[error("decode error")]
    Decode(#[from] DecodeError),

    /// No device is registered for the inbound routing key.
    #[error("routing miss")]
    RoutingMiss(#[from] RoutingMiss),

    /// A command asked for a state the device does not know.
    #[error("validation error")]
    Validation(#[from] UnknownStateError),

    /// The transport rejected an operation.
    #[error("transport error")]
    Transport(#[from] TransportError),
}

/// Reasons a device descriptor is rejected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The device file is not valid JSON or a required field is missing.
    #[error("failed to parse device file")]
    Parse(#[source] serde_json::Error),

    /// A required field is present but empty.
    #[error("{kind} '{name}': field '{field}' must not be empty")]
    MissingField {
        kind: DeviceKind,
        name: String,
        field: &'static str,
    },

    /// An enumerated-state device has no allowed states.
    #[error("{kind} '{name}': the list of states is empty")]
    EmptyStates { kind: DeviceKind, name: String },

    /// A camera has no images to publish.
    #[error("camera '{name}': the list of images is empty")]
    EmptyImages { name: String },

    /// `min` is greater than `max`.
    #[error("{kind} '{name}': minimum {min} is greater than maximum {max}")]
    InvalidBounds {
        kind: DeviceKind,
        name: String,
        min: f64,
        max: f64,
    },

    /// The step range is negative or inverted.
    #[error("{kind} '{name}': step range [{min_step}, {max_step}] is invalid")]
    InvalidStepRange {
        kind: DeviceKind,
        name: String,
        min_step: f64,
        max_step: f64,
    },

    /// The initial value lies outside `[min, max]`.
    #[error("{kind} '{name}': initial value {value} is outside [{min}, {max}]")]
    ValueOutOfBounds {
        kind: DeviceKind,
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A period is zero or a period range is inverted.
    #[error("{kind} '{name}': invalid period")]
    InvalidPeriod { kind: DeviceKind, name: String },

    /// Two receiving devices share the same receive topic and id.
    #[error("duplicate routing key: topic '{topic}', id '{id}'")]
    DuplicateRoutingKey { topic: String, id: String },
}

/// Why an inbound payload was dropped.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload is not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    Utf8(#[source] std::str::Utf8Error),

    /// The payload is not an object with string `id` and `state` fields.
    #[error("payload is not a valid command")]
    Json(#[source] serde_json::Error),
}

/// No device is registered for a receive topic and id.
#[derive(Debug, thiserror::Error)]
#[error("no device registered for topic '{topic}' and id '{id}'")]
pub struct RoutingMiss {
    pub topic: String,
    pub id: String,
}

/// A command requested a state that is not among the device's allowed states.
#[derive(Debug, thiserror::Error)]
#[error("unknown state '{state}' for device '{device}'")]
pub struct UnknownStateError {
    pub device: String,
    pub state: String,
}

/// An operation on the transport failed.
///
/// The source is boxed so that adapters do not leak their client crate into
/// the core.
#[derive(Debug, thiserror::Error)]
#[error("transport operation '{operation}' failed")]
pub struct TransportError {
    pub operation: &'static str,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    /// Wrap an adapter error raised while performing `operation`.
    pub fn new(
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}
