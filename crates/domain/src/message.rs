//! Messages exchanged over the bus.
//!
//! Inbound commands are small JSON objects `{"id": "...", "state": "..."}`.
//! Outbound status messages are plain UTF-8 text.

use std::fmt;

use serde::Deserialize;

use crate::error::DecodeError;

/// Delivery guarantee requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Qos {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

/// A decoded inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub id: String,
    pub state: String,
}

#[derive(Deserialize)]
struct CommandPayload {
    id: String,
    state: String,
}

impl InboundMessage {
    /// Decode a command received on `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the payload is not UTF-8, not a JSON
    /// object, or lacks a string `id` or `state` field.
    pub fn decode(topic: &str, payload: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(payload).map_err(DecodeError::Utf8)?;
        let CommandPayload { id, state } =
            serde_json::from_str(text).map_err(DecodeError::Json)?;
        Ok(Self {
            topic: topic.to_string(),
            id,
            state,
        })
    }
}

/// Human-readable status line published on a device's own topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage<'a> {
    /// A tick produced a value different from the previous one.
    Changed { name: &'a str, value: &'a str },
    /// A tick produced the same value as before.
    Unchanged { name: &'a str, value: &'a str },
    /// A command switched the device to another state.
    ChangedViaMessage { name: &'a str, state: &'a str },
    /// A command requested the state the device is already in.
    UnchangedViaMessage { name: &'a str, state: &'a str },
    /// A command requested a state the device does not know.
    UnknownState { name: &'a str, state: &'a str },
}

impl<'a> StatusMessage<'a> {
    /// Status line of a tick, picking the variant from `changed`.
    #[must_use]
    pub fn tick(name: &'a str, value: &'a str, changed: bool) -> Self {
        if changed {
            Self::Changed { name, value }
        } else {
            Self::Unchanged { name, value }
        }
    }

    /// Status line of an accepted command, picking the variant from `changed`.
    #[must_use]
    pub fn command(name: &'a str, state: &'a str, changed: bool) -> Self {
        if changed {
            Self::ChangedViaMessage { name, state }
        } else {
            Self::UnchangedViaMessage { name, state }
        }
    }
}

impl fmt::Display for StatusMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed { name, value } => write!(f, "{name}: state changed to {value}"),
            Self::Unchanged { name, value } => write!(f, "{name}: state unchanged: {value}"),
            Self::ChangedViaMessage { name, state } => {
                write!(f, "{name}: state changed via message: {state}")
            }
            Self::UnchangedViaMessage { name, state } => {
                write!(f, "{name}: message received, state remains unchanged: {state}")
            }
            Self::UnknownState { name, state } => {
                write!(f, "{name}: change unsuccessful, unknown state: {state}")
            }
        }
    }
}
