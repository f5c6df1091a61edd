//! Wire contract for replication events
//!
//! Every frame on a hub/worker channel is JSON. A frame is a protocol
//! message when it is an object whose `sender` field equals
//! [`PROTOCOL_TAG`]; anything else is an application payload:
//!
//! ```text
//! {"sender":"workerShare","action":"set","property":"value","value":"England"}
//! {"sender":"workerShare","action":"delete","property":3}
//! "Hi!"                                  <- application payload
//! ```
//!
//! Decoding produces an [`Envelope`], so callers match on a variant instead
//! of inspecting the payload at runtime.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Marker carried in the `sender` field of every protocol message
pub const PROTOCOL_TAG: &str = "workerShare";

/// A replication event, used in both directions of the hub/worker edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireMessage", try_from = "WireMessage")]
pub enum Message {
    /// Store `value` under `key`
    Set { key: Key, value: Value },
    /// Remove `key` (a no-op when absent)
    Delete { key: Key },
}

impl Message {
    /// Create a SET message
    pub fn set(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        Message::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a DELETE message
    pub fn delete(key: impl Into<Key>) -> Self {
        Message::Delete { key: key.into() }
    }

    /// The key this message targets
    pub fn key(&self) -> &Key {
        match self {
            Message::Set { key, .. } | Message::Delete { key } => key,
        }
    }

    /// Lowercase action name, as it appears on the wire
    pub fn action(&self) -> &'static str {
        match self {
            Message::Set { .. } => "set",
            Message::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Set,
    Delete,
}

/// Flat wire shape of a [`Message`]
#[derive(Serialize, Deserialize)]
struct WireMessage {
    sender: String,
    action: Action,
    property: Key,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        let (action, property, value) = match message {
            Message::Set { key, value } => (Action::Set, key, Some(value)),
            Message::Delete { key } => (Action::Delete, key, None),
        };
        Self {
            sender: PROTOCOL_TAG.to_string(),
            action,
            property,
            value,
        }
    }
}

impl TryFrom<WireMessage> for Message {
    type Error = Error;

    fn try_from(wire: WireMessage) -> Result<Self> {
        if wire.sender != PROTOCOL_TAG {
            return Err(Error::MalformedProtocol(format!(
                "unexpected sender {:?}",
                wire.sender
            )));
        }
        Ok(match wire.action {
            // A SET without a value stores null
            Action::Set => Message::Set {
                key: wire.property,
                value: wire.value.unwrap_or_default(),
            },
            Action::Delete => Message::Delete { key: wire.property },
        })
    }
}

/// One decoded frame: either a protocol message or an application payload
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Replication event
    Share(Message),
    /// Ordinary application message, passed to user handlers untouched
    User(Value),
}

impl Envelope {
    /// Serialize this envelope into a frame
    ///
    /// Application payloads carrying the protocol tag are rejected with
    /// [`Error::ReservedTag`]; on the receiving side they would be read as
    /// replication events.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Envelope::Share(message) => {
                serde_json::to_vec(message).map_err(|e| Error::Encode(e.to_string()))
            }
            Envelope::User(value) => {
                if carries_tag(value) {
                    return Err(Error::ReservedTag);
                }
                serde_json::to_vec(value).map_err(|e| Error::Encode(e.to_string()))
            }
        }
    }

    /// Parse a frame
    ///
    /// - not JSON → [`Error::Decode`]
    /// - tagged but not message-shaped → [`Error::MalformedProtocol`]
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let raw: serde_json::Value =
            serde_json::from_slice(frame).map_err(|e| Error::Decode(e.to_string()))?;

        let tagged = raw
            .get("sender")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|sender| sender == PROTOCOL_TAG);

        if tagged {
            serde_json::from_value(raw)
                .map(Envelope::Share)
                .map_err(|e| Error::MalformedProtocol(e.to_string()))
        } else {
            serde_json::from_value(raw)
                .map(Envelope::User)
                .map_err(|e| Error::Decode(e.to_string()))
        }
    }
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        Envelope::Share(message)
    }
}

fn carries_tag(value: &Value) -> bool {
    value
        .as_map()
        .and_then(|map| map.get("sender"))
        .and_then(Value::as_str)
        .is_some_and(|sender| sender == PROTOCOL_TAG)
}
