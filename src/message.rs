use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::rabbitmq::Result;

/// Priority used in the publish metadata when a message carries none.
pub const DEFAULT_PRIORITY: u8 = 0;

/// Property key the default converter reads a priority from.
pub const PRIORITY_PROPERTY: &str = "priority";

/// An in-flight application message handed to a producer.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MessageContext {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub priority: Option<u8>,
}

impl MessageContext {
    /// Creates a new MessageContext with the current timestamp and a generated UUID.
    pub fn new(payload: Value) -> Self {
        MessageContext {
            message_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            payload,
            properties: BTreeMap::new(),
            priority: None,
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = message_id.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Snapshot of a [`MessageContext`] in the form written to the broker.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StorableMessage {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    pub properties: BTreeMap<String, String>,
    priority: Option<u8>,
}

impl StorableMessage {
    /// Returns the message priority, or `default` when none was set.
    pub fn priority(&self, default: u8) -> u8 {
        self.priority.unwrap_or(default)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Rebuilds a message from the bytes produced by [`StorableMessage::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Turns application messages into their storable form.
pub trait MessageConverter: Send + Sync {
    fn to_storable(&self, context: &MessageContext) -> StorableMessage;
}

/// Copies the context as-is. Priority comes from the explicit field, falling
/// back to a numeric `priority` property.
#[derive(Clone, Debug, Default)]
pub struct DefaultMessageConverter;

impl MessageConverter for DefaultMessageConverter {
    fn to_storable(&self, context: &MessageContext) -> StorableMessage {
        let priority = context.priority.or_else(|| {
            context
                .properties
                .get(PRIORITY_PROPERTY)
                .and_then(|value| value.trim().parse::<u8>().ok())
        });

        StorableMessage {
            message_id: context.message_id.clone(),
            timestamp: context.timestamp,
            payload: context.payload.clone(),
            properties: context.properties.clone(),
            priority,
        }
    }
}
