// src/rabbitmq/broker.rs
// Seams between the producer and the AMQP client

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lapin::BasicProperties;

use super::errors::Result;

/// AMQP delivery mode carried in the basic properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Transient = 1,
    /// Survives a broker restart when routed to a durable queue.
    Persistent = 2,
}

/// Metadata attached to a single publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishProperties {
    pub message_id: String,
    pub delivery_mode: DeliveryMode,
    pub priority: u8,
}

impl PublishProperties {
    pub fn persistent(message_id: impl Into<String>, priority: u8) -> Self {
        Self {
            message_id: message_id.into(),
            delivery_mode: DeliveryMode::Persistent,
            priority,
        }
    }
}

impl From<&PublishProperties> for BasicProperties {
    fn from(props: &PublishProperties) -> Self {
        BasicProperties::default()
            .with_message_id(props.message_id.clone().into())
            .with_delivery_mode(props.delivery_mode as u8)
            .with_priority(props.priority)
    }
}

/// A channel opened for one publish attempt.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: &PublishProperties,
        payload: &[u8],
    ) -> Result<()>;

    fn is_open(&self) -> bool;

    async fn close(&self) -> Result<()>;
}

/// A broker connection shared by every producer of a store.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    async fn create_channel(&self) -> Result<Box<dyn BrokerChannel>>;

    fn is_connected(&self) -> bool;

    /// Which of the store's successive connections this handle belongs to.
    fn generation(&self) -> u64 {
        0
    }
}

/// Connection as seen by a producer.
#[derive(Clone, Default)]
pub enum ConnectionState {
    Connected(Arc<dyn BrokerConnection>),
    #[default]
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    pub fn handle(&self) -> Option<&Arc<dyn BrokerConnection>> {
        match self {
            ConnectionState::Connected(handle) => Some(handle),
            ConnectionState::Disconnected => None,
        }
    }
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected(handle) => f
                .debug_struct("Connected")
                .field("alive", &handle.is_connected())
                .finish(),
            ConnectionState::Disconnected => f.write_str("Disconnected"),
        }
    }
}
