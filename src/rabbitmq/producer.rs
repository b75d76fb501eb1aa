// src/rabbitmq/producer.rs

use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use super::broker::{BrokerChannel, BrokerConnection, ConnectionState, PublishProperties};
use super::errors::{Result, StoreError};
use super::store::MessageStore;
use crate::message::{DefaultMessageConverter, MessageContext, MessageConverter, DEFAULT_PRIORITY};

const DEFAULT_EXCHANGE: &str = "";

/// Publishes messages of one store to its queue, one attempt per call.
///
/// Any failure after a connection was handed over makes the producer ask the
/// store to tear that connection down and forget it locally. Until the store
/// supplies a new one through [`RabbitMqProducer::set_connection`], every
/// call returns `false` without touching the broker.
pub struct RabbitMqProducer {
    store: Arc<dyn MessageStore>,
    converter: Arc<dyn MessageConverter>,
    connection: ConnectionState,
    queue_name: String,
    exchange_name: Option<String>,
    id: Option<String>,
}

impl RabbitMqProducer {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            converter: Arc::new(DefaultMessageConverter),
            connection: ConnectionState::Disconnected,
            queue_name: String::new(),
            exchange_name: None,
            id: None,
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn MessageConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn set_queue_name(&mut self, queue_name: impl Into<String>) {
        self.queue_name = queue_name.into();
    }

    pub fn set_exchange_name(&mut self, exchange_name: Option<String>) {
        self.exchange_name = exchange_name;
    }

    pub fn set_connection(&mut self, connection: ConnectionState) {
        self.connection = connection;
    }

    /// Assigns the diagnostic label. Only the first call has any effect.
    pub fn set_id(&mut self, index: u32) {
        if let Some(existing) = &self.id {
            warn!(producer = %existing, index, "Producer id already assigned");
            return;
        }
        self.id = Some(format!("[{}-P-{}]", self.store.name(), index));
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn exchange_name(&self) -> Option<&str> {
        self.exchange_name.as_deref()
    }

    fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("[unassigned]")
    }

    /// Stores one message. `false` means it was not stored and the caller
    /// decides whether to retry or redeliver.
    pub async fn store_message(&mut self, message: Option<&MessageContext>) -> bool {
        let Some(context) = message else {
            trace!(producer = %self.label(), "No message to store");
            return false;
        };

        let Some(connection) = self.connection.handle().cloned() else {
            debug!(producer = %self.label(), "Cannot proceed, RabbitMQ connection is not available");
            warn!(
                producer = %self.label(),
                message_id = %context.message_id,
                "Ignored message, no connection"
            );
            return false;
        };

        match self.publish(connection.as_ref(), context).await {
            Ok(()) => {
                debug!(
                    producer = %self.label(),
                    message_id = %context.message_id,
                    "Stored message"
                );
                self.store.enqueued();
                true
            }
            Err(err) => {
                if err.is_transport() {
                    error!(
                        producer = %self.label(),
                        message_id = %context.message_id,
                        store = %self.store.name(),
                        error = %err,
                        "Ignored message, connection failure while storing"
                    );
                } else {
                    error!(
                        producer = %self.label(),
                        message_id = %context.message_id,
                        store = %self.store.name(),
                        error = ?err,
                        "Ignored message, could not store message"
                    );
                }
                self.store
                    .close_producer_connection(connection.generation())
                    .await;
                self.connection = ConnectionState::Disconnected;
                debug!(
                    producer = %self.label(),
                    message_id = %context.message_id,
                    "Ignored message"
                );
                false
            }
        }
    }

    async fn publish(
        &self,
        connection: &dyn BrokerConnection,
        context: &MessageContext,
    ) -> Result<()> {
        if self.queue_name.is_empty() {
            return Err(StoreError::Config("no queue name configured".to_string()));
        }

        let storable = self.converter.to_storable(context);
        let payload = storable.to_bytes()?;
        let properties =
            PublishProperties::persistent(context.message_id.clone(), storable.priority(DEFAULT_PRIORITY));

        let channel = connection.create_channel().await?;
        let exchange = self.exchange_name.as_deref().unwrap_or(DEFAULT_EXCHANGE);
        let outcome = channel
            .basic_publish(exchange, &self.queue_name, &properties, &payload)
            .await;
        self.release_channel(channel.as_ref(), &context.message_id).await;
        outcome
    }

    async fn release_channel(&self, channel: &dyn BrokerChannel, message_id: &str) {
        if !channel.is_open() {
            return;
        }
        if let Err(err) = channel.close().await {
            error!(
                producer = %self.label(),
                message_id = %message_id,
                error = %err,
                "Error when closing channel"
            );
        }
    }

    /// Hands the producer's slot back to the store.
    pub fn cleanup(&self) -> bool {
        self.store.cleanup(None, false)
    }
}
