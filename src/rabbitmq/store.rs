// src/rabbitmq/store.rs

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::broker::ConnectionState;
use super::channel::LapinConnection;
use super::connection::ConnectionManager;
use super::errors::Result;
use super::producer::RabbitMqProducer;
use crate::config::{RabbitConfig, StoreSettings};

/// What a producer needs from the store that owns it.
#[async_trait]
pub trait MessageStore: Send + Sync {
    fn name(&self) -> &str;

    /// Tears down the shared connection so the next producer gets a new one.
    /// Reports for an older generation than the current connection are
    /// ignored. Must tolerate being called repeatedly.
    async fn close_producer_connection(&self, generation: u64);

    /// Records one successfully stored message. Called concurrently by producers.
    fn enqueued(&self);

    /// Releases resources held for a producer (or consumer) slot.
    fn cleanup(&self, reason: Option<&str>, is_consumer: bool) -> bool;
}

/// A message store backed by a single RabbitMQ queue.
pub struct RabbitMqStore {
    settings: StoreSettings,
    connection: Mutex<ConnectionManager>,
    enqueued: AtomicU64,
    producer_ids: AtomicU32,
    active_producers: AtomicUsize,
}

impl RabbitMqStore {
    pub fn new(config: &RabbitConfig) -> Arc<Self> {
        let manager = ConnectionManager::from_config(&config.connection, &config.store.name);
        Arc::new(Self {
            settings: config.store.clone(),
            connection: Mutex::new(manager),
            enqueued: AtomicU64::new(0),
            producer_ids: AtomicU32::new(0),
            active_producers: AtomicUsize::new(0),
        })
    }

    /// Establishes the broker connection up front.
    pub async fn connect(&self) -> Result<()> {
        let mut manager = self.connection.lock().await;
        manager.get_connection().await?;
        info!(
            store = %self.settings.name,
            queue = %self.settings.queue_name,
            exchange = ?self.settings.exchange_name,
            "Message store connected"
        );
        Ok(())
    }

    pub fn queue_name(&self) -> &str {
        &self.settings.queue_name
    }

    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::SeqCst)
    }

    pub fn active_producers(&self) -> usize {
        self.active_producers.load(Ordering::SeqCst)
    }

    async fn connection_state(&self) -> ConnectionState {
        let mut manager = self.connection.lock().await;
        match manager.get_connection().await {
            Ok(connection) => ConnectionState::Connected(Arc::new(LapinConnection::new(
                connection,
                manager.generation(),
            ))),
            Err(err) => {
                error!(store = %self.settings.name, error = %err, "Could not obtain a RabbitMQ connection");
                ConnectionState::Disconnected
            }
        }
    }

    /// Creates a producer bound to this store's queue and current connection.
    pub async fn producer(self: &Arc<Self>) -> RabbitMqProducer {
        let store: Arc<dyn MessageStore> = self.clone();
        let mut producer = RabbitMqProducer::new(store);
        producer.set_queue_name(self.settings.queue_name.clone());
        producer.set_exchange_name(self.settings.exchange_name.clone());
        producer.set_connection(self.connection_state().await);
        producer.set_id(self.producer_ids.fetch_add(1, Ordering::SeqCst) + 1);
        self.active_producers.fetch_add(1, Ordering::SeqCst);

        debug!(
            store = %self.settings.name,
            producer = producer.id().unwrap_or_default(),
            connected = producer.is_connected(),
            "Created producer"
        );
        producer
    }

    /// Gives a producer that lost its connection a fresh one.
    pub async fn reconnect_producer(&self, producer: &mut RabbitMqProducer) -> bool {
        if producer.is_connected() {
            return true;
        }
        producer.set_connection(self.connection_state().await);
        producer.is_connected()
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!(
            store = %self.settings.name,
            enqueued = self.enqueued_count(),
            "Shutting down message store"
        );
        self.connection.lock().await.close().await
    }
}

#[async_trait]
impl MessageStore for RabbitMqStore {
    fn name(&self) -> &str {
        &self.settings.name
    }

    async fn close_producer_connection(&self, generation: u64) {
        let mut manager = self.connection.lock().await;
        match manager.close_generation(generation).await {
            Ok(true) => {}
            Ok(false) => debug!(
                store = %self.settings.name,
                generation,
                current = manager.generation(),
                "Ignored close for a replaced connection"
            ),
            Err(err) => {
                warn!(store = %self.settings.name, error = %err, "Error while closing producer connection")
            }
        }
    }

    fn enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::SeqCst);
    }

    fn cleanup(&self, reason: Option<&str>, is_consumer: bool) -> bool {
        if !is_consumer {
            let _ = self
                .active_producers
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
        }
        debug!(
            store = %self.settings.name,
            reason = reason.unwrap_or("none"),
            is_consumer,
            "Cleaned up store slot"
        );
        true
    }
}
