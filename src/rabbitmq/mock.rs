// In-memory broker and store used by the unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::broker::{BrokerChannel, BrokerConnection, PublishProperties};
use super::errors::{Result, StoreError};
use super::store::MessageStore;

#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub properties: PublishProperties,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct BrokerLog {
    published: Mutex<Vec<PublishedMessage>>,
    publish_failures: Mutex<VecDeque<StoreError>>,
    channel_failure: Mutex<Option<StoreError>>,
    fail_close: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

pub struct MockConnection {
    log: Arc<BrokerLog>,
    generation: u64,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Self::with_generation(0)
    }

    pub fn with_generation(generation: u64) -> Arc<Self> {
        Arc::new(Self {
            log: Arc::new(BrokerLog::default()),
            generation,
        })
    }

    pub fn fail_next_publish(&self, error: StoreError) {
        self.log.publish_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_channel_creation(&self, error: StoreError) {
        *self.log.channel_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_channel_close(&self) {
        self.log.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.log.published.lock().unwrap().clone()
    }

    pub fn channels_opened(&self) -> usize {
        self.log.opened.load(Ordering::SeqCst)
    }

    pub fn channels_closed(&self) -> usize {
        self.log.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerConnection for MockConnection {
    async fn create_channel(&self) -> Result<Box<dyn BrokerChannel>> {
        if let Some(err) = self.log.channel_failure.lock().unwrap().take() {
            return Err(err);
        }
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockChannel {
            log: self.log.clone(),
            open: AtomicBool::new(true),
        }))
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

struct MockChannel {
    log: Arc<BrokerLog>,
    open: AtomicBool,
}

#[async_trait]
impl BrokerChannel for MockChannel {
    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: &PublishProperties,
        payload: &[u8],
    ) -> Result<()> {
        let failure = self.log.publish_failures.lock().unwrap().pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        self.log.published.lock().unwrap().push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            properties: properties.clone(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        if self.log.fail_close.load(Ordering::SeqCst) {
            return Err(StoreError::Channel("close rejected".into()));
        }
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockStore {
    name: String,
    enqueued: AtomicU64,
    closes: AtomicUsize,
    closed_generations: Mutex<Vec<u64>>,
    cleanups: AtomicUsize,
}

impl MockStore {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            enqueued: AtomicU64::new(0),
            closes: AtomicUsize::new(0),
            closed_generations: Mutex::new(Vec::new()),
            cleanups: AtomicUsize::new(0),
        })
    }

    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn closed_generations(&self) -> Vec<u64> {
        self.closed_generations.lock().unwrap().clone()
    }

    pub fn cleanup_calls(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn close_producer_connection(&self, generation: u64) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed_generations.lock().unwrap().push(generation);
    }

    fn enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::SeqCst);
    }

    fn cleanup(&self, _reason: Option<&str>, _is_consumer: bool) -> bool {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        true
    }
}
