// src/rabbitmq/channel.rs
// lapin-backed implementations of the broker seams

use std::sync::Arc;

use async_trait::async_trait;
use lapin::{options::BasicPublishOptions, BasicProperties, Channel, Connection};
use tracing::debug;

use super::broker::{BrokerChannel, BrokerConnection, PublishProperties};
use super::errors::Result;

const REPLY_SUCCESS: u16 = 200;

/// Shared lapin connection handed out to producers.
#[derive(Clone)]
pub struct LapinConnection {
    connection: Arc<Connection>,
    generation: u64,
}

impl LapinConnection {
    pub fn new(connection: Arc<Connection>, generation: u64) -> Self {
        Self {
            connection,
            generation,
        }
    }
}

#[async_trait]
impl BrokerConnection for LapinConnection {
    async fn create_channel(&self) -> Result<Box<dyn BrokerChannel>> {
        let channel = self.connection.create_channel().await?;
        debug!(channel_id = channel.id(), "Opened publish channel");
        Ok(Box::new(LapinChannel { channel }))
    }

    fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

/// A lapin channel scoped to a single publish.
pub struct LapinChannel {
    channel: Channel,
}

#[async_trait]
impl BrokerChannel for LapinChannel {
    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: &PublishProperties,
        payload: &[u8],
    ) -> Result<()> {
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::from(properties),
            )
            .await?
            .await?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.channel.status().connected()
    }

    async fn close(&self) -> Result<()> {
        self.channel
            .close(REPLY_SUCCESS, "Publish complete")
            .await?;
        Ok(())
    }
}
