use lapin::{Connection, ConnectionProperties};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info};

use super::errors::{Result, StoreError};
use crate::config::ConnectionConfig;

const MAX_RECONNECT_DELAY_MS: u64 = 30_000;

/// Owns the store's lapin connection and re-establishes it on demand.
pub struct ConnectionManager {
    uri: String,
    connection_name: String,
    connection: Option<Arc<Connection>>,
    generation: u64,
    connect_timeout: Duration,
    reconnect_attempts: u32,
    max_reconnect_attempts: u32,
    reconnect_delay_ms: u64,
}

impl ConnectionManager {
    pub fn new(uri: &str, connection_name: &str) -> Self {
        ConnectionManager {
            uri: uri.to_string(),
            connection_name: connection_name.to_string(),
            connection: None,
            generation: 0,
            connect_timeout: Duration::from_millis(5000),
            reconnect_attempts: 0,
            max_reconnect_attempts: 10,
            reconnect_delay_ms: 1000,
        }
    }

    pub fn from_config(config: &ConnectionConfig, connection_name: &str) -> Self {
        Self::new(&config.amqp_uri(), connection_name)
            .with_connect_timeout(config.connect_timeout())
            .with_reconnect_policy(config.max_reconnect_attempts, config.reconnect_delay_ms)
    }

    pub fn with_reconnect_policy(mut self, max_attempts: u32, initial_delay_ms: u64) -> Self {
        self.max_reconnect_attempts = max_attempts.max(1);
        self.reconnect_delay_ms = initial_delay_ms;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Bumped every time a new connection is established.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .map_or(false, |conn| conn.status().connected())
    }

    /// Returns the live connection, reconnecting first if it is gone.
    pub async fn get_connection(&mut self) -> Result<Arc<Connection>> {
        if let Some(conn) = self.connection.as_ref() {
            if conn.status().connected() {
                return Ok(conn.clone());
            }
        }
        self.establish_connection().await
    }

    fn connection_properties(&self) -> ConnectionProperties {
        ConnectionProperties::default().with_connection_name(self.connection_name.clone().into())
    }

    async fn establish_connection(&mut self) -> Result<Arc<Connection>> {
        self.reconnect_attempts = 0;
        let mut delay = self.reconnect_delay_ms;

        loop {
            info!(connection = %self.connection_name, "Attempting to connect to RabbitMQ");

            let attempt = timeout(
                self.connect_timeout,
                Connection::connect(&self.uri, self.connection_properties()),
            )
            .await
            .map_err(StoreError::from)
            .and_then(|result| result.map_err(StoreError::from));

            match attempt {
                Ok(conn) => {
                    info!(connection = %self.connection_name, "Successfully connected to RabbitMQ");
                    let conn = Arc::new(conn);
                    self.connection = Some(conn.clone());
                    self.generation += 1;
                    return Ok(conn);
                }
                Err(err) => {
                    self.reconnect_attempts += 1;
                    error!(
                        "Failed to connect to RabbitMQ (attempt {}/{}): {}",
                        self.reconnect_attempts, self.max_reconnect_attempts, err
                    );

                    if self.reconnect_attempts >= self.max_reconnect_attempts {
                        error!("Max reconnection attempts reached. Giving up.");
                        return Err(err);
                    }

                    // Exponential backoff with jitter
                    let jitter = (rand::random::<f64>() * 0.3 - 0.15) * delay as f64;
                    let sleep_time = (delay as f64 + jitter).max(0.0) as u64;
                    info!("Waiting {}ms before next reconnect attempt", sleep_time);
                    sleep(Duration::from_millis(sleep_time)).await;

                    delay = std::cmp::min(delay.saturating_mul(2), MAX_RECONNECT_DELAY_MS);
                }
            }
        }
    }

    /// Closes the connection only if it is still the given generation.
    /// Returns `false` when the report was for an older connection.
    pub async fn close_generation(&mut self, generation: u64) -> Result<bool> {
        if generation != self.generation {
            return Ok(false);
        }
        self.close().await?;
        Ok(true)
    }

    /// Closes the connection if one is held. Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(conn) => {
                if conn.status().connected() {
                    info!(connection = %self.connection_name, "Closing RabbitMQ connection gracefully");
                    conn.close(200, "Closing connection").await?;
                } else {
                    debug!(connection = %self.connection_name, "Dropping dead RabbitMQ connection");
                }
                Ok(())
            }
            None => Ok(()),
        }
    }
}
