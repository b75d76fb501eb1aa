use dotenv::dotenv;
use std::env;
use std::str::FromStr;

use crate::config::{
    default_heartbeat, default_reconnect_attempts, default_reconnect_delay, default_store_name,
    default_timeout, ConnectionConfig, RabbitConfig, StoreSettings,
};
use crate::rabbitmq::{Result, StoreError};

impl RabbitConfig {
    /// Loads configuration from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, env::VarError>,
    {
        let optional = |key: &str| lookup(key).ok().filter(|value| !value.trim().is_empty());

        let config = RabbitConfig {
            connection: ConnectionConfig {
                uri: lookup("AMQP_ADDR")?,
                connection_timeout_ms: parse_or(optional("RABBITMQ_CONNECT_TIMEOUT_MS"), default_timeout)?,
                heartbeat_seconds: parse_or(optional("RABBITMQ_HEARTBEAT_SECONDS"), default_heartbeat)?,
                max_reconnect_attempts: parse_or(
                    optional("RABBITMQ_MAX_RECONNECT_ATTEMPTS"),
                    default_reconnect_attempts,
                )?,
                reconnect_delay_ms: parse_or(optional("RABBITMQ_RECONNECT_DELAY_MS"), default_reconnect_delay)?,
            },
            store: StoreSettings {
                name: optional("STORE_NAME").unwrap_or_else(default_store_name),
                queue_name: lookup("STORE_QUEUE")?,
                exchange_name: optional("STORE_EXCHANGE"),
            },
        };

        config
            .validate()
            .map_err(|e| StoreError::Config(e.to_string()))?;
        Ok(config)
    }
}

fn parse_or<T>(value: Option<String>, default: fn() -> T) -> Result<T>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    match value {
        Some(val) => Ok(val.trim().parse()?),
        None => Ok(default()),
    }
}
