// src/rabbitmq/errors.rs

use lapin::Error as LapinError;
use serde_json::Error as SerdeError;
use thiserror::Error;
use tokio::time::error::Elapsed;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("RabbitMQ transport error: {0}")]
    Transport(String),

    #[error("RabbitMQ channel error: {0}")]
    Channel(String),

    #[error("Message serialization error: {0}")]
    Serialization(#[from] SerdeError),

    #[error("RabbitMQ protocol error: {0}")]
    Protocol(String),

    #[error("Connection timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Custom Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// True when the failure came from the connection itself rather than
    /// from the message or a broker-side rejection.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Transport(_) | StoreError::Timeout(_))
    }
}

// Converting from lapin errors
impl From<LapinError> for StoreError {
    fn from(error: LapinError) -> Self {
        let error_text = error.to_string();

        match error {
            LapinError::IOError(_) | LapinError::InvalidConnectionState(_) => {
                StoreError::Transport(error_text)
            }
            LapinError::InvalidChannelState(_) | LapinError::ChannelsLimitReached => {
                StoreError::Channel(error_text)
            }
            LapinError::ProtocolError(_) => StoreError::Protocol(error_text),
            _ => StoreError::Unknown(error_text),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::Transport(error.to_string())
    }
}

impl From<Elapsed> for StoreError {
    fn from(_: Elapsed) -> Self {
        StoreError::Timeout("Connection timed out".to_string())
    }
}

impl From<String> for StoreError {
    fn from(message: String) -> Self {
        StoreError::Unknown(message)
    }
}

impl From<&str> for StoreError {
    fn from(message: &str) -> Self {
        StoreError::Unknown(message.to_string())
    }
}

impl From<std::env::VarError> for StoreError {
    fn from(err: std::env::VarError) -> Self {
        StoreError::Config(format!("Environment variable error: {}", err))
    }
}

impl From<std::num::ParseIntError> for StoreError {
    fn from(err: std::num::ParseIntError) -> Self {
        StoreError::Config(format!("Parse error: {}", err))
    }
}
