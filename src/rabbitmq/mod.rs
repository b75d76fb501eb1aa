// src/rabbitmq/mod.rs
// RabbitMQ-backed message store and its producers

pub mod errors;
pub mod broker;
pub mod connection;
pub mod producer;
pub mod store;

mod channel;

#[cfg(test)]
mod mock;

// Re-export specific items to simplify imports elsewhere
pub use broker::{BrokerChannel, BrokerConnection, ConnectionState, DeliveryMode, PublishProperties};
pub use channel::{LapinChannel, LapinConnection};
pub use connection::ConnectionManager;
pub use errors::{Result, StoreError};
pub use producer::RabbitMqProducer;
pub use store::{MessageStore, RabbitMqStore};
