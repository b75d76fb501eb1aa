pub mod config;
pub mod env;
pub mod message;
pub mod rabbitmq;

pub use message::{DefaultMessageConverter, MessageContext, MessageConverter, StorableMessage, DEFAULT_PRIORITY};
pub use rabbitmq::{MessageStore, RabbitMqProducer, RabbitMqStore, StoreError};
