use std::path::PathBuf;

use anyhow::{Context, Result};
use rabbitmq_store::config::{self, RabbitConfig};
use rabbitmq_store::{MessageContext, RabbitMqStore};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn load_configuration() -> Result<RabbitConfig> {
    match config::load_config() {
        Ok(config) => Ok(config),
        Err(file_err) => {
            info!("No usable config file ({}), reading environment", file_err);
            RabbitConfig::from_env().context("Failed to load configuration from environment")
        }
    }
}

fn payload_from_arg(arg: &str) -> Value {
    serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--init-config") {
        let path = args
            .get(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(config::CONFIG_FILE_NAME));
        config::create_default_config_file(&path)?;
        println!("Configuration file created at: {}", path.display());
        return Ok(());
    }

    let config = load_configuration()?;
    let store = RabbitMqStore::new(&config);
    store.connect().await.context("Failed to connect message store")?;

    let mut producer = store.producer().await;
    let mut stored = 0usize;

    for arg in &args {
        let message = MessageContext::new(payload_from_arg(arg));

        if producer.store_message(Some(&message)).await {
            stored += 1;
            continue;
        }

        // One retry on a fresh connection, then give up on this message.
        if store.reconnect_producer(&mut producer).await
            && producer.store_message(Some(&message)).await
        {
            stored += 1;
        } else {
            warn!(message_id = %message.message_id, "Message was not stored");
        }
    }

    if !producer.cleanup() {
        warn!(producer = producer.id().unwrap_or_default(), "Store refused producer cleanup");
    }
    println!(
        "Stored {}/{} messages in queue '{}' (store total: {})",
        stored,
        args.len(),
        store.queue_name(),
        store.enqueued_count()
    );

    store.shutdown().await?;
    Ok(())
}
