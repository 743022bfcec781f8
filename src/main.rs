//! whiteboard-relay server entry point.
//!
//! Loads configuration, connects the broker, and serves the WebSocket relay.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use whiteboard_relay::broker::{Broker, MemoryBroker, RedisBroker};
use whiteboard_relay::config::{BrokerKind, LogFormat, RelayConfig};
use whiteboard_relay::domain::ConnectionRegistry;
use whiteboard_relay::relay::RelayBridge;
use whiteboard_relay::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = RelayConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    init_tracing(config.log_format);
    tracing::info!(
        addr = %config.listen_addr,
        broker = ?config.broker,
        channel = %config.channel,
        "starting whiteboard-relay"
    );

    match config.broker {
        BrokerKind::Redis => {
            let broker = RedisBroker::connect(&config.redis_url)
                .await
                .context("connecting to redis")?;
            run(broker, &config).await
        }
        BrokerKind::Memory => run(MemoryBroker::new(config.memory_broker_capacity), &config).await,
    }
}

async fn run<B: Broker>(broker: B, config: &RelayConfig) -> anyhow::Result<()> {
    let registry = Arc::new(ConnectionRegistry::new());
    let bridge = Arc::new(RelayBridge::new(
        broker,
        registry,
        config.channel.clone(),
        config.connection_buffer,
    ));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;

    server::serve(bridge, listener, server::shutdown_signal()).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}
