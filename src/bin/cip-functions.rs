// Copyright (c) 2025 - Cowboy AI, Inc.
//! CIP Functions Service
//!
//! Subscribes to inbound function events on NATS, merges them into asset
//! records kept in a JetStream key/value bucket and republishes changed
//! records on `cip-function.updated`.
//!
//! Run with: cargo run --bin cip-functions --features things
//!
//! Prerequisites:
//! 1. NATS server with JetStream enabled (NATS_URL, default localhost:4222)
//! 2. Function registry file (CIP_FUNCTIONS_REGISTRY)
//! 3. Optional thing directory (THINGS_URL)

use anyhow::{Context, Result};
use cip_functions::{
    App, FunctionContext, NatsClient, NatsKvStorage, Registry, ServiceConfig, StaticThings,
    ThingsClient,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn things_client(config: &ServiceConfig) -> Result<Arc<dyn ThingsClient>> {
    #[cfg(feature = "things")]
    if let Some(url) = &config.things_url {
        let client = cip_functions::things::HttpThingsClient::new(url, config.nats.connect_timeout)
            .context("Failed to create thing directory client")?;
        info!("Using thing directory at {}", url);
        return Ok(Arc::new(client));
    }

    #[cfg(not(feature = "things"))]
    if config.things_url.is_some() {
        warn!("THINGS_URL is set but the `things` feature is disabled");
    }

    Ok(Arc::new(StaticThings::default()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Starting CIP Functions Service");

    let config = ServiceConfig::from_env().context("Failed to load configuration")?;
    info!("📋 Configuration loaded:");
    info!("  - NATS: {:?}", config.nats.servers);
    info!("  - Registry: {}", config.registry_path.display());
    info!("  - KV bucket: {}", config.kv_bucket);
    info!("  - Subjects: {:?}", config.subjects);

    let registry = Registry::from_path(&config.registry_path).with_context(|| {
        format!(
            "Failed to load function registry from {}",
            config.registry_path.display()
        )
    })?;
    if registry.is_empty() {
        warn!("Function registry is empty, no events will be handled");
    }

    let client = NatsClient::connect(&config.nats)
        .await
        .context("Failed to connect to NATS")?;
    info!("✅ Connected to NATS");

    let storage = NatsKvStorage::open(client.inner().clone(), &config.kv_bucket)
        .await
        .context("Failed to open key/value bucket")?;

    let context = FunctionContext::new(
        Arc::new(storage),
        Arc::new(client.clone()),
        things_client(&config)?,
    );
    let app = App::new(registry, context);

    let messages = client
        .subscribe_all(&config.subjects)
        .await
        .context("Failed to subscribe")?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Shutdown requested");
        }
        shutdown.cancel();
    });

    info!("🎧 Listening for function events...");
    app.run(messages, cancel).await;

    info!("👋 CIP Functions Service stopped");
    Ok(())
}
