//! API Server
//!
//! Serves the `pods` and `minions` collections from an in-memory registry:
//! - list, get, create, update and delete under `API_PREFIX`
//! - watch over a WebSocket or a streamed HTTP response
//! - pod reads enriched from the container agent on each host
//!
//! Configuration is read from environment variables (see `ServerConfig`).

use anyhow::Context;
use api::{JsonCodec, Minion};
use apiserver::{ApiServer, RestStorage, ServerConfig};
use podinfo_client::HttpPodInfoGetter;
use registry::{MemoryRegistry, MinionRegistry, MinionStorage, PodStorage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting API server");

    let config = ServerConfig::from_env().context("invalid configuration")?;

    info!("Configuration:");
    info!("  Listen address: {}", config.addr);
    info!("  Prefix: {}", config.prefix);
    info!("  Watch queue length: {}", config.watch_queue_len);
    info!("  Container agent port: {}", config.kubelet_port);

    let registry = Arc::new(MemoryRegistry::new(config.watch_queue_len));
    for id in &config.minions {
        let minion = Minion {
            id: id.clone(),
            ..Default::default()
        };
        match registry.create_minion(minion).await {
            Ok(_) => info!(%id, "registered minion"),
            Err(err) => warn!(%id, error = %err, "minion not registered"),
        }
    }

    let pod_info = HttpPodInfoGetter::new(config.kubelet_port)
        .context("failed to build container agent client")?;
    let pods = PodStorage::new(Arc::clone(&registry) as _)
        .with_minions(Arc::clone(&registry) as _)
        .with_pod_info(Arc::new(pod_info))
        .with_polling(config.pod_poll_period, config.pod_wait_timeout);
    let minions = MinionStorage::new(Arc::clone(&registry) as _);

    let mut storage: HashMap<String, Arc<dyn RestStorage>> = HashMap::new();
    storage.insert("pods".to_string(), Arc::new(pods));
    storage.insert("minions".to_string(), Arc::new(minions));

    let app = ApiServer::new(storage, Arc::new(JsonCodec))
        .with_timeout(config.request_timeout)
        .router(&config.prefix);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    info!("Listening on {}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await
        .context("server error")?;

    info!("API server stopped");
    Ok(())
}

/// Resolves on Ctrl-C after stopping the watch feed, so open watch streams
/// end and the server can drain.
async fn shutdown_signal(registry: Arc<MemoryRegistry>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    registry.shutdown().await;
}
