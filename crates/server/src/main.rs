//! benchcache server binary.

use anyhow::{Context, Result};
use benchcache_core::config::AppConfig;
use benchcache_metadata::MetadataStore;
use benchcache_server::maintenance::spawn_maintenance_task;
use benchcache_server::refresh::{self, RefreshOrchestrator};
use benchcache_server::{
    AggregateMaterializer, AppState, ArtifactCache, HttpFetcher, RefreshHandle, create_router,
};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Benchmark result server with a background-refreshed artifact cache
#[derive(Parser, Debug)]
#[command(name = "benchcached")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "BENCHCACHE_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file and `BENCHCACHE_*` variables.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!(config_path = %path, "No config file found, using defaults and environment");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("BENCHCACHE_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

/// Start the refresh orchestrator and queue the configured prewarm keys.
fn start_refresh(
    config: &AppConfig,
    metadata: Arc<dyn MetadataStore>,
) -> Result<RefreshHandle> {
    let cache = ArtifactCache::new(metadata.clone(), config.cache.ttl_policy());
    let fetcher = HttpFetcher::new(&config.refresh.user_agent, config.refresh.fetch_timeout())
        .context("failed to build HTTP client")?;
    let materializer = AggregateMaterializer::new(
        metadata,
        config.refresh.sample_limit,
        config.refresh.materialize_timeout(),
    );

    let (handle, rx) = refresh::channel(config.refresh.queue_capacity);
    RefreshOrchestrator::new(
        cache,
        Arc::new(fetcher),
        Arc::new(materializer),
        config.origins.clone(),
        &config.refresh,
    )
    .spawn(rx);

    for key in config
        .refresh
        .prewarm_keys()
        .context("invalid refresh.prewarm_keys")?
    {
        tracing::info!(key = %key, "Prewarming artifact");
        handle.notify(key);
    }

    Ok(handle)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("benchcached v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    benchcache_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Initialize store
    let metadata = benchcache_metadata::from_config(&config.metadata)
        .await
        .context("failed to open benchmark database")?;
    metadata
        .health_check()
        .await
        .context("database health check failed")?;
    tracing::info!("Benchmark database opened");

    let refresh = start_refresh(&config, metadata.clone())?;

    if config.maintenance.enabled {
        spawn_maintenance_task(metadata.clone(), config.maintenance.interval());
    } else {
        tracing::info!("Storage maintenance disabled");
    }

    let state = AppState::new(config.clone(), metadata, refresh);
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
