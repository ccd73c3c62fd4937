//! Server test utilities.

use benchcache_core::ArtifactKey;
use benchcache_core::config::{AppConfig, MetadataConfig};
use benchcache_metadata::{MetadataStore, SqliteStore};
use benchcache_server::{AppState, create_router, refresh};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// A test server wrapper with all dependencies.
///
/// No orchestrator runs: refresh signals accumulate in `signals` so tests can
/// observe them.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub signals: mpsc::Receiver<ArtifactKey>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with a temporary database.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        benchcache_server::metrics::register_metrics();

        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("bench.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path, None)
                .await
                .expect("Failed to create store"),
        );

        let mut config = AppConfig {
            metadata: MetadataConfig::Sqlite {
                path: db_path,
                busy_timeout_secs: 5,
            },
            ..AppConfig::for_testing()
        };
        modifier(&mut config);

        let (handle, signals) = refresh::channel(config.refresh.queue_capacity);
        let state = AppState::new(config, metadata, handle);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            signals,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying store.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// Keys signaled for refresh so far.
    pub fn drain_signals(&mut self) -> Vec<ArtifactKey> {
        let mut keys = Vec::new();
        while let Ok(key) = self.signals.try_recv() {
            keys.push(key);
        }
        keys
    }
}
