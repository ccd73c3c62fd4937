//! Application state shared across handlers.

use crate::cache::{ArtifactCache, CachedArtifact};
use crate::metrics::record_artifact_read;
use crate::refresh::RefreshHandle;
use benchcache_core::ArtifactKey;
use benchcache_core::config::AppConfig;
use benchcache_metadata::{MetadataResult, MetadataStore};
use std::sync::Arc;
use time::OffsetDateTime;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Record store and artifact table.
    pub metadata: Arc<dyn MetadataStore>,
    /// Read view of the artifact cache.
    pub cache: ArtifactCache,
    /// Refresh signal queue.
    pub refresh: RefreshHandle,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, metadata: Arc<dyn MetadataStore>, refresh: RefreshHandle) -> Self {
        let cache = ArtifactCache::new(metadata.clone(), config.cache.ttl_policy());
        Self {
            config: Arc::new(config),
            metadata,
            cache,
            refresh,
        }
    }

    /// Answer a read of `key`.
    ///
    /// Stale entries are still returned. A stale or missing entry signals a
    /// refresh without waiting for it.
    pub async fn read_artifact(&self, key: &ArtifactKey) -> MetadataResult<Option<CachedArtifact>> {
        let entry = self.cache.get(key).await?;
        match &entry {
            Some(artifact) => {
                if self
                    .cache
                    .is_stale(key, artifact.generated_at, OffsetDateTime::now_utc())
                {
                    record_artifact_read("stale");
                    self.notify_potentially_stale(key);
                } else {
                    record_artifact_read("fresh");
                }
            }
            None => {
                record_artifact_read("missing");
                self.notify_potentially_stale(key);
            }
        }
        Ok(entry)
    }

    /// Fire-and-forget refresh signal for `key`.
    pub fn notify_potentially_stale(&self, key: &ArtifactKey) {
        if self.refresh.notify(key.clone()) {
            tracing::debug!(key = %key, "Signaled artifact refresh");
        }
    }
}
