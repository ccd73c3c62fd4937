//! Artifact cache over the persistent store.

use benchcache_core::{ArtifactKey, TtlPolicy};
use benchcache_metadata::repos::ArtifactRepo;
use benchcache_metadata::{MetadataResult, MetadataStore};
use bytes::Bytes;
use std::sync::Arc;
use time::OffsetDateTime;

/// A cached artifact as read from the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedArtifact {
    pub key: ArtifactKey,
    pub blob: Bytes,
    pub generated_at: OffsetDateTime,
}

/// Key -> (blob, generated_at) mapping with per-key staleness.
///
/// Replacing an entry is a single upsert, so a concurrent reader sees either
/// the previous blob or the new one, never a mix.
#[derive(Clone)]
pub struct ArtifactCache {
    store: Arc<dyn MetadataStore>,
    ttl: TtlPolicy,
}

impl ArtifactCache {
    pub fn new(store: Arc<dyn MetadataStore>, ttl: TtlPolicy) -> Self {
        Self { store, ttl }
    }

    /// Look up the current entry for `key`.
    pub async fn get(&self, key: &ArtifactKey) -> MetadataResult<Option<CachedArtifact>> {
        let row = self.store.get_artifact(key.as_str()).await?;
        Ok(row.map(|row| CachedArtifact {
            key: key.clone(),
            blob: Bytes::from(row.blob),
            generated_at: row.generated_at,
        }))
    }

    /// Replace the entry for `key`, stamped with the current time.
    ///
    /// Returns the stored timestamp.
    pub async fn put(&self, key: &ArtifactKey, blob: &[u8]) -> MetadataResult<OffsetDateTime> {
        let generated_at = OffsetDateTime::now_utc();
        self.store
            .put_artifact(key.as_str(), blob, generated_at)
            .await?;
        Ok(generated_at)
    }

    /// Whether an entry generated at `generated_at` is stale at `now`.
    pub fn is_stale(&self, key: &ArtifactKey, generated_at: OffsetDateTime, now: OffsetDateTime) -> bool {
        self.ttl.is_stale(key, generated_at, now)
    }
}
