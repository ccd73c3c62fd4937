//! Artifact cache repository.

use crate::error::MetadataResult;
use crate::models::CachedArtifactRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for cached artifacts.
#[async_trait]
pub trait ArtifactRepo: Send + Sync {
    /// Get a cached artifact by name.
    async fn get_artifact(&self, name: &str) -> MetadataResult<Option<CachedArtifactRow>>;

    /// Insert or replace the artifact stored under `name`.
    ///
    /// The replacement is a single statement, so readers see either the old
    /// row or the new one.
    async fn put_artifact(
        &self,
        name: &str,
        blob: &[u8],
        generated_at: OffsetDateTime,
    ) -> MetadataResult<()>;
}
