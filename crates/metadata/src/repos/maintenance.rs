//! Storage maintenance repository.

use crate::error::MetadataResult;
use async_trait::async_trait;

/// Repository for storage housekeeping.
#[async_trait]
pub trait MaintenanceRepo: Send + Sync {
    /// Rebuild the database file to reclaim free pages.
    async fn compact(&self) -> MetadataResult<()>;
}
