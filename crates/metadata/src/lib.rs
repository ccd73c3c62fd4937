//! Persistent store for the benchmark result cache.
//!
//! This crate provides the data model backing the server:
//! - The append-only benchmark record store
//! - Grouped, sampled queries over those records
//! - The named artifact cache
//! - Storage compaction

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use store::{MetadataStore, SqliteStore};

use benchcache_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite {
            path,
            busy_timeout_secs,
        } => {
            let store = SqliteStore::new(path, Some(*busy_timeout_secs)).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
