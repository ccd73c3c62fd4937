//! Benchmark record repository.

use crate::error::MetadataResult;
use crate::models::{BenchmarkRecordRow, GroupedResultRow};
use async_trait::async_trait;
use benchcache_core::BenchmarkRecord;
use time::OffsetDateTime;

/// Repository for the append-only benchmark record store.
#[async_trait]
pub trait RecordRepo: Send + Sync {
    /// Append records in one transaction. Either all are stored or none.
    async fn append_records(
        &self,
        records: &[BenchmarkRecord],
        submitted_at: OffsetDateTime,
    ) -> MetadataResult<u64>;

    /// Distinct benchmark types present in the store.
    async fn list_benchmark_types(&self) -> MetadataResult<Vec<String>>;

    /// Group non-legacy records of `benchmark_type` by `(machine_id, pointer_bits)`,
    /// average each group's result, and return at most `limit` groups in random order.
    async fn sample_grouped_results(
        &self,
        benchmark_type: &str,
        limit: u32,
    ) -> MetadataResult<Vec<GroupedResultRow>>;

    /// Records of a benchmark type in insertion order.
    async fn list_records(&self, benchmark_type: &str) -> MetadataResult<Vec<BenchmarkRecordRow>>;

    /// Count all stored records.
    async fn count_records(&self) -> MetadataResult<u64>;
}
