//! Aggregate artifact materializer.
//!
//! Rebuilds `/benchmark.json` from the record store: for every benchmark type,
//! non-legacy records are grouped per `(machine_id, pointer_bits)`, their
//! results averaged, and a random sample of the groups kept. The sample is
//! drawn again on every rebuild.

use crate::metrics::AGGREGATE_TYPES_SKIPPED;
use async_trait::async_trait;
use benchcache_core::{AggregateArtifact, AggregateEntry, CpuConfig, CpuTopology};
use benchcache_metadata::models::GroupedResultRow;
use benchcache_metadata::repos::RecordRepo;
use benchcache_metadata::{MetadataError, MetadataStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Errors that abort an aggregate rebuild. The cache is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("query failed: {0}")]
    Query(#[from] MetadataError),

    #[error("rebuild exceeded {0:?}")]
    Timeout(Duration),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Produces the serialized aggregate artifact.
#[async_trait]
pub trait AggregateBuild: Send + Sync {
    async fn rebuild(&self) -> Result<Vec<u8>, MaterializeError>;
}

/// [`AggregateBuild`] backed by the record store.
pub struct AggregateMaterializer {
    store: Arc<dyn MetadataStore>,
    sample_limit: u32,
    timeout: Duration,
}

impl AggregateMaterializer {
    pub fn new(store: Arc<dyn MetadataStore>, sample_limit: u32, timeout: Duration) -> Self {
        Self {
            store,
            sample_limit,
            timeout,
        }
    }

    /// Build the aggregate without serializing it.
    ///
    /// A type whose query fails is left out of the result; failing to list
    /// the types fails the whole build.
    pub async fn build(&self) -> Result<AggregateArtifact, MaterializeError> {
        let types = self.store.list_benchmark_types().await?;
        let mut artifact = BTreeMap::new();

        for benchmark_type in types {
            let rows = match self
                .store
                .sample_grouped_results(&benchmark_type, self.sample_limit)
                .await
            {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(
                        benchmark_type = %benchmark_type,
                        error = %e,
                        "Skipping benchmark type in aggregate rebuild"
                    );
                    AGGREGATE_TYPES_SKIPPED.inc();
                    continue;
                }
            };

            let entries: Vec<AggregateEntry> = rows.into_iter().map(entry_from_row).collect();
            artifact.insert(benchmark_type, entries);
        }

        Ok(artifact)
    }
}

#[async_trait]
impl AggregateBuild for AggregateMaterializer {
    async fn rebuild(&self) -> Result<Vec<u8>, MaterializeError> {
        let artifact = tokio::time::timeout(self.timeout, self.build())
            .await
            .map_err(|_| MaterializeError::Timeout(self.timeout))??;

        let types = artifact.len();
        let rows: usize = artifact.values().map(Vec::len).sum();
        let blob = serde_json::to_vec(&artifact)?;

        tracing::info!(types, rows, bytes = blob.len(), "Rebuilt aggregate artifact");
        Ok(blob)
    }
}

fn entry_from_row(row: GroupedResultRow) -> AggregateEntry {
    let cpu_config = CpuConfig::from_stored(&row.cpu_config);
    let topology = CpuTopology {
        cpus: row.num_cpus,
        cores: row.num_cores,
        threads: row.num_threads,
        numa_nodes: row.num_nodes,
    };

    AggregateEntry {
        machine_id: row.machine_id,
        extra_info: row.extra_info,
        user_note: row.user_note,
        benchmark_version: row.benchmark_version,
        machine_data_version: row.machine_data_version,
        benchmark_result: row.benchmark_result,
        elapsed_time: row.elapsed_time,
        used_threads: row.used_threads,
        board: row.board,
        machine_type: row.machine_type,
        cpu_name: row.cpu_name,
        cpu_desc: String::new(),
        num_cpus: row.num_cpus,
        num_cores: row.num_cores,
        num_threads: row.num_threads,
        num_nodes: row.num_nodes,
        cpu_config: String::new(),
        cpu_config_map: BTreeMap::new(),
        memory_in_kib: row.memory_in_kib,
        physical_memory_in_mib: row.physical_memory_in_mib,
        memory_types: row.memory_types,
        open_gl_renderer: row.opengl_renderer,
        gpu_desc: row.gpu_desc,
        pointer_bits: row.pointer_bits,
        data_from_super_user: row.data_from_super_user,
        legacy: row.legacy,
    }
    .with_derived_fields(topology, &cpu_config)
}
