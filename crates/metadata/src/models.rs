//! Database models mapping to the store schema.

use sqlx::FromRow;
use time::OffsetDateTime;

// =============================================================================
// Artifact cache
// =============================================================================

/// Cached artifact record. At most one row exists per name.
#[derive(Debug, Clone, FromRow)]
pub struct CachedArtifactRow {
    pub name: String,
    pub blob: Vec<u8>,
    pub generated_at: OffsetDateTime,
}

// =============================================================================
// Benchmark records
// =============================================================================

/// Stored benchmark record. Rows are append-only.
#[derive(Debug, Clone, FromRow)]
pub struct BenchmarkRecordRow {
    pub id: i64,
    pub benchmark_type: String,
    pub benchmark_result: f64,
    pub extra_info: String,
    pub machine_id: String,
    pub board: String,
    pub cpu_name: String,
    /// Canonical JSON label -> count map.
    pub cpu_config: String,
    pub num_cpus: i64,
    pub num_cores: i64,
    pub num_threads: i64,
    pub num_nodes: i64,
    pub memory_in_kib: i64,
    pub physical_memory_in_mib: i64,
    pub memory_types: String,
    pub opengl_renderer: String,
    pub gpu_desc: String,
    pub pointer_bits: i64,
    pub data_from_super_user: bool,
    pub used_threads: i64,
    pub benchmark_version: i64,
    pub user_note: String,
    pub elapsed_time: f64,
    pub machine_data_version: i64,
    pub legacy: bool,
    pub machine_type: String,
    pub submitted_at: OffsetDateTime,
}

/// One `(machine_id, pointer_bits)` group of non-legacy records of a type.
///
/// `benchmark_result` is the group average; every other column comes from one
/// of the group's records.
#[derive(Debug, Clone, FromRow)]
pub struct GroupedResultRow {
    pub machine_id: String,
    pub pointer_bits: i64,
    pub benchmark_result: f64,
    pub extra_info: String,
    pub board: String,
    pub cpu_name: String,
    pub cpu_config: String,
    pub num_cpus: i64,
    pub num_cores: i64,
    pub num_threads: i64,
    pub num_nodes: i64,
    pub memory_in_kib: i64,
    pub physical_memory_in_mib: i64,
    pub memory_types: String,
    pub opengl_renderer: String,
    pub gpu_desc: String,
    pub data_from_super_user: bool,
    pub used_threads: i64,
    pub benchmark_version: i64,
    pub user_note: String,
    pub elapsed_time: f64,
    pub machine_data_version: i64,
    pub legacy: bool,
    pub machine_type: String,
}
