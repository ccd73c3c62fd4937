//! Wire format of the aggregate benchmark artifact.
//!
//! The artifact is a JSON object mapping benchmark type to a list of sampled,
//! per-machine averaged results. Field names match what existing clients parse.

use crate::cpu::{CpuConfig, CpuTopology};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serialized aggregate: benchmark type -> sampled rows.
pub type AggregateArtifact = BTreeMap<String, Vec<AggregateEntry>>;

/// One averaged result for a `(machine, pointer width)` group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AggregateEntry {
    pub machine_id: String,
    pub extra_info: String,
    pub user_note: String,

    pub benchmark_version: i64,
    pub machine_data_version: i64,

    pub benchmark_result: f64,
    pub elapsed_time: f64,
    pub used_threads: i64,

    pub board: String,
    pub machine_type: String,
    pub cpu_name: String,
    pub cpu_desc: String,
    pub num_cpus: i64,
    pub num_cores: i64,
    pub num_threads: i64,
    pub num_nodes: i64,

    /// Text form for clients that predate the structured map.
    pub cpu_config: String,
    pub cpu_config_map: BTreeMap<String, u32>,

    #[serde(rename = "MemoryInKiB")]
    pub memory_in_kib: i64,
    #[serde(rename = "PhysicalMemoryInMiB")]
    pub physical_memory_in_mib: i64,
    pub memory_types: String,

    pub open_gl_renderer: String,
    pub gpu_desc: String,

    pub pointer_bits: i64,

    pub data_from_super_user: bool,

    pub legacy: bool,
}

impl AggregateEntry {
    /// Fill the display-only fields from the structured ones.
    ///
    /// Both text projections are recomputed from `topology` and `cpu_config`; no
    /// text is parsed here.
    pub fn with_derived_fields(mut self, topology: CpuTopology, cpu_config: &CpuConfig) -> Self {
        self.cpu_desc = topology.describe();
        self.cpu_config = cpu_config.legacy_text();
        self.cpu_config_map = cpu_config.as_map().clone();
        self
    }
}
