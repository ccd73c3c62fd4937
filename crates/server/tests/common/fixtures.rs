//! Test fixtures for benchmark data.

use benchcache_core::{BenchmarkRecord, CpuConfig};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// A valid, validated record for `benchmark_type` on `machine_id`.
#[allow(dead_code)]
pub fn record(benchmark_type: &str, machine_id: &str, result: f64) -> BenchmarkRecord {
    let mut cpu = BTreeMap::new();
    cpu.insert("3600.00".to_string(), 8);

    BenchmarkRecord {
        benchmark_type: benchmark_type.to_string(),
        machine_id: machine_id.to_string(),
        extra_info: String::new(),
        user_note: String::new(),
        benchmark_version: 1,
        machine_data_version: 1,
        benchmark_result: result,
        elapsed_time: 2.0,
        used_threads: 16,
        board: "X570".to_string(),
        machine_type: "Desktop".to_string(),
        cpu_name: "AMD Ryzen 7 3700X".to_string(),
        cpu_config: CpuConfig::new(cpu),
        num_cpus: 1,
        num_cores: 8,
        num_threads: 16,
        num_nodes: 1,
        memory_in_kib: 32 * 1024 * 1024,
        physical_memory_in_mib: 32768,
        memory_types: "DDR4".to_string(),
        opengl_renderer: "AMD Radeon".to_string(),
        gpu_desc: "Radeon".to_string(),
        pointer_bits: 64,
        data_from_super_user: false,
        legacy: false,
    }
}

/// A valid submission as a client would send it.
#[allow(dead_code)]
pub fn submission_json(machine_id: &str, result: f64) -> Value {
    json!({
        "MachineId": machine_id,
        "BenchmarkResult": result,
        "ElapsedTime": 1.25,
        "UsedThreads": 8,
        "BenchmarkVersion": 2,
        "MachineDataVersion": 1,
        "Board": "ThinkPad",
        "MachineType": "Laptop",
        "CpuName": "Intel Core i7",
        "CpuConfig": "4x 2400,00 MHz + 4x 1800,00 MHz",
        "NumCpus": 1,
        "NumCores": 8,
        "NumThreads": 8,
        "NumNodes": 1,
        "MemoryInKiB": 16 * 1024 * 1024,
        "PhysicalMemoryInMiB": 16384,
        "MemoryTypes": "LPDDR4",
        "OpenGlRenderer": "Mesa Intel",
        "GpuDesc": "Intel UHD",
        "PointerBits": 64,
        "DataFromSuperUser": false,
        "Legacy": false
    })
}
