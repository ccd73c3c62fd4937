//! Benchmark submissions received from clients.
//!
//! A client posts a JSON object mapping benchmark type to one submission. Every
//! submission is validated into a [`BenchmarkRecord`] before anything is stored;
//! a single invalid entry rejects the whole request.

use crate::cpu::{CpuConfig, CpuConfigInput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smallest plausible total memory, in KiB.
pub const MIN_MEMORY_KIB: i64 = 4 * 1024;

/// Smallest plausible physical memory, in MiB (0 means unknown).
pub const MIN_PHYSICAL_MEMORY_MIB: i64 = 4;

/// One benchmark result as sent by a client.
///
/// Field names follow the client's wire format. Missing fields take their
/// zero value, as older clients omit fields they do not know about.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BenchmarkSubmission {
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

    pub cpu_config: Option<String>,
    pub cpu_config_map: Option<BTreeMap<String, u32>>,

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

/// A validated benchmark record, ready to be appended to the record store.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkRecord {
    pub benchmark_type: String,
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
    pub cpu_config: CpuConfig,
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
    pub legacy: bool,
}

fn invalid(msg: &str) -> crate::Error {
    crate::Error::Validation(msg.to_string())
}

impl BenchmarkSubmission {
    /// Validate this submission for `benchmark_type` and normalize it into a record.
    pub fn validate(self, benchmark_type: &str) -> crate::Result<BenchmarkRecord> {
        if benchmark_type.trim().is_empty() {
            return Err(invalid("benchmark type is empty"));
        }
        if self.machine_id.is_empty() || !self.machine_id.contains(';') {
            return Err(invalid("MachineId looks invalid"));
        }
        if self.legacy {
            return Err(invalid("Can't upload legacy results anymore"));
        }
        if self.pointer_bits != 32 && self.pointer_bits != 64 {
            return Err(invalid("Unknown PointerBits value"));
        }
        if self.num_cpus < 1 || self.num_cores < 1 || self.num_threads < 1 || self.num_nodes < 0
        {
            return Err(invalid(
                "Number of CPUs, cores, NUMA nodes, or threads is invalid",
            ));
        }
        if self.memory_in_kib < MIN_MEMORY_KIB {
            return Err(invalid("Total memory value is too low to be true"));
        }
        if self.physical_memory_in_mib != 0 && self.physical_memory_in_mib < MIN_PHYSICAL_MEMORY_MIB
        {
            return Err(invalid("Physical memory value is too low to be true"));
        }
        if self.benchmark_result.is_nan() || self.benchmark_result < 0.0 {
            return Err(invalid("Benchmark results can't be negative"));
        }

        let cpu_config = CpuConfigInput::from_fields(self.cpu_config_map, self.cpu_config).normalize();

        Ok(BenchmarkRecord {
            benchmark_type: benchmark_type.to_string(),
            machine_id: self.machine_id,
            extra_info: self.extra_info,
            user_note: self.user_note,
            benchmark_version: self.benchmark_version,
            machine_data_version: self.machine_data_version,
            benchmark_result: self.benchmark_result,
            elapsed_time: self.elapsed_time,
            used_threads: self.used_threads,
            board: self.board,
            machine_type: self.machine_type,
            cpu_name: self.cpu_name,
            cpu_config,
            num_cpus: self.num_cpus,
            num_cores: self.num_cores,
            num_threads: self.num_threads,
            num_nodes: self.num_nodes,
            memory_in_kib: self.memory_in_kib,
            physical_memory_in_mib: self.physical_memory_in_mib,
            memory_types: self.memory_types,
            opengl_renderer: self.open_gl_renderer,
            gpu_desc: self.gpu_desc,
            pointer_bits: self.pointer_bits,
            data_from_super_user: self.data_from_super_user,
            legacy: false,
        })
    }
}

/// Validate a whole upload. Fails on the first invalid submission.
pub fn validate_upload(
    upload: BTreeMap<String, BenchmarkSubmission>,
) -> crate::Result<Vec<BenchmarkRecord>> {
    upload
        .into_iter()
        .map(|(benchmark_type, submission)| submission.validate(&benchmark_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BenchmarkSubmission {
        BenchmarkSubmission {
            machine_id: "Intel_Core_i7;Lenovo;x86_64".to_string(),
            benchmark_result: 12.5,
            num_cpus: 1,
            num_cores: 4,
            num_threads: 8,
            num_nodes: 1,
            memory_in_kib: 16 * 1024 * 1024,
            pointer_bits: 64,
            cpu_config: Some("4x 2400.00 MHz".to_string()),
            ..Default::default()
        }
    }

    fn rejected(submission: BenchmarkSubmission) -> String {
        match submission.validate("CPU Blowfish") {
            Err(crate::Error::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_submission_normalizes_cpu_config() {
        let record = valid().validate("CPU Blowfish").unwrap();
        assert_eq!(record.benchmark_type, "CPU Blowfish");
        assert_eq!(record.cpu_config.as_map().get("2400.00"), Some(&4));
        assert!(!record.legacy);
    }

    #[test]
    fn test_rejects_machine_id_without_separator() {
        let msg = rejected(BenchmarkSubmission {
            machine_id: "nosemicolon".to_string(),
            ..valid()
        });
        assert!(msg.contains("MachineId"));
    }

    #[test]
    fn test_rejects_legacy() {
        let msg = rejected(BenchmarkSubmission {
            legacy: true,
            ..valid()
        });
        assert!(msg.contains("legacy"));
    }

    #[test]
    fn test_rejects_pointer_bits() {
        rejected(BenchmarkSubmission {
            pointer_bits: 16,
            ..valid()
        });
    }

    #[test]
    fn test_rejects_counts() {
        rejected(BenchmarkSubmission {
            num_cores: 0,
            ..valid()
        });
        rejected(BenchmarkSubmission {
            num_nodes: -1,
            ..valid()
        });
    }

    #[test]
    fn test_rejects_memory() {
        rejected(BenchmarkSubmission {
            memory_in_kib: 1024,
            ..valid()
        });
        rejected(BenchmarkSubmission {
            physical_memory_in_mib: 2,
            ..valid()
        });
        // Zero physical memory means "unknown" and is accepted.
        assert!(
            BenchmarkSubmission {
                physical_memory_in_mib: 0,
                ..valid()
            }
            .validate("CPU Blowfish")
            .is_ok()
        );
    }

    #[test]
    fn test_rejects_negative_and_nan_result() {
        rejected(BenchmarkSubmission {
            benchmark_result: -1.0,
            ..valid()
        });
        rejected(BenchmarkSubmission {
            benchmark_result: f64::NAN,
            ..valid()
        });
    }

    #[test]
    fn test_deserialize_wire_names() {
        let json = r#"{
            "MachineId": "a;b",
            "BenchmarkResult": 3.5,
            "MemoryInKiB": 8192,
            "PhysicalMemoryInMiB": 8,
            "OpenGlRenderer": "llvmpipe",
            "CpuConfigMap": {"1000.00": 2},
            "PointerBits": 32,
            "NumCpus": 1, "NumCores": 2, "NumThreads": 2
        }"#;
        let submission: BenchmarkSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.memory_in_kib, 8192);
        assert_eq!(submission.physical_memory_in_mib, 8);
        assert_eq!(submission.open_gl_renderer, "llvmpipe");

        let record = submission.validate("GPU Drawing").unwrap();
        assert_eq!(record.cpu_config.as_map().get("1000.00"), Some(&2));
        assert_eq!(record.opengl_renderer, "llvmpipe");
    }

    #[test]
    fn test_validate_upload_rejects_whole_batch() {
        let mut upload = BTreeMap::new();
        upload.insert("CPU Blowfish".to_string(), valid());
        upload.insert(
            "CPU Zlib".to_string(),
            BenchmarkSubmission {
                pointer_bits: 0,
                ..valid()
            },
        );
        assert!(validate_upload(upload).is_err());
    }
}
