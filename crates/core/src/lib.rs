//! Core domain types for the benchmark result cache.
//!
//! This crate defines the data model shared by the store and the server:
//! - Artifact keys, per-key TTL policy and origin resolution
//! - CPU topology in canonical and legacy forms
//! - Benchmark submissions and their validation
//! - The aggregate artifact wire format
//! - Configuration

pub mod aggregate;
pub mod artifact;
pub mod config;
pub mod cpu;
pub mod error;
pub mod submission;

pub use aggregate::{AggregateArtifact, AggregateEntry};
pub use artifact::{AGGREGATE_KEY, ArtifactKey, ArtifactSource, TtlPolicy};
pub use cpu::{CpuConfig, CpuConfigInput, CpuTopology};
pub use error::{Error, Result};
pub use submission::{BenchmarkRecord, BenchmarkSubmission, validate_upload};

/// Default number of grouped rows kept per benchmark type in the aggregate.
pub const DEFAULT_SAMPLE_LIMIT: u32 = 50;
