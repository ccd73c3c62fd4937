//! Configuration types shared across crates.

use crate::artifact::{ArtifactKey, TtlPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:1234").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:1234".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Busy timeout in seconds while waiting on the database lock.
        #[serde(default = "default_sqlite_busy_timeout_secs")]
        busy_timeout_secs: u64,
    },
}

fn default_sqlite_busy_timeout_secs() -> u64 {
    5
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./hardinfo-database.db"),
            busy_timeout_secs: default_sqlite_busy_timeout_secs(),
        }
    }
}

/// Artifact cache TTL configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL of the aggregate benchmark artifact in seconds (default: 24 hours).
    #[serde(default = "default_aggregate_ttl_secs")]
    pub aggregate_ttl_secs: u64,
    /// TTL of the PCI/USB ID tables in seconds (default: 14 days).
    #[serde(default = "default_reference_table_ttl_secs")]
    pub reference_table_ttl_secs: u64,
    /// TTL of every other mirrored file in seconds (default: 12 hours).
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
}

fn default_aggregate_ttl_secs() -> u64 {
    24 * 3600
}

fn default_reference_table_ttl_secs() -> u64 {
    14 * 24 * 3600
}

fn default_ttl_secs() -> u64 {
    12 * 3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            aggregate_ttl_secs: default_aggregate_ttl_secs(),
            reference_table_ttl_secs: default_reference_table_ttl_secs(),
            default_ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// Build the TTL policy for this configuration.
    pub fn ttl_policy(&self) -> TtlPolicy {
        let secs = |v: u64| time::Duration::seconds(i64::try_from(v).unwrap_or(i64::MAX));
        TtlPolicy {
            aggregate: secs(self.aggregate_ttl_secs),
            reference_table: secs(self.reference_table_ttl_secs),
            default: secs(self.default_ttl_secs),
        }
    }
}

/// Background refresh configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Minimum interval in seconds between two dispatches for the same key (default: 1 hour).
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Capacity of the refresh signal queue. Signals sent while it is full are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Timeout in seconds for a single origin fetch (default: 60).
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Timeout in seconds for a full aggregate rebuild (default: 300).
    #[serde(default = "default_materialize_timeout_secs")]
    pub materialize_timeout_secs: u64,
    /// Maximum number of grouped rows kept per benchmark type (default: 50).
    #[serde(default = "default_sample_limit")]
    pub sample_limit: u32,
    /// Whether a failed refresh still starts the cooldown for its key (default: true).
    /// When false, the next signal for a failed key retries immediately.
    #[serde(default = "default_advance_cooldown_on_failure")]
    pub advance_cooldown_on_failure: bool,
    /// User-Agent header sent to origins.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Keys signaled once at startup so an empty cache gets populated.
    #[serde(default)]
    pub prewarm_keys: Vec<String>,
}

fn default_cooldown_secs() -> u64 {
    3600
}

fn default_queue_capacity() -> usize {
    64
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_materialize_timeout_secs() -> u64 {
    300
}

fn default_sample_limit() -> u32 {
    crate::DEFAULT_SAMPLE_LIMIT
}

fn default_advance_cooldown_on_failure() -> bool {
    true
}

fn default_user_agent() -> String {
    // Some origins refuse requests without a browser-like agent.
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/88.0.4324.104 Safari/537.36"
        .to_string()
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            queue_capacity: default_queue_capacity(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            materialize_timeout_secs: default_materialize_timeout_secs(),
            sample_limit: default_sample_limit(),
            advance_cooldown_on_failure: default_advance_cooldown_on_failure(),
            user_agent: default_user_agent(),
            prewarm_keys: Vec::new(),
        }
    }
}

impl RefreshConfig {
    /// Get the per-key cooldown as a Duration.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Get the fetch timeout as a Duration.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Get the rebuild timeout as a Duration.
    pub fn materialize_timeout(&self) -> Duration {
        Duration::from_secs(self.materialize_timeout_secs)
    }

    /// Parse the configured prewarm keys.
    pub fn prewarm_keys(&self) -> crate::Result<Vec<ArtifactKey>> {
        self.prewarm_keys.iter().cloned().map(ArtifactKey::new).collect()
    }

    /// Validate refresh configuration.
    pub fn validate(&self) -> Result<(), String> {
        // tokio::sync::mpsc::channel panics on zero capacity
        if self.queue_capacity == 0 {
            return Err("refresh.queue_capacity must be at least 1".to_string());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("refresh.fetch_timeout_secs must be at least 1".to_string());
        }
        if self.materialize_timeout_secs == 0 {
            return Err("refresh.materialize_timeout_secs must be at least 1".to_string());
        }
        if self.sample_limit == 0 {
            return Err("refresh.sample_limit must be at least 1".to_string());
        }
        self.prewarm_keys()
            .map(|_| ())
            .map_err(|e| format!("refresh.prewarm_keys: {e}"))
    }
}

/// Remote origins for mirrored artifacts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OriginsConfig {
    /// Source of `/pci.ids`.
    #[serde(default = "default_pci_ids_url")]
    pub pci_ids_url: String,
    /// Source of `/usb.ids`.
    #[serde(default = "default_usb_ids_url")]
    pub usb_ids_url: String,
    /// Base URL every other key is appended to.
    #[serde(default = "default_fallback_base_url")]
    pub fallback_base_url: String,
}

fn default_pci_ids_url() -> String {
    "https://pci-ids.ucw.cz/v2.2/pci.ids".to_string()
}

fn default_usb_ids_url() -> String {
    "http://www.linux-usb.org/usb.ids".to_string()
}

fn default_fallback_base_url() -> String {
    "https://raw.githubusercontent.com/lpereira/hardinfo/master/data".to_string()
}

impl Default for OriginsConfig {
    fn default() -> Self {
        Self {
            pci_ids_url: default_pci_ids_url(),
            usb_ids_url: default_usb_ids_url(),
            fallback_base_url: default_fallback_base_url(),
        }
    }
}

/// Storage maintenance configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Enable periodic compaction (default: true).
    #[serde(default = "default_maintenance_enabled")]
    pub enabled: bool,
    /// Interval in seconds between compactions (default: 1 day).
    #[serde(default = "default_maintenance_interval_secs")]
    pub interval_secs: u64,
}

fn default_maintenance_enabled() -> bool {
    true
}

fn default_maintenance_interval_secs() -> u64 {
    86400 // 24 hours
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: default_maintenance_enabled(),
            interval_secs: default_maintenance_interval_secs(),
        }
    }
}

impl MaintenanceConfig {
    /// Get the compaction interval as a Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate maintenance configuration.
    pub fn validate(&self) -> Result<(), String> {
        // Zero would make tokio::time::interval panic.
        if self.enabled && self.interval_secs == 0 {
            return Err("maintenance.interval_secs cannot be 0 when enabled".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Artifact TTLs.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Background refresh configuration.
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Remote origins for mirrored artifacts.
    #[serde(default)]
    pub origins: OriginsConfig,
    /// Storage maintenance configuration.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl AppConfig {
    /// Create a test configuration.
    ///
    /// **For testing only.** Maintenance is disabled so tests never race a VACUUM.
    pub fn for_testing() -> Self {
        Self {
            maintenance: MaintenanceConfig {
                enabled: false,
                ..MaintenanceConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.refresh.validate()?;
        self.maintenance.validate()?;
        Ok(())
    }
}
