//! Artifact keys, per-key TTL policy and origin resolution.
//!
//! An artifact is a cached blob served to clients under a file-like key such as
//! `/benchmark.json` or `/pci.ids`. The aggregate artifact is rebuilt from stored
//! benchmark records; every other key mirrors a file from a remote origin.

use crate::config::OriginsConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Duration, OffsetDateTime};

/// Key of the aggregate benchmark artifact.
pub const AGGREGATE_KEY: &str = "/benchmark.json";

/// Key of the mirrored PCI ID database.
pub const PCI_IDS_KEY: &str = "/pci.ids";

/// Key of the mirrored USB ID database.
pub const USB_IDS_KEY: &str = "/usb.ids";

/// A validated artifact key (`/<name>.<ext>`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Parse and validate a key.
    ///
    /// A key is a leading `/`, a non-empty name of ASCII letters, digits, `_` or
    /// `-`, a `.`, and a non-empty lowercase extension. Nested paths are rejected.
    pub fn new(key: impl Into<String>) -> crate::Result<Self> {
        let key = key.into();
        let Some(rest) = key.strip_prefix('/') else {
            return Err(crate::Error::InvalidKey(format!(
                "key must start with '/': {key:?}"
            )));
        };
        let Some((name, ext)) = rest.rsplit_once('.') else {
            return Err(crate::Error::InvalidKey(format!(
                "key must have an extension: {key:?}"
            )));
        };
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(crate::Error::InvalidKey(format!(
                "invalid file name in key: {key:?}"
            )));
        }
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(crate::Error::InvalidKey(format!(
                "invalid extension in key: {key:?}"
            )));
        }
        Ok(Self(key))
    }

    /// The aggregate benchmark artifact key.
    pub fn aggregate() -> Self {
        Self(AGGREGATE_KEY.to_string())
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key names the aggregate artifact.
    pub fn is_aggregate(&self) -> bool {
        self.0 == AGGREGATE_KEY
    }

    /// Whether this key names a slow-moving external reference table.
    pub fn is_reference_table(&self) -> bool {
        self.0 == PCI_IDS_KEY || self.0 == USB_IDS_KEY
    }
}

impl TryFrom<String> for ArtifactKey {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<ArtifactKey> for String {
    fn from(key: ArtifactKey) -> Self {
        key.0
    }
}

impl fmt::Debug for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtifactKey({})", self.0)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-key time-to-live policy.
///
/// Rebuilding the aggregate gets slower as the record set grows, and the
/// reference tables come from third-party hosts that change rarely, so each
/// class of key ages at its own rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlPolicy {
    /// TTL of the aggregate benchmark artifact.
    pub aggregate: Duration,
    /// TTL of the PCI/USB ID tables.
    pub reference_table: Duration,
    /// TTL of every other mirrored file.
    pub default: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            aggregate: Duration::hours(24),
            reference_table: Duration::days(14),
            default: Duration::hours(12),
        }
    }
}

impl TtlPolicy {
    /// TTL that applies to `key`.
    pub fn ttl_for(&self, key: &ArtifactKey) -> Duration {
        if key.is_aggregate() {
            self.aggregate
        } else if key.is_reference_table() {
            self.reference_table
        } else {
            self.default
        }
    }

    /// Whether an artifact generated at `generated_at` is stale at `now`.
    pub fn is_stale(
        &self,
        key: &ArtifactKey,
        generated_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> bool {
        now - generated_at > self.ttl_for(key)
    }
}

/// Where a refresh of a key gets its content from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Rebuilt from the record store.
    Aggregate,
    /// Fetched from a remote URL.
    Origin(String),
}

impl OriginsConfig {
    /// Resolve the refresh source for `key`.
    pub fn source_for(&self, key: &ArtifactKey) -> ArtifactSource {
        match key.as_str() {
            AGGREGATE_KEY => ArtifactSource::Aggregate,
            PCI_IDS_KEY => ArtifactSource::Origin(self.pci_ids_url.clone()),
            USB_IDS_KEY => ArtifactSource::Origin(self.usb_ids_url.clone()),
            other => ArtifactSource::Origin(format!(
                "{}{}",
                self.fallback_base_url.trim_end_matches('/'),
                other
            )),
        }
    }
}
