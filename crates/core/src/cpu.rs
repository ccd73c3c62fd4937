//! CPU topology model.
//!
//! Clients describe their CPU frequencies as a map from frequency label to the
//! number of cores running at it. Older clients send the same information as
//! ad-hoc text (`"4x 2400.00 MHz + 4x 1800.00 MHz"`). The canonical form is
//! always the map; the text form is only parsed when it arrives from a client and
//! only rendered when building output for clients that still read it.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Canonical CPU frequency configuration: label -> core count.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CpuConfig(BTreeMap<String, u32>);

impl CpuConfig {
    /// Create from a label -> count map.
    pub fn new(map: BTreeMap<String, u32>) -> Self {
        Self(map)
    }

    /// Access the underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, u32> {
        &self.0
    }

    /// Whether no frequencies are recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the ad-hoc text format sent by older clients.
    ///
    /// Decimal commas are normalized to dots and `MHz`/`МГц` suffixes dropped.
    /// Entries are separated by `+`; each entry is `<count>x <label>`. An entry
    /// without a count is recorded once, as is one whose count does not parse.
    /// A label seen twice keeps the last count.
    pub fn parse_legacy(text: &str) -> Self {
        let normalized = text.replace(',', ".").replace("МГц", "").replace("MHz", "");
        let normalized = normalized.trim();

        let mut map = BTreeMap::new();
        if normalized.is_empty() {
            return Self(map);
        }
        for entry in normalized.split('+') {
            let parts: Vec<&str> = entry.trim().split('x').collect();
            if let [count, label] = parts.as_slice() {
                let label = label.trim().to_string();
                match count.parse::<u32>() {
                    Ok(count) => {
                        map.insert(label, count);
                    }
                    Err(e) => {
                        tracing::debug!(count = %count, error = %e, "Unparseable CPU core count");
                        map.insert(label, 1);
                    }
                }
            } else {
                map.insert(parts[0].to_string(), 1);
            }
        }
        Self(map)
    }

    /// Decode a value read back from the record store.
    ///
    /// Rows written by this server hold the JSON map. Rows imported from older
    /// deployments may still hold the client's original text.
    pub fn from_stored(value: &str) -> Self {
        serde_json::from_str::<BTreeMap<String, u32>>(value)
            .map(Self)
            .unwrap_or_else(|_| Self::parse_legacy(value))
    }

    /// Encode for storage.
    pub fn to_stored(&self) -> String {
        // A string -> integer map always serializes.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// Render the text form read by older clients, lowest frequency first.
    pub fn legacy_text(&self) -> String {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|(a, _), (b, _)| frequency_order(a, b));
        entries
            .into_iter()
            .map(|(label, count)| format!("{count}x {label} MHz"))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// Numeric labels in ascending value, then any non-numeric labels by text.
fn frequency_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// CPU configuration as received from a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CpuConfigInput {
    /// The client sent the structured map.
    Structured(BTreeMap<String, u32>),
    /// The client sent only text: a JSON map or the legacy ad-hoc format.
    LegacyText(String),
}

impl CpuConfigInput {
    /// Build from the two optional fields of a submission. The map wins when present.
    pub fn from_fields(map: Option<BTreeMap<String, u32>>, text: Option<String>) -> Self {
        match map {
            Some(map) => Self::Structured(map),
            None => Self::LegacyText(text.unwrap_or_default()),
        }
    }

    /// Normalize into the canonical form.
    pub fn normalize(self) -> CpuConfig {
        match self {
            Self::Structured(map) => CpuConfig(map),
            Self::LegacyText(text) => match serde_json::from_str::<BTreeMap<String, u32>>(&text) {
                Ok(map) => CpuConfig(map),
                Err(_) => CpuConfig::parse_legacy(&text),
            },
        }
    }
}

/// Processor package/core/thread/NUMA counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTopology {
    pub cpus: i64,
    pub cores: i64,
    pub threads: i64,
    pub numa_nodes: i64,
}

impl CpuTopology {
    /// English description, e.g. `"2 CPUs; 16 cores; 32 threads; 2 NUMA nodes"`.
    ///
    /// Cores, threads and NUMA nodes are only mentioned when there is more than one.
    pub fn describe(&self) -> String {
        let mut out = if self.cpus > 1 {
            format!("{} CPUs", self.cpus)
        } else {
            format!("{} CPU", self.cpus)
        };
        if self.cores > 1 {
            let _ = write!(out, "; {} cores", self.cores);
        }
        if self.threads > 1 {
            let _ = write!(out, "; {} threads", self.threads);
        }
        if self.numa_nodes > 1 {
            let _ = write!(out, "; {} NUMA nodes", self.numa_nodes);
        }
        out
    }
}
