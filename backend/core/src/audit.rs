use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `previous_hash` of the very first entry of a chain.
pub const GENESIS_HASH: &str = "genesis";

/// Retained entries kept by default; older entries are evicted FIFO.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// What an entry's `content_hash` commits to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum HashPolicy {
    /// SHA-256 over the previous hash, sequence index, and the serialized decision.
    #[default]
    Record,
    /// SHA-256 over the whole decision log as it stood after the append.
    AccumulatedLog,
}

/// One link of the audit chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditChainEntry {
    pub sequence_index: u64,
    pub timestamp: DateTime<Utc>,
    pub content_hash: String,
    pub previous_hash: String,
    /// Serialized decision, kept under [`HashPolicy::Record`] so the hash can be recomputed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    /// Log length in bytes covered by the digest under [`HashPolicy::AccumulatedLog`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_len: Option<u64>,
}
