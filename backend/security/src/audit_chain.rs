//! Hash-linked audit chain.
//!
//! Every gate decision appends one entry whose `previous_hash` is the
//! `content_hash` of the entry before it. Only the newest `max_entries`
//! entries are retained; older ones are evicted FIFO. Verification is
//! therefore only meaningful inside the retained window: once the original
//! genesis entry has been evicted, the oldest retained entry is the anchor
//! and anything before it can no longer be checked.

use std::collections::VecDeque;

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use warden_core::{AuditChainEntry, HashPolicy, SecurityContext, WardenError, GENESIS_HASH};

use crate::audit_store::{AuditStore, ChainFile, MemoryAuditStore};

/// `content_hash` under [`HashPolicy::Record`].
pub fn record_hash(previous_hash: &str, sequence_index: u64, record: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(sequence_index.to_be_bytes());
    hasher.update(record.as_bytes());
    hex::encode(hasher.finalize())
}

/// Outcome of walking a chain.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChainVerification {
    pub valid: bool,
    pub checked: usize,
    /// Position within the verified slice, not the sequence index.
    pub broken_at: Option<usize>,
    pub reason: Option<String>,
}

impl ChainVerification {
    fn ok(checked: usize) -> Self {
        Self { valid: true, checked, broken_at: None, reason: None }
    }

    fn broken(index: usize, reason: String) -> Self {
        Self { valid: false, checked: index, broken_at: Some(index), reason: Some(reason) }
    }

    pub fn into_result(self) -> Result<usize, WardenError> {
        match self.broken_at {
            None => Ok(self.checked),
            Some(index) => Err(WardenError::ChainBroken {
                index,
                reason: self.reason.unwrap_or_default(),
            }),
        }
    }
}

/// Walk `entries` in order and report the first broken link.
///
/// An entry with sequence index 0 must point at the genesis sentinel. A first
/// entry with a later index is the anchor of an evicted window and is taken
/// as given. Entries that carry their record also have their hash recomputed.
pub fn verify_entries<'a>(
    entries: impl IntoIterator<Item = &'a AuditChainEntry>,
) -> ChainVerification {
    let mut previous: Option<&AuditChainEntry> = None;
    let mut checked = 0;

    for (index, entry) in entries.into_iter().enumerate() {
        match previous {
            None => {
                if entry.sequence_index == 0 && entry.previous_hash != GENESIS_HASH {
                    return ChainVerification::broken(
                        index,
                        "first entry does not point at genesis".to_string(),
                    );
                }
            }
            Some(prev) => {
                if entry.previous_hash != prev.content_hash {
                    return ChainVerification::broken(
                        index,
                        format!(
                            "previous hash {} does not match content hash {} of entry {}",
                            entry.previous_hash, prev.content_hash, prev.sequence_index
                        ),
                    );
                }
                if entry.sequence_index != prev.sequence_index + 1 {
                    return ChainVerification::broken(
                        index,
                        format!(
                            "sequence gap: {} follows {}",
                            entry.sequence_index, prev.sequence_index
                        ),
                    );
                }
            }
        }

        if let Some(record) = &entry.record {
            let expected = record_hash(&entry.previous_hash, entry.sequence_index, record);
            if expected != entry.content_hash {
                return ChainVerification::broken(index, "content hash mismatch".to_string());
            }
        }

        previous = Some(entry);
        checked += 1;
    }

    ChainVerification::ok(checked)
}

/// Append-only, bounded, hash-linked audit trail.
///
/// Appends take `&mut self`; callers share the chain behind a lock so that
/// appends are serialized.
pub struct AuditChain {
    entries: VecDeque<AuditChainEntry>,
    max_entries: usize,
    next_sequence: u64,
    policy: HashPolicy,
    store: Box<dyn AuditStore>,
    chain_file: Option<ChainFile>,
}

impl AuditChain {
    pub fn new(max_entries: usize, policy: HashPolicy, store: Box<dyn AuditStore>) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries: max_entries.max(1),
            next_sequence: 0,
            policy,
            store,
            chain_file: None,
        }
    }

    /// Volatile chain with the default window.
    pub fn in_memory() -> Self {
        Self::new(
            warden_core::DEFAULT_MAX_ENTRIES,
            HashPolicy::Record,
            Box::new(MemoryAuditStore::default()),
        )
    }

    /// Persist the retained window to `chain_file` after every append.
    pub fn with_chain_file(mut self, chain_file: ChainFile) -> Self {
        self.chain_file = Some(chain_file);
        self
    }

    /// Resume from previously persisted entries. The restored window is not
    /// verified here; call [`verify`](Self::verify) to check it.
    pub fn restore(mut self, entries: Vec<AuditChainEntry>) -> Self {
        self.entries = entries.into_iter().collect();
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        self.next_sequence = self.entries.back().map(|e| e.sequence_index + 1).unwrap_or(0);
        info!(
            retained = self.entries.len(),
            next_sequence = self.next_sequence,
            "Restored audit chain"
        );
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn policy(&self) -> HashPolicy {
        self.policy
    }

    pub fn store_description(&self) -> String {
        self.store.describe()
    }

    pub fn head_hash(&self) -> Option<&str> {
        self.entries.back().map(|e| e.content_hash.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = &AuditChainEntry> {
        self.entries.iter()
    }

    /// Record one decision.
    ///
    /// The decision is written to the store first; if that fails nothing is
    /// added to the chain. Any later failure (log digest, chain snapshot)
    /// truncates the store back to where it was and restores the in-memory
    /// window, so the log never holds a decision the chain does not.
    pub fn append(&mut self, context: &SecurityContext) -> Result<AuditChainEntry, WardenError> {
        let record = serde_json::to_string(context)
            .map_err(|e| WardenError::AuditUnavailable(format!("serialize decision: {e}")))?;

        let log_start = self
            .store
            .len()
            .map_err(|e| WardenError::AuditUnavailable(format!("{e:#}")))?;
        let mut line = record.clone().into_bytes();
        line.push(b'\n');
        self.store
            .append_bytes(&line)
            .map_err(|e| WardenError::AuditUnavailable(format!("{e:#}")))?;

        let entry = match self.build_entry(record) {
            Ok(entry) => entry,
            Err(e) => {
                self.rollback_store(log_start);
                return Err(e);
            }
        };

        self.entries.push_back(entry.clone());
        let mut evicted = Vec::new();
        while self.entries.len() > self.max_entries {
            if let Some(old) = self.entries.pop_front() {
                evicted.push(old);
            }
        }

        if let Some(chain_file) = &self.chain_file {
            if let Err(e) = chain_file.save(self.entries.iter()) {
                error!(path = %chain_file.path().display(), error = %e, "Failed to persist audit chain");
                self.entries.pop_back();
                for old in evicted.into_iter().rev() {
                    self.entries.push_front(old);
                }
                self.rollback_store(log_start);
                return Err(WardenError::AuditUnavailable(format!("{e:#}")));
            }
        }

        if !evicted.is_empty() {
            warn!(
                evicted = evicted.len(),
                oldest_retained = self.entries.front().map(|e| e.sequence_index),
                "Audit chain window full; oldest entries dropped"
            );
        }

        self.next_sequence += 1;
        Ok(entry)
    }

    fn build_entry(&self, record: String) -> Result<AuditChainEntry, WardenError> {
        let sequence_index = self.next_sequence;
        let previous_hash = self
            .head_hash()
            .map(str::to_string)
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let entry = match self.policy {
            HashPolicy::Record => AuditChainEntry {
                sequence_index,
                timestamp: Utc::now(),
                content_hash: record_hash(&previous_hash, sequence_index, &record),
                previous_hash,
                record: Some(record),
                log_len: None,
            },
            HashPolicy::AccumulatedLog => {
                let log_len = self
                    .store
                    .len()
                    .map_err(|e| WardenError::AuditUnavailable(format!("{e:#}")))?;
                let content_hash = self
                    .store
                    .digest_prefix(log_len)
                    .map_err(|e| WardenError::AuditUnavailable(format!("{e:#}")))?;
                AuditChainEntry {
                    sequence_index,
                    timestamp: Utc::now(),
                    content_hash,
                    previous_hash,
                    record: None,
                    log_len: Some(log_len),
                }
            }
        };
        Ok(entry)
    }

    fn rollback_store(&mut self, log_start: u64) {
        if let Err(e) = self.store.truncate(log_start) {
            error!(
                store = %self.store.describe(),
                error = %e,
                "Failed to roll back audit log; it now holds a decision the chain does not"
            );
        }
    }

    /// Verify the retained window. Log-digest entries are re-derived from the
    /// log, so a forged `content_hash` is reported at its own index. A store
    /// that cannot be read makes the chain invalid.
    pub fn verify(&self) -> ChainVerification {
        self.verify_against_log().unwrap_or_else(|e| ChainVerification {
            valid: false,
            checked: 0,
            broken_at: None,
            reason: Some(e.to_string()),
        })
    }

    /// Like [`verify`](Self::verify), but a store read failure is returned as
    /// an error. Under the log-digest policy the log must also end exactly
    /// where the newest entry's digest ends.
    pub fn verify_against_log(&self) -> Result<ChainVerification, WardenError> {
        let links = verify_entries(self.entries.iter());
        let linked = links.broken_at.unwrap_or(self.entries.len());

        // Digest failures at or before the first broken link win, so the
        // earliest bad entry is the one reported.
        for (index, entry) in self.entries.iter().enumerate().take(linked + 1) {
            let Some(log_len) = entry.log_len else { continue };
            let digest = self
                .store
                .digest_prefix(log_len)
                .map_err(|e| WardenError::AuditUnavailable(format!("{e:#}")))?;
            if digest != entry.content_hash {
                return Ok(ChainVerification::broken(
                    index,
                    format!("log digest mismatch for first {log_len} bytes"),
                ));
            }
        }
        if !links.valid {
            return Ok(links);
        }

        if let Some(head_len) = self.entries.back().and_then(|e| e.log_len) {
            let size = self
                .store
                .len()
                .map_err(|e| WardenError::AuditUnavailable(format!("{e:#}")))?;
            if size != head_len {
                return Ok(ChainVerification::broken(
                    self.entries.len() - 1,
                    format!("audit log is {size} bytes but the newest entry covers {head_len}"),
                ));
            }
        }
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use warden_core::Decision;

    fn ctx(n: usize) -> SecurityContext {
        SecurityContext::deny(format!("actor-{n}"), format!("reason {n}"))
    }

    fn chain_with(n: usize, max: usize) -> AuditChain {
        let mut chain = AuditChain::new(max, HashPolicy::Record, Box::new(MemoryAuditStore::default()));
        for i in 0..n {
            chain.append(&ctx(i)).unwrap();
        }
        chain
    }

    struct BrokenStore;

    impl AuditStore for BrokenStore {
        fn append_bytes(&mut self, _bytes: &[u8]) -> anyhow::Result<()> {
            bail!("disk full")
        }
        fn read_all(&self) -> anyhow::Result<Vec<u8>> {
            Ok(Vec::new())
        }
        fn len(&self) -> anyhow::Result<u64> {
            Ok(0)
        }
        fn truncate(&mut self, _len: u64) -> anyhow::Result<()> {
            Ok(())
        }
        fn describe(&self) -> String {
            "broken".into()
        }
    }

    #[test]
    fn first_entry_links_to_genesis() {
        let chain = chain_with(1, 10);
        let first = chain.entries().next().unwrap();
        assert_eq!(first.previous_hash, GENESIS_HASH);
        assert_eq!(first.sequence_index, 0);
    }

    #[test]
    fn appended_chain_verifies() {
        let chain = chain_with(25, 100);
        let report = chain.verify();
        assert!(report.valid);
        assert_eq!(report.checked, 25);
        let entries: Vec<_> = chain.entries().cloned().collect();
        for pair in entries.windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].content_hash);
        }
    }

    #[test]
    fn tampered_hash_is_reported_at_its_index() {
        let chain = chain_with(10, 100);
        for target in 0..10 {
            let mut entries: Vec<_> = chain.entries().cloned().collect();
            entries[target].content_hash = "f".repeat(64);
            let report = verify_entries(&entries);
            assert!(!report.valid);
            assert_eq!(report.broken_at, Some(target));
        }
    }

    #[test]
    fn tampered_record_is_detected() {
        let chain = chain_with(3, 100);
        let mut entries: Vec<_> = chain.entries().cloned().collect();
        let forged = serde_json::to_string(&SecurityContext {
            decision: Decision::Allow,
            ..ctx(1)
        })
        .unwrap();
        entries[1].record = Some(forged);
        assert_eq!(verify_entries(&entries).broken_at, Some(1));
    }

    #[test]
    fn broken_link_is_detected() {
        let chain = chain_with(4, 100);
        let mut entries: Vec<_> = chain.entries().cloned().collect();
        entries.remove(2);
        let report = verify_entries(&entries);
        assert_eq!(report.broken_at, Some(2));
        assert!(matches!(report.into_result(), Err(WardenError::ChainBroken { index: 2, .. })));
    }

    #[test]
    fn eviction_keeps_window_and_still_verifies() {
        let chain = chain_with(11, 10);
        assert_eq!(chain.len(), 10);
        let first = chain.entries().next().unwrap();
        assert_eq!(first.sequence_index, 1);
        assert_ne!(first.previous_hash, GENESIS_HASH);
        assert!(chain.verify().valid);
    }

    #[test]
    fn store_failure_leaves_chain_untouched() {
        let mut chain = AuditChain::new(10, HashPolicy::Record, Box::new(BrokenStore));
        let err = chain.append(&ctx(0)).unwrap_err();
        assert!(matches!(err, WardenError::AuditUnavailable(_)));
        assert!(chain.is_empty());
    }

    #[test]
    fn accumulated_log_policy_verifies_against_log() {
        let mut chain = AuditChain::new(
            100,
            HashPolicy::AccumulatedLog,
            Box::new(MemoryAuditStore::default()),
        );
        for i in 0..5 {
            chain.append(&ctx(i)).unwrap();
        }
        assert!(chain.entries().all(|e| e.record.is_none() && e.log_len.is_some()));
        assert!(chain.verify().valid);
        assert!(chain.verify_against_log().unwrap().valid);

        chain.entries[2].content_hash = "0".repeat(64);
        chain.entries[3].previous_hash = "0".repeat(64);
        let report = chain.verify_against_log().unwrap();
        assert_eq!(report.broken_at, Some(2));
    }

    fn accumulated_chain(n: usize) -> AuditChain {
        let mut chain = AuditChain::new(
            100,
            HashPolicy::AccumulatedLog,
            Box::new(MemoryAuditStore::default()),
        );
        for i in 0..n {
            chain.append(&ctx(i)).unwrap();
        }
        chain
    }

    #[test]
    fn accumulated_log_forged_hash_is_reported_at_its_index() {
        for target in [4, 2, 0] {
            let mut chain = accumulated_chain(5);
            chain.entries[target].content_hash = "f".repeat(64);
            let report = chain.verify();
            assert!(!report.valid, "forged entry {target} went unnoticed");
            assert_eq!(report.broken_at, Some(target));
        }
    }

    #[test]
    fn accumulated_log_extra_bytes_are_reported() {
        let mut chain = accumulated_chain(3);
        chain.store.append_bytes(b"{\"decision\":\"ALLOW\"}\n").unwrap();
        let report = chain.verify();
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(2));
    }

    #[test]
    fn unreadable_store_makes_accumulated_chain_invalid() {
        let mut chain = accumulated_chain(2);
        chain.store = Box::new(MemoryAuditStore::default());
        assert!(!chain.verify().valid);
        assert!(chain.verify_against_log().is_err());
    }

    #[test]
    fn restore_continues_sequence() {
        let original = chain_with(3, 100);
        let saved: Vec<_> = original.entries().cloned().collect();
        let mut resumed = AuditChain::in_memory().restore(saved);
        let entry = resumed.append(&ctx(3)).unwrap();
        assert_eq!(entry.sequence_index, 3);
        assert_eq!(Some(entry.previous_hash.as_str()), original.head_hash());
        assert!(resumed.verify().valid);
    }

    #[test]
    fn chain_file_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the snapshot file should go makes the rename fail.
        let blocked = dir.path().join("chain.json");
        std::fs::create_dir_all(blocked.join("occupied")).unwrap();
        let mut chain = chain_with(2, 2).with_chain_file(ChainFile::new(&blocked));
        let head_before = chain.head_hash().map(str::to_string);

        let log_before = chain.store.read_all().unwrap();

        assert!(chain.append(&ctx(9)).is_err());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.head_hash().map(str::to_string), head_before);
        assert!(chain.verify().valid);
        // The decision line written before the snapshot failed is gone too.
        assert_eq!(chain.store.read_all().unwrap(), log_before);
    }
}
