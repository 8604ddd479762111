//! Target allowlist: which hosts and networks a command may touch.
//!
//! The active set is an immutable [`AllowlistSnapshot`] behind an `Arc`.
//! `load` builds a complete new snapshot and swaps it in under a short write
//! lock; readers clone the `Arc` and never observe a half-built set.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};
use warden_core::WardenError;

use crate::network::IpNetwork;

/// A single permitted target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AllowlistEntry {
    /// Matched by exact string comparison.
    Host(String),
    Network(#[serde(serialize_with = "serialize_network")] IpNetwork),
}

fn serialize_network<S: serde::Serializer>(net: &IpNetwork, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(net)
}

impl AllowlistEntry {
    /// Classify a raw entry: anything containing `/` that parses as CIDR is a
    /// network, everything else (including malformed CIDR) is a literal host.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.contains('/') {
            return Self::network_or_host(raw);
        }
        AllowlistEntry::Host(raw.to_string())
    }

    /// Entries listed explicitly as networks: bare addresses become
    /// single-host networks, unparseable ones degrade to literal hosts.
    pub fn network_or_host(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<IpNetwork>() {
            Ok(net) => AllowlistEntry::Network(net),
            Err(e) => {
                warn!(entry = %raw, error = %e, "Malformed allowlist network; treating as literal host");
                AllowlistEntry::Host(raw.to_string())
            }
        }
    }
}

/// Parsed, deduplicated allowlist. Built once per load.
#[derive(Debug, Default, Clone)]
pub struct AllowlistSnapshot {
    hosts: HashSet<String>,
    networks: Vec<IpNetwork>,
}

impl AllowlistSnapshot {
    pub fn from_entries(entries: impl IntoIterator<Item = AllowlistEntry>) -> Self {
        let mut snapshot = Self::default();
        for entry in entries {
            match entry {
                AllowlistEntry::Host(host) => {
                    if !host.is_empty() {
                        snapshot.hosts.insert(host);
                    }
                }
                AllowlistEntry::Network(net) => {
                    if !snapshot.networks.contains(&net) {
                        snapshot.networks.push(net);
                    }
                }
            }
        }
        snapshot
    }

    /// Exact host match first, then network membership for IP targets.
    /// Targets that are neither listed nor parseable as an IP are denied.
    pub fn is_allowed(&self, target: &str) -> bool {
        if self.hosts.contains(target) {
            return true;
        }
        let Ok(ip) = target.parse::<IpAddr>() else {
            return false;
        };
        self.networks.iter().any(|net| net.contains(&ip))
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.networks.is_empty()
    }

    /// Entries in a stable order (hosts sorted, then networks in load order).
    pub fn entries(&self) -> Vec<AllowlistEntry> {
        let mut hosts: Vec<&String> = self.hosts.iter().collect();
        hosts.sort();
        hosts
            .into_iter()
            .map(|h| AllowlistEntry::Host(h.clone()))
            .chain(self.networks.iter().map(|n| AllowlistEntry::Network(*n)))
            .collect()
    }
}

/// Process-wide allowlist holder.
#[derive(Debug, Default)]
pub struct AllowlistMatcher {
    active: RwLock<Arc<AllowlistSnapshot>>,
}

impl AllowlistMatcher {
    pub fn new(entries: impl IntoIterator<Item = AllowlistEntry>) -> Self {
        let snapshot = AllowlistSnapshot::from_entries(entries);
        info!(
            hosts = snapshot.host_count(),
            networks = snapshot.network_count(),
            "Allowlist initialised"
        );
        Self { active: RwLock::new(Arc::new(snapshot)) }
    }

    /// Replace the whole active set.
    pub fn load(&self, entries: impl IntoIterator<Item = AllowlistEntry>) -> Result<(), WardenError> {
        let snapshot = Arc::new(AllowlistSnapshot::from_entries(entries));
        let (hosts, networks) = (snapshot.host_count(), snapshot.network_count());
        let mut active = self
            .active
            .write()
            .map_err(|_| WardenError::Allowlist("allowlist lock poisoned".into()))?;
        *active = snapshot;
        info!(hosts, networks, "Allowlist reloaded");
        Ok(())
    }

    /// Current snapshot. Holding it keeps that version alive across reloads.
    pub fn snapshot(&self) -> Result<Arc<AllowlistSnapshot>, WardenError> {
        self.active
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| WardenError::Allowlist("allowlist lock poisoned".into()))
    }

    pub fn try_is_allowed(&self, target: &str) -> Result<bool, WardenError> {
        let allowed = self.snapshot()?.is_allowed(target);
        debug!(target = %target, allowed, "Allowlist check");
        Ok(allowed)
    }

    /// Infallible form of [`try_is_allowed`](Self::try_is_allowed): any failure denies.
    pub fn is_allowed(&self, target: &str) -> bool {
        self.try_is_allowed(target).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(raw: &[&str]) -> AllowlistMatcher {
        AllowlistMatcher::new(raw.iter().map(|r| AllowlistEntry::parse(r)))
    }

    #[test]
    fn cidr_membership() {
        let m = matcher(&["10.0.0.0/24"]);
        assert!(m.is_allowed("10.0.0.5"));
        assert!(!m.is_allowed("10.0.1.5"));
    }

    #[test]
    fn exact_host_match() {
        let m = matcher(&["localhost", "lab.internal"]);
        assert!(m.is_allowed("localhost"));
        assert!(m.is_allowed("lab.internal"));
        assert!(!m.is_allowed("LAB.internal"));
        assert!(!m.is_allowed("evil.example"));
    }

    #[test]
    fn malformed_cidr_degrades_to_literal() {
        let m = matcher(&["10.0.0.0/99"]);
        let snapshot = m.snapshot().unwrap();
        assert_eq!(snapshot.network_count(), 0);
        assert_eq!(snapshot.host_count(), 1);
        assert!(m.is_allowed("10.0.0.0/99"));
        assert!(!m.is_allowed("10.0.0.1"));
    }

    #[test]
    fn unparseable_target_is_denied() {
        let m = matcher(&["0.0.0.0/0"]);
        assert!(!m.is_allowed("not-an-ip"));
        assert!(!m.is_allowed(""));
        assert!(m.is_allowed("8.8.8.8"));
    }

    #[test]
    fn entries_are_deduplicated() {
        let m = matcher(&["localhost", "localhost", "10.0.0.0/24", "10.0.0.0/24"]);
        let snapshot = m.snapshot().unwrap();
        assert_eq!(snapshot.host_count(), 1);
        assert_eq!(snapshot.network_count(), 1);
    }

    #[test]
    fn explicit_network_entries_accept_bare_addresses() {
        let entry = AllowlistEntry::network_or_host("10.0.0.9");
        assert!(matches!(entry, AllowlistEntry::Network(_)));
        let m = AllowlistMatcher::new([entry]);
        assert!(m.is_allowed("10.0.0.9"));
    }

    #[test]
    fn load_replaces_whole_set() {
        let m = matcher(&["10.0.0.0/24", "localhost"]);
        let before = m.snapshot().unwrap();
        m.load([AllowlistEntry::parse("192.168.1.1")]).unwrap();

        assert!(!m.is_allowed("10.0.0.5"));
        assert!(!m.is_allowed("localhost"));
        assert!(m.is_allowed("192.168.1.1"));
        // The old snapshot is untouched.
        assert!(before.is_allowed("10.0.0.5"));
    }

    #[test]
    fn concurrent_reads_during_reload() {
        let m = Arc::new(matcher(&["10.0.0.0/24"]));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&m);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let snap = m.snapshot().unwrap();
                        // Each snapshot is internally consistent: both entries or neither.
                        assert_eq!(snap.is_allowed("10.0.0.5"), snap.is_allowed("10.0.0.6"));
                    }
                })
            })
            .collect();
        for i in 0..50 {
            let entries = if i % 2 == 0 { vec!["172.16.0.0/12"] } else { vec!["10.0.0.0/24"] };
            m.load(entries.into_iter().map(AllowlistEntry::parse)).unwrap();
        }
        for r in readers {
            r.join().unwrap();
        }
    }
}
