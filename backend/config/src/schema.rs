//! Warden configuration schema.
//!
//! Every field is optional on disk; [`crate::defaults::apply_all_defaults`]
//! fills in whatever the file leaves out.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use warden_core::{HashPolicy, ModeTable};

use crate::defaults::{
    DEFAULT_AUDIT_MAX_ENTRIES, DEFAULT_LOG_LEVEL, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_WATCHWORD,
};

/// Root configuration (`config.yaml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WardenConfig {
    /// Authorization keyword that unlocks privileged mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchword: Option<String>,

    /// Deny every request while set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_switch: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowlist: Option<AllowlistConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditConfig>,

    /// Mode to permitted-action table (reported, not enforced by the gate)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modes: Option<ModeTable>,

    /// End-to-end budget for one authorization request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Where permitted targets come from. Both sources are merged when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistConfig {
    /// JSON or YAML allowlist file, relative paths resolve against the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Inline targets: hostnames, IPs, or CIDR networks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    /// Retained chain window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,

    /// Append-only NDJSON decision log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Chain snapshot written after every append
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_policy: Option<HashPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for the rolling JSON log; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl WardenConfig {
    pub fn watchword(&self) -> &str {
        self.watchword.as_deref().unwrap_or(DEFAULT_WATCHWORD)
    }

    pub fn kill_switch(&self) -> bool {
        self.kill_switch.unwrap_or(false)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    pub fn modes(&self) -> ModeTable {
        self.modes.clone().unwrap_or_default()
    }

    pub fn audit_max_entries(&self) -> usize {
        self.audit
            .as_ref()
            .and_then(|a| a.max_entries)
            .unwrap_or(DEFAULT_AUDIT_MAX_ENTRIES)
    }

    pub fn hash_policy(&self) -> HashPolicy {
        self.audit.as_ref().and_then(|a| a.hash_policy).unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
watchword: Hunter
killSwitch: true
requestTimeoutMs: 250
allowlist:
  path: targets.json
  targets: [localhost, 10.0.0.0/24]
audit:
  maxEntries: 10
  hashPolicy: accumulatedLog
logging:
  level: debug
"#;
        let config: WardenConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.watchword(), "Hunter");
        assert!(config.kill_switch());
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.audit_max_entries(), 10);
        assert_eq!(config.hash_policy(), HashPolicy::AccumulatedLog);
        assert_eq!(config.log_level(), "debug");
        let allowlist = config.allowlist.unwrap();
        assert_eq!(allowlist.path, Some(PathBuf::from("targets.json")));
        assert_eq!(allowlist.targets.unwrap().len(), 2);
    }

    #[test]
    fn empty_document_uses_fallbacks() {
        let config: WardenConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.watchword(), DEFAULT_WATCHWORD);
        assert!(!config.kill_switch());
        assert_eq!(config.audit_max_entries(), DEFAULT_AUDIT_MAX_ENTRIES);
        assert_eq!(config.hash_policy(), HashPolicy::Record);
    }
}
