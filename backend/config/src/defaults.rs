//! Config defaults: applies default values to a parsed config.

use warden_core::{DEFAULT_MAX_ENTRIES, ModeTable};
use warden_policy::AllowlistEntry;

use crate::schema::{AuditConfig, LoggingConfig, WardenConfig};

pub const DEFAULT_WATCHWORD: &str = "Wassim";

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_AUDIT_MAX_ENTRIES: usize = DEFAULT_MAX_ENTRIES;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Targets used when the operator opts into `--safe-default`.
pub const SAFE_DEFAULT_TARGETS: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: WardenConfig) -> WardenConfig {
    let config = apply_core_defaults(config);
    let config = apply_audit_defaults(config);
    apply_logging_defaults(config)
}

fn apply_core_defaults(mut config: WardenConfig) -> WardenConfig {
    config.watchword.get_or_insert_with(|| DEFAULT_WATCHWORD.to_string());
    config.kill_switch.get_or_insert(false);
    config.request_timeout_ms.get_or_insert(DEFAULT_REQUEST_TIMEOUT_MS);
    config.modes.get_or_insert_with(ModeTable::default);
    config
}

fn apply_audit_defaults(mut config: WardenConfig) -> WardenConfig {
    let audit = config.audit.get_or_insert_with(AuditConfig::default);
    audit.max_entries.get_or_insert(DEFAULT_AUDIT_MAX_ENTRIES);
    audit.hash_policy.get_or_insert_with(Default::default);
    config
}

fn apply_logging_defaults(mut config: WardenConfig) -> WardenConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}

/// Localhost-only allowlist.
pub fn safe_default_allowlist() -> Vec<AllowlistEntry> {
    SAFE_DEFAULT_TARGETS.iter().map(|t| AllowlistEntry::parse(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = apply_all_defaults(WardenConfig::default());
        assert_eq!(config.watchword.as_deref(), Some(DEFAULT_WATCHWORD));
        assert_eq!(config.kill_switch, Some(false));
        assert_eq!(config.request_timeout_ms, Some(DEFAULT_REQUEST_TIMEOUT_MS));
        assert_eq!(config.audit.unwrap().max_entries, Some(100));
        assert_eq!(config.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn defaults_keep_explicit_values() {
        let config = apply_all_defaults(WardenConfig {
            watchword: Some("Hunter".into()),
            request_timeout_ms: Some(1),
            ..Default::default()
        });
        assert_eq!(config.watchword(), "Hunter");
        assert_eq!(config.request_timeout_ms, Some(1));
    }

    #[test]
    fn safe_default_is_localhost_only() {
        let entries = safe_default_allowlist();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| matches!(e, AllowlistEntry::Host(_))));
    }
}
