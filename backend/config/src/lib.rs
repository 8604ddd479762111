//! `warden-config`: runtime configuration for the warden engine.
//!
//! Provides:
//! - Typed config schema (`config.yaml`, camelCase keys)
//! - YAML read/write with atomic backup rotation
//! - Allowlist source files in categorised or flat form
//! - Environment overrides for the kill switch and watchword
//! - Default value application and validation

pub mod allowlist_source;
pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use allowlist_source::{AllowedTargets, AllowlistSource};
pub use defaults::{apply_all_defaults, safe_default_allowlist};
pub use env::{apply_env_overrides, apply_env_overrides_with};
pub use io::{
    config_dir, config_file_path, load_allowlist_source, load_config, resolve_relative, write_config,
};
pub use schema::{AllowlistConfig, AuditConfig, LoggingConfig, WardenConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};
use std::path::Path;
use warden_policy::AllowlistEntry;

/// Load a config file, apply environment overrides and defaults, and validate.
///
/// Validation errors are fatal; warnings are logged.
pub async fn load_and_prepare(path: &Path) -> Result<WardenConfig> {
    prepare(load_config(path).await?)
}

/// Environment overrides, defaults and validation for an already-parsed config.
pub fn prepare(config: WardenConfig) -> Result<WardenConfig> {
    let config = apply_env_overrides(config);
    let config = apply_all_defaults(config);
    ensure_valid(&config)?;
    Ok(config)
}

fn ensure_valid(config: &WardenConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        let messages: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("invalid configuration: {}", messages.join("; "));
    }
    Ok(())
}

/// Collect allowlist entries from the configured file and inline targets.
///
/// With no allowlist configured this fails unless `safe_default` is set, in
/// which case a localhost-only allowlist is used.
pub async fn resolve_allowlist(
    config: &WardenConfig,
    base_dir: &Path,
    safe_default: bool,
) -> Result<Vec<AllowlistEntry>> {
    let allowlist = config.allowlist.clone().unwrap_or_default();
    if allowlist.path.is_none() && allowlist.targets.is_none() {
        if safe_default {
            tracing::warn!(
                targets = ?defaults::SAFE_DEFAULT_TARGETS,
                "No allowlist configured; using localhost-only safe default"
            );
            return Ok(safe_default_allowlist());
        }
        bail!("no allowlist configured (set allowlist.path or allowlist.targets, or pass --safe-default)");
    }

    let mut entries = Vec::new();
    if let Some(path) = &allowlist.path {
        let path = io::resolve_relative(base_dir, path);
        entries.extend(load_allowlist_source(&path).await?.entries());
    }
    if let Some(targets) = &allowlist.targets {
        entries.extend(
            targets
                .iter()
                .filter(|t| !t.trim().is_empty())
                .map(|t| AllowlistEntry::parse(t)),
        );
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use warden_policy::AllowlistSnapshot;

    #[tokio::test]
    async fn inline_and_file_targets_merge() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("lab.json"), r#"{"allowed_targets": ["lab.internal"]}"#)
            .await
            .unwrap();
        let config = WardenConfig {
            allowlist: Some(AllowlistConfig {
                path: Some("lab.json".into()),
                targets: Some(vec!["10.0.0.0/24".into()]),
            }),
            ..Default::default()
        };

        let entries = resolve_allowlist(&config, dir.path(), false).await.unwrap();
        let snapshot = AllowlistSnapshot::from_entries(entries);
        assert!(snapshot.is_allowed("lab.internal"));
        assert!(snapshot.is_allowed("10.0.0.5"));
    }

    #[tokio::test]
    async fn missing_allowlist_requires_opt_in() {
        let dir = TempDir::new().unwrap();
        let config = WardenConfig::default();
        assert!(resolve_allowlist(&config, dir.path(), false).await.is_err());

        let entries = resolve_allowlist(&config, dir.path(), true).await.unwrap();
        assert_eq!(entries, safe_default_allowlist());
    }

    #[tokio::test]
    async fn configured_file_that_is_missing_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = WardenConfig {
            allowlist: Some(AllowlistConfig { path: Some("gone.yaml".into()), targets: None }),
            ..Default::default()
        };
        assert!(resolve_allowlist(&config, dir.path(), true).await.is_err());
    }

    #[tokio::test]
    async fn invalid_config_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        tokio::fs::write(&path, "audit:\n  maxEntries: 0\n").await.unwrap();
        let err = load_and_prepare(&path).await.unwrap_err();
        assert!(err.to_string().contains("audit.maxEntries"));
    }
}
