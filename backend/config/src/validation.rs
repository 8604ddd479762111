//! Config validation with field paths in every message.

use crate::schema::WardenConfig;
use thiserror::Error;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &WardenConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_watchword(config, &mut report);
    validate_allowlist(config, &mut report);
    validate_audit(config, &mut report);
    validate_limits(config, &mut report);
    report
}

fn validate_watchword(config: &WardenConfig, report: &mut ValidationReport) {
    let Some(watchword) = &config.watchword else { return };
    if watchword.trim().is_empty() {
        report.error("watchword", "Watchword cannot be empty");
    } else if watchword.chars().any(char::is_whitespace) {
        report.warn(
            "watchword",
            "Watchword contains whitespace; it is matched as a single substring",
        );
    }
}

fn validate_allowlist(config: &WardenConfig, report: &mut ValidationReport) {
    let Some(allowlist) = &config.allowlist else { return };
    if let Some(targets) = &allowlist.targets {
        if targets.is_empty() && allowlist.path.is_none() {
            report.warn("allowlist.targets", "Allowlist is empty; every target will be blocked");
        }
        if targets.iter().any(|t| t.trim().is_empty()) {
            report.warn("allowlist.targets", "Blank targets are ignored");
        }
    }
}

fn validate_audit(config: &WardenConfig, report: &mut ValidationReport) {
    let Some(audit) = &config.audit else { return };
    if audit.max_entries == Some(0) {
        report.error("audit.maxEntries", "Audit window must retain at least one entry");
    }
    if audit.chain_path.is_some() && audit.log_path.is_none() {
        report.warn(
            "audit.chainPath",
            "Chain snapshot without a decision log; entries cannot be checked against the log",
        );
    }
}

fn validate_limits(config: &WardenConfig, report: &mut ValidationReport) {
    if config.request_timeout_ms == Some(0) {
        report.error("requestTimeoutMs", "Request timeout must be greater than zero");
    }
    if let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            report.warn("logging.level", format!("Unknown log level '{level}'"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AllowlistConfig, AuditConfig, LoggingConfig};

    #[test]
    fn default_config_is_valid() {
        let report = validate(&crate::defaults::apply_all_defaults(WardenConfig::default()));
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn empty_watchword_is_an_error() {
        let config = WardenConfig { watchword: Some("  ".into()), ..Default::default() };
        let report = validate(&config);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "watchword");
    }

    #[test]
    fn zero_window_and_timeout_are_errors() {
        let config = WardenConfig {
            request_timeout_ms: Some(0),
            audit: Some(AuditConfig { max_entries: Some(0), ..Default::default() }),
            ..Default::default()
        };
        assert_eq!(validate(&config).errors.len(), 2);
    }

    #[test]
    fn soft_problems_are_warnings() {
        let config = WardenConfig {
            watchword: Some("open sesame".into()),
            allowlist: Some(AllowlistConfig { path: None, targets: Some(vec![]) }),
            logging: Some(LoggingConfig { level: Some("loud".into()), dir: None }),
            ..Default::default()
        };
        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 3);
    }
}
