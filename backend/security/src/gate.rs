//! Security gate: turns a classified command into an allow/deny verdict and
//! an operating mode.
//!
//! Per request: classified → allowlist checked → decided. The gate never
//! returns an error; a failed check becomes a `DENY` naming that check.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use warden_core::{
    CommandAnalysis, Decision, OperatingMode, RiskLevel, SecurityContext, WardenError,
};
use warden_policy::AllowlistMatcher;

pub const REASON_ALL_CHECKS_PASSED: &str = "all checks passed";
pub const REASON_KEYWORD_MISSING: &str = "authorization keyword required but not present";
pub const REASON_HIGH_RISK: &str = "high-risk action requires authorization keyword";
pub const REASON_UNCLASSIFIED: &str = "action could not be classified";

pub struct SecurityGate {
    /// Lower-cased once; matching is case-insensitive.
    watchword: String,
    allowlist: Arc<AllowlistMatcher>,
}

impl SecurityGate {
    /// Fails with a configuration error for an empty watchword, which would
    /// otherwise match every command.
    pub fn new(watchword: &str, allowlist: Arc<AllowlistMatcher>) -> Result<Self, WardenError> {
        let watchword = watchword.trim();
        if watchword.is_empty() {
            return Err(WardenError::Config("authorization watchword is empty".into()));
        }
        Ok(Self { watchword: watchword.to_lowercase(), allowlist })
    }

    pub fn keyword_present(&self, raw_command: &str) -> bool {
        raw_command.to_lowercase().contains(&self.watchword)
    }

    pub fn allowlist(&self) -> &Arc<AllowlistMatcher> {
        &self.allowlist
    }

    pub fn authorize(
        &self,
        analysis: &CommandAnalysis,
        raw_command: &str,
        actor: &str,
    ) -> SecurityContext {
        let keyword_present = self.keyword_present(raw_command);

        // One snapshot for every target so a concurrent reload cannot split the verdict.
        let mut allowed_targets = Vec::new();
        let mut blocked_targets = Vec::new();
        let check_error = match self.allowlist.snapshot() {
            Ok(snapshot) => {
                for target in &analysis.extracted_targets {
                    if snapshot.is_allowed(target) {
                        allowed_targets.push(target.clone());
                    } else {
                        blocked_targets.push(target.clone());
                    }
                }
                None
            }
            Err(e) => Some(e),
        };

        let every_target_allowed = check_error.is_none() && blocked_targets.is_empty();
        let mode = if keyword_present && every_target_allowed {
            OperatingMode::Privileged
        } else {
            OperatingMode::Restricted
        };

        let mut reasons: Vec<String> = Vec::new();
        if let Some(e) = &check_error {
            reasons.push(e.to_string());
        }
        if analysis.requires_authorization_keyword && !keyword_present {
            reasons.push(REASON_KEYWORD_MISSING.to_string());
        }
        if !blocked_targets.is_empty() {
            reasons.push(format!("blocked targets: {}", blocked_targets.join(", ")));
        }
        if analysis.risk_level == RiskLevel::High && !keyword_present {
            reasons.push(REASON_HIGH_RISK.to_string());
        }
        if analysis.risk_level == RiskLevel::Unknown {
            reasons.push(REASON_UNCLASSIFIED.to_string());
        }

        let (decision, reason) = if reasons.is_empty() {
            (Decision::Allow, REASON_ALL_CHECKS_PASSED.to_string())
        } else {
            (Decision::Deny, reasons.join("; "))
        };

        debug!(
            actor = %actor,
            decision = %decision,
            mode = %mode,
            blocked = blocked_targets.len(),
            "Gate decided"
        );

        SecurityContext {
            mode,
            keyword_present,
            target: analysis.primary_target().unwrap_or_default().to_string(),
            target_allowed: every_target_allowed,
            allowed_targets,
            blocked_targets,
            decision,
            reason,
            actor_identity: actor.to_string(),
            timestamp: Utc::now(),
        }
    }
}
