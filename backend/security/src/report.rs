//! Human-readable explanations and engine status.

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_core::{CommandAnalysis, HashPolicy, ModeTable, SecurityContext};
use warden_policy::Profile;

/// One-line summary of an analysis and its verdict, `" | "`-separated.
pub fn explain(analysis: &CommandAnalysis, context: &SecurityContext, profile: Profile) -> String {
    let mut parts = vec![
        format!("Action Type: {}", analysis.action_type),
        format!("Risk Level: {}", analysis.risk_level.as_str().to_uppercase()),
    ];

    if !analysis.extracted_targets.is_empty() {
        parts.push(format!("Targets: {}", analysis.extracted_targets.join(", ")));
        if !context.blocked_targets.is_empty() {
            parts.push(format!("Blocked targets: {}", context.blocked_targets.join(", ")));
        }
    }

    if analysis.requires_authorization_keyword {
        if context.keyword_present {
            parts.push("Authorization keyword detected".to_string());
        } else {
            parts.push("Authorization keyword required but not found".to_string());
        }
    }

    if context.is_allowed() {
        parts.push("Safe to execute".to_string());
    } else {
        parts.push(format!("Blocked: {}", context.reason));
    }

    parts.push(format!("Mode: {}", context.mode));
    parts.push(format!("Recommended Profile: {profile}"));
    parts.join(" | ")
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub kill_switch: bool,
    pub allowlist_hosts: usize,
    pub allowlist_networks: usize,
    pub audit_entries: usize,
    pub audit_max_entries: usize,
    pub audit_store: String,
    pub hash_policy: HashPolicy,
    pub head_hash: Option<String>,
    pub chain_valid: bool,
    pub modes: ModeTable,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{ActionType, RiskLevel};

    #[test]
    fn explanation_mentions_missing_keyword_and_blocked_targets() {
        let analysis = CommandAnalysis {
            action_type: ActionType::PenetrationTesting,
            risk_level: RiskLevel::High,
            requires_authorization_keyword: true,
            extracted_targets: vec!["8.8.8.8".into()],
            ..Default::default()
        };
        let mut ctx = SecurityContext::deny("t", "blocked targets: 8.8.8.8");
        ctx.blocked_targets = vec!["8.8.8.8".into()];

        let text = explain(&analysis, &ctx, Profile::Test);
        assert!(text.contains("Action Type: penetration_testing"));
        assert!(text.contains("Risk Level: HIGH"));
        assert!(text.contains("Blocked targets: 8.8.8.8"));
        assert!(text.contains("required but not found"));
        assert!(text.ends_with("Recommended Profile: TEST"));
    }
}
