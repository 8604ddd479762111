use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operating mode granted to a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatingMode {
    #[default]
    Restricted,
    Privileged,
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperatingMode::Restricted => "RESTRICTED",
            OperatingMode::Privileged => "PRIVILEGED",
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allow,
    Deny,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
        })
    }
}

/// The gate's verdict for one request. Never mutated after creation;
/// a downgraded verdict is a new value built with [`SecurityContext::denied_from`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityContext {
    pub mode: OperatingMode,
    pub keyword_present: bool,
    /// Primary target, empty when the command named none.
    pub target: String,
    pub target_allowed: bool,
    pub allowed_targets: Vec<String>,
    pub blocked_targets: Vec<String>,
    pub decision: Decision,
    pub reason: String,
    pub actor_identity: String,
    pub timestamp: DateTime<Utc>,
}

impl SecurityContext {
    /// An unconditional denial that carries no target information.
    pub fn deny(actor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            mode: OperatingMode::Restricted,
            keyword_present: false,
            target: String::new(),
            target_allowed: false,
            allowed_targets: Vec::new(),
            blocked_targets: Vec::new(),
            decision: Decision::Deny,
            reason: reason.into(),
            actor_identity: actor.into(),
            timestamp: Utc::now(),
        }
    }

    /// A denial that keeps the target facts of `other` but drops its
    /// mode back to restricted and replaces the reason.
    pub fn denied_from(other: &SecurityContext, reason: impl Into<String>) -> Self {
        Self {
            mode: OperatingMode::Restricted,
            decision: Decision::Deny,
            reason: reason.into(),
            timestamp: Utc::now(),
            ..other.clone()
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_is_restricted() {
        let ctx = SecurityContext::deny("alice", "system disabled");
        assert_eq!(ctx.mode, OperatingMode::Restricted);
        assert_eq!(ctx.decision, Decision::Deny);
        assert_eq!(ctx.reason, "system disabled");
        assert!(!ctx.is_allowed());
    }

    #[test]
    fn denied_from_keeps_targets() {
        let mut ctx = SecurityContext::deny("bob", "x");
        ctx.mode = OperatingMode::Privileged;
        ctx.decision = Decision::Allow;
        ctx.target = "10.0.0.9".into();
        ctx.allowed_targets = vec!["10.0.0.9".into()];

        let downgraded = SecurityContext::denied_from(&ctx, "audit unavailable");
        assert_eq!(downgraded.decision, Decision::Deny);
        assert_eq!(downgraded.mode, OperatingMode::Restricted);
        assert_eq!(downgraded.target, "10.0.0.9");
        assert_eq!(downgraded.allowed_targets, vec!["10.0.0.9".to_string()]);
        assert_eq!(ctx.decision, Decision::Allow);
    }

    #[test]
    fn mode_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&OperatingMode::Privileged).unwrap(),
            "\"PRIVILEGED\""
        );
        assert_eq!(serde_json::to_string(&Decision::Deny).unwrap(), "\"DENY\"");
    }
}
