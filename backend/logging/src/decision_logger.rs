//! Decision Event Logger
//!
//! Structured gate events written through `tracing` under the
//! `warden_decisions` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use warden_core::{ActionType, Decision, OperatingMode, RiskLevel};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum DecisionEvent {
    Analyzed {
        command: String,
        action_type: ActionType,
        risk_level: RiskLevel,
        targets: Vec<String>,
    },
    Authorized {
        actor: String,
        decision: Decision,
        mode: OperatingMode,
        reason: String,
    },
    AuditAppended {
        sequence_index: u64,
        content_hash: String,
    },
    AuditFailure {
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct DecisionLogEntry {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: DecisionEvent,
}

pub struct DecisionLogger;

impl DecisionLogger {
    /// Logs a decision event with all free text passed through redaction.
    pub fn log_decision(request_id: &str, watchword: &str, mut event: DecisionEvent) {
        match &mut event {
            DecisionEvent::Analyzed { command, targets, .. } => {
                *command = redact_sensitive_data(command, watchword);
                for t in targets.iter_mut() {
                    *t = redact_sensitive_data(t, watchword);
                }
            }
            DecisionEvent::Authorized { reason, .. } => {
                *reason = redact_sensitive_data(reason, watchword);
            }
            DecisionEvent::AuditFailure { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg, watchword);
            }
            DecisionEvent::AuditAppended { .. } => {}
        }

        let failure = matches!(event, DecisionEvent::AuditFailure { .. });
        let entry = DecisionLogEntry {
            request_id: request_id.into(),
            timestamp: Utc::now(),
            event,
        };

        if failure {
            warn!(target: "warden_decisions", event = ?entry, "Decision event");
        } else {
            info!(target: "warden_decisions", event = ?entry, "Decision event");
        }
    }
}
