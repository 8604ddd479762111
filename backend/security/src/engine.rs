//! Authorization engine, the entry point callers use.
//!
//! classify → gate → audit, fail-closed throughout. Every error inside the
//! pipeline becomes a `DENY` verdict; nothing propagates to the caller.

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use warden_core::{
    AuditChainEntry, Command, CommandAnalysis, ModeTable, SecurityContext, WardenError,
};
use warden_logging::{DecisionEvent, DecisionLogger};
use warden_policy::{classify, recommend_profile, suggestions_for, AllowlistEntry, AllowlistMatcher, Profile};

use crate::audit_chain::{AuditChain, ChainVerification};
use crate::gate::SecurityGate;
use crate::planner::{plan_operation, OperationPlan};
use crate::report::{explain, EngineStatus};

pub const REASON_SYSTEM_DISABLED: &str = "system disabled";
pub const REASON_AUDIT_UNAVAILABLE: &str = "audit unavailable";
pub const REASON_TIMED_OUT: &str = "request timed out";
pub const REASON_EVALUATION_FAILED: &str = "evaluation failed";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub watchword: String,
    pub kill_switch: bool,
    pub request_timeout: Duration,
    pub modes: ModeTable,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            watchword: "Wassim".to_string(),
            kill_switch: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            modes: ModeTable::default(),
        }
    }
}

/// Everything the engine returns for one command.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub request_id: Uuid,
    pub analysis: CommandAnalysis,
    pub context: SecurityContext,
    pub profile: Profile,
    pub explanation: String,
    pub suggestions: Vec<String>,
    pub audit_entry: Option<AuditChainEntry>,
}

impl Verdict {
    pub fn plan(&self) -> OperationPlan {
        plan_operation(&self.analysis, &self.context)
    }
}

/// Signature of the classification step.
pub type Classifier = fn(&str) -> CommandAnalysis;

/// Shared by a timed request and its worker. Both fields only change while
/// the audit write lock is held, so exactly one side gets to record.
#[derive(Debug, Default)]
struct RequestSlot {
    /// The caller has given up and recorded a timeout denial.
    abandoned: AtomicBool,
    /// The worker reached the audit step first.
    settled: AtomicBool,
}

pub struct AuthorizationEngine {
    gate: SecurityGate,
    classifier: Classifier,
    audit: RwLock<AuditChain>,
    kill_switch: AtomicBool,
    watchword: String,
    request_timeout: Duration,
    modes: ModeTable,
}

impl AuthorizationEngine {
    pub fn new(
        settings: EngineSettings,
        allowlist: Arc<AllowlistMatcher>,
        audit: AuditChain,
    ) -> Result<Self, WardenError> {
        let gate = SecurityGate::new(&settings.watchword, allowlist)?;
        if settings.kill_switch {
            warn!("Kill switch is set; every request will be denied");
        }
        info!(
            timeout_ms = settings.request_timeout.as_millis() as u64,
            audit_window = audit.max_entries(),
            "Authorization engine ready"
        );
        Ok(Self {
            gate,
            classifier: classify,
            audit: RwLock::new(audit),
            kill_switch: AtomicBool::new(settings.kill_switch),
            watchword: settings.watchword,
            request_timeout: settings.request_timeout,
            modes: settings.modes,
        })
    }

    /// Replace the keyword classifier. It must stay a pure function.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn set_kill_switch(&self, disabled: bool) {
        self.kill_switch.store(disabled, Ordering::SeqCst);
        warn!(disabled, "Kill switch changed");
    }

    pub fn is_disabled(&self) -> bool {
        self.kill_switch.load(Ordering::SeqCst)
    }

    /// Classify a command without authorizing or auditing it.
    pub fn analyze(&self, text: &str) -> CommandAnalysis {
        (self.classifier)(text)
    }

    pub fn reload_allowlist(
        &self,
        entries: impl IntoIterator<Item = AllowlistEntry>,
    ) -> Result<(), WardenError> {
        self.gate.allowlist().load(entries)
    }

    /// Run one command through the full pipeline. Never fails; any internal
    /// error yields a `DENY` verdict.
    pub fn evaluate(&self, command: &Command, actor: &str) -> Verdict {
        self.evaluate_in(command, actor, None)
    }

    fn evaluate_in(&self, command: &Command, actor: &str, slot: Option<&RequestSlot>) -> Verdict {
        let request_id = command.id.to_string();

        // Must stay the first check.
        if self.is_disabled() {
            let context = SecurityContext::deny(actor, REASON_SYSTEM_DISABLED);
            return self.finish(command, CommandAnalysis::default(), context, true, slot);
        }

        let classifier = self.classifier;
        let analysis = match panic::catch_unwind(|| classifier(&command.text)) {
            Ok(analysis) => analysis,
            Err(_) => {
                error!(request_id = %request_id, "Classifier panicked");
                let context = SecurityContext::deny(
                    actor,
                    WardenError::Classification("classifier panicked".into()).to_string(),
                );
                return self.finish(command, CommandAnalysis::default(), context, false, slot);
            }
        };

        DecisionLogger::log_decision(
            &request_id,
            &self.watchword,
            DecisionEvent::Analyzed {
                command: command.text.clone(),
                action_type: analysis.action_type,
                risk_level: analysis.risk_level,
                targets: analysis.extracted_targets.clone(),
            },
        );

        let context = self.gate.authorize(&analysis, &command.text, actor);
        self.finish(command, analysis, context, false, slot)
    }

    /// [`evaluate`](Self::evaluate) under the configured end-to-end timeout.
    ///
    /// On expiry the request is denied and the denial is audited. The worker
    /// still running in the background then records nothing. If the worker
    /// reached the audit step before the deadline was acted on, its recorded
    /// verdict is returned instead, so the caller always sees what the chain
    /// holds.
    pub async fn evaluate_with_timeout(self: &Arc<Self>, command: Command, actor: String) -> Verdict {
        let slot = Arc::new(RequestSlot::default());
        let engine = Arc::clone(self);
        let task_slot = Arc::clone(&slot);
        let task_command = command.clone();
        let task_actor = actor.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            engine.evaluate_in(&task_command, &task_actor, Some(&task_slot))
        });

        let outcome = match tokio::time::timeout(self.request_timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                if !self.abandon(&slot) {
                    // Already recorded; only the worker's logging is left.
                    task.await
                } else {
                    let timeout = WardenError::Timeout(self.request_timeout.as_millis() as u64);
                    warn!(request_id = %command.id, error = %timeout, "Denying request");
                    let context = SecurityContext::deny(&actor, REASON_TIMED_OUT);
                    return self.finish(&command, CommandAnalysis::default(), context, false, None);
                }
            }
        };

        match outcome {
            Ok(verdict) => verdict,
            Err(join_error) => {
                error!(request_id = %command.id, error = %join_error, "Evaluation task failed");
                let context = SecurityContext::deny(&actor, REASON_EVALUATION_FAILED);
                self.finish(&command, CommandAnalysis::default(), context, false, None)
            }
        }
    }

    /// Claim the request for the timeout path. Returns false when the worker
    /// has already recorded its verdict.
    fn abandon(&self, slot: &RequestSlot) -> bool {
        let _chain = self.audit.write();
        if slot.settled.load(Ordering::SeqCst) {
            return false;
        }
        slot.abandoned.store(true, Ordering::SeqCst);
        true
    }

    /// Audit the verdict and assemble the reply. When `keep_reason` is set an
    /// audit failure still denies but does not overwrite the original reason.
    fn finish(
        &self,
        command: &Command,
        analysis: CommandAnalysis,
        context: SecurityContext,
        keep_reason: bool,
        slot: Option<&RequestSlot>,
    ) -> Verdict {
        let request_id = command.id.to_string();

        let (context, audit_entry) = match self.append_audit(&context, slot) {
            Ok(entry) => {
                DecisionLogger::log_decision(
                    &request_id,
                    &self.watchword,
                    DecisionEvent::AuditAppended {
                        sequence_index: entry.sequence_index,
                        content_hash: entry.content_hash.clone(),
                    },
                );
                (context, Some(entry))
            }
            Err(WardenError::Timeout(_)) => {
                debug!(request_id = %request_id, "Request abandoned; verdict discarded");
                (SecurityContext::denied_from(&context, REASON_TIMED_OUT), None)
            }
            Err(e) => {
                DecisionLogger::log_decision(
                    &request_id,
                    &self.watchword,
                    DecisionEvent::AuditFailure { error_msg: e.to_string() },
                );
                let denied = if keep_reason {
                    context
                } else {
                    SecurityContext::denied_from(&context, REASON_AUDIT_UNAVAILABLE)
                };
                (denied, None)
            }
        };

        DecisionLogger::log_decision(
            &request_id,
            &self.watchword,
            DecisionEvent::Authorized {
                actor: context.actor_identity.clone(),
                decision: context.decision,
                mode: context.mode,
                reason: context.reason.clone(),
            },
        );

        let profile = recommend_profile(&analysis);
        Verdict {
            request_id: command.id,
            explanation: explain(&analysis, &context, profile),
            suggestions: suggestions_for(analysis.action_type)
                .iter()
                .map(|s| s.to_string())
                .collect(),
            profile,
            analysis,
            context,
            audit_entry,
        }
    }

    /// Appends are serialized by the write lock. An abandoned request is
    /// refused with `Timeout` and leaves the chain untouched.
    fn append_audit(
        &self,
        context: &SecurityContext,
        slot: Option<&RequestSlot>,
    ) -> Result<AuditChainEntry, WardenError> {
        let mut chain = self
            .audit
            .write()
            .map_err(|_| WardenError::AuditUnavailable("audit chain lock poisoned".into()))?;
        if let Some(slot) = slot {
            if slot.abandoned.load(Ordering::SeqCst) {
                return Err(WardenError::Timeout(self.request_timeout.as_millis() as u64));
            }
            slot.settled.store(true, Ordering::SeqCst);
        }
        chain.append(context)
    }

    /// Verify the retained window. A poisoned lock reports an invalid chain.
    pub fn verify_chain(&self) -> ChainVerification {
        match self.audit.read() {
            Ok(chain) => chain.verify(),
            Err(_) => ChainVerification {
                valid: false,
                checked: 0,
                broken_at: None,
                reason: Some("audit chain lock poisoned".into()),
            },
        }
    }

    pub fn verify_against_log(&self) -> Result<ChainVerification, WardenError> {
        self.audit
            .read()
            .map_err(|_| WardenError::AuditUnavailable("audit chain lock poisoned".into()))?
            .verify_against_log()
    }

    pub fn audit_entries(&self) -> Vec<AuditChainEntry> {
        self.audit
            .read()
            .map(|chain| chain.entries().cloned().collect())
            .unwrap_or_default()
    }

    pub fn status(&self) -> EngineStatus {
        let (hosts, networks) = self
            .gate
            .allowlist()
            .snapshot()
            .map(|s| (s.host_count(), s.network_count()))
            .unwrap_or((0, 0));
        let verification = self.verify_chain();

        let (entries, max, store, policy, head) = match self.audit.read() {
            Ok(chain) => (
                chain.len(),
                chain.max_entries(),
                chain.store_description(),
                chain.policy(),
                chain.head_hash().map(str::to_string),
            ),
            Err(_) => (0, 0, "unavailable".to_string(), Default::default(), None),
        };

        EngineStatus {
            kill_switch: self.is_disabled(),
            allowlist_hosts: hosts,
            allowlist_networks: networks,
            audit_entries: entries,
            audit_max_entries: max,
            audit_store: store,
            hash_policy: policy,
            head_hash: head,
            chain_valid: verification.valid,
            modes: self.modes.clone(),
            timestamp: Utc::now(),
        }
    }
}
