//! Dry-run planning: what an allowed decision would run, without running it.
//!
//! Outcomes of exploitation or persistence steps are never simulated; the
//! plan lists commands only.

use serde::Serialize;
use warden_core::{ActionType, CommandAnalysis, OperatingMode, SecurityContext};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OperationPlan {
    pub dry_run: bool,
    pub mode: OperatingMode,
    pub target: String,
    pub commands_would_run: Vec<String>,
    pub note: String,
}

pub fn plan_operation(analysis: &CommandAnalysis, context: &SecurityContext) -> OperationPlan {
    let target = if context.target.is_empty() {
        "localhost".to_string()
    } else {
        context.target.clone()
    };

    if !context.is_allowed() {
        return OperationPlan {
            dry_run: true,
            mode: context.mode,
            target,
            commands_would_run: Vec::new(),
            note: format!("denied: {}", context.reason),
        };
    }

    let commands: Vec<String> = match analysis.action_type {
        ActionType::Scanning => vec![
            format!("nmap -sn {target}"),
            format!("nmap -sS -O {target}"),
        ],
        ActionType::Monitoring => vec![
            "ps aux".to_string(),
            "netstat -tuln".to_string(),
            "ss -tuln".to_string(),
        ],
        ActionType::Reconnaissance => vec![
            format!("subfinder -d {target}"),
            format!("amass enum -passive -d {target}"),
        ],
        ActionType::PenetrationTesting if context.mode == OperatingMode::Privileged => {
            vec![format!("nmap -sV --script vuln {target}")]
        }
        ActionType::PenetrationTesting | ActionType::Unknown => Vec::new(),
    };

    let note = if commands.is_empty() {
        "no commands planned for this action in the current mode".to_string()
    } else {
        "dry run: nothing was executed".to_string()
    };

    OperationPlan {
        dry_run: true,
        mode: context.mode,
        target,
        commands_would_run: commands,
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warden_policy::{classify, AllowlistEntry, AllowlistMatcher};

    use crate::gate::SecurityGate;

    fn decide(text: &str, allow: &[&str]) -> (CommandAnalysis, SecurityContext) {
        let matcher = AllowlistMatcher::new(allow.iter().map(|a| AllowlistEntry::parse(a)));
        let gate = SecurityGate::new("Wassim", Arc::new(matcher)).unwrap();
        let analysis = classify(text);
        let ctx = gate.authorize(&analysis, text, "tester");
        (analysis, ctx)
    }

    #[test]
    fn scan_plan_names_target() {
        let (analysis, ctx) = decide("scan 192.168.1.1", &["192.168.1.1"]);
        let plan = plan_operation(&analysis, &ctx);
        assert!(plan.dry_run);
        assert_eq!(plan.commands_would_run[0], "nmap -sn 192.168.1.1");
    }

    #[test]
    fn denied_plan_is_empty() {
        let (analysis, ctx) = decide("pentest 8.8.8.8", &[]);
        let plan = plan_operation(&analysis, &ctx);
        assert!(plan.commands_would_run.is_empty());
        assert!(plan.note.starts_with("denied:"));
    }

    #[test]
    fn privileged_pentest_plan() {
        let (analysis, ctx) = decide("Wassim pentest 10.0.0.9", &["10.0.0.9"]);
        let plan = plan_operation(&analysis, &ctx);
        assert_eq!(plan.mode, OperatingMode::Privileged);
        assert_eq!(plan.commands_would_run, vec!["nmap -sV --script vuln 10.0.0.9"]);
    }

    #[test]
    fn monitoring_defaults_to_localhost() {
        let (analysis, ctx) = decide("monitor processes", &[]);
        let plan = plan_operation(&analysis, &ctx);
        assert_eq!(plan.target, "localhost");
        assert_eq!(plan.commands_would_run.len(), 3);
    }
}
