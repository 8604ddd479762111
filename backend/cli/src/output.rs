//! Terminal rendering for verdicts, chain reports and engine status.

use serde::Serialize;
use warden_core::{CommandAnalysis, Decision, HashPolicy, OperatingMode, TargetType};
use warden_security::{ChainVerification, EngineStatus, OperationPlan, Verdict};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

fn paint(color: &str, text: &str) -> String {
    if supports_color() {
        format!("{color}{BOLD}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        eprintln!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        eprintln!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Key/value tables
// ---------------------------------------------------------------------------

fn visible_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/// Render `label: value` rows with the labels padded to a common width.
/// Labels may carry color codes; only visible characters count.
pub fn render_fields(rows: &[(&str, String)]) -> String {
    let width = rows.iter().map(|(label, _)| visible_width(label)).max().unwrap_or(0);
    let mut out = String::new();
    for (label, value) in rows {
        let pad = " ".repeat(width - visible_width(label));
        if supports_color() {
            out.push_str(&format!("  {DIM}{label}{RESET}{pad}  {value}\n"));
        } else {
            out.push_str(&format!("  {label}{pad}  {value}\n"));
        }
    }
    out
}

fn decision_label(decision: Decision) -> String {
    match decision {
        Decision::Allow => paint(GREEN, "ALLOW"),
        Decision::Deny => paint(RED, "DENY"),
    }
}

fn mode_label(mode: OperatingMode) -> String {
    match mode {
        OperatingMode::Restricted => mode.to_string(),
        OperatingMode::Privileged => paint(YELLOW, &mode.to_string()),
    }
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn hash_policy_label(policy: HashPolicy) -> &'static str {
    match policy {
        HashPolicy::Record => "record",
        HashPolicy::AccumulatedLog => "accumulatedLog",
    }
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

pub fn render_analysis(
    analysis: &CommandAnalysis,
    target_type: TargetType,
    profile: warden_policy::Profile,
    suggestions: &[&str],
) -> String {
    let mut rows = vec![
        ("Action", analysis.action_type.to_string()),
        ("Risk", analysis.risk_level.as_str().to_uppercase()),
        ("Targets", list_or_dash(&analysis.extracted_targets)),
        ("Target type", target_type.to_string()),
        (
            "Keyword required",
            if analysis.requires_authorization_keyword { "yes" } else { "no" }.to_string(),
        ),
        ("Profile", profile.to_string()),
    ];
    if !suggestions.is_empty() {
        rows.push(("Suggestions", suggestions.join("; ")));
    }
    render_fields(&rows)
}

pub fn render_verdict(verdict: &Verdict) -> String {
    let context = &verdict.context;
    let mut out = format!(
        "{} {}\n",
        decision_label(context.decision),
        paint(CYAN, &verdict.request_id.to_string())
    );
    let mut rows = vec![
        ("Reason", context.reason.clone()),
        ("Mode", mode_label(context.mode)),
        ("Action", verdict.analysis.action_type.to_string()),
        ("Risk", verdict.analysis.risk_level.as_str().to_uppercase()),
        ("Allowed", list_or_dash(&context.allowed_targets)),
        ("Blocked", list_or_dash(&context.blocked_targets)),
        ("Profile", verdict.profile.to_string()),
        ("Actor", context.actor_identity.clone()),
    ];
    match &verdict.audit_entry {
        Some(entry) => rows.push((
            "Audit",
            format!("#{} {}", entry.sequence_index, entry.content_hash),
        )),
        None => rows.push(("Audit", paint(RED, "not recorded"))),
    }
    out.push_str(&render_fields(&rows));
    out.push_str(&format!("\n  {}\n", verdict.explanation));
    out
}

pub fn render_plan(plan: &OperationPlan) -> String {
    let mut out = format!("\nDry run for {} ({}): {}\n", plan.target, plan.mode, plan.note);
    for command in &plan.commands_would_run {
        out.push_str(&format!("  $ {command}\n"));
    }
    out
}

pub fn render_verification(report: &ChainVerification) -> String {
    if report.valid {
        return format!("{} {} entries verified\n", paint(GREEN, "✓"), report.checked);
    }
    let at = report
        .broken_at
        .map(|i| format!(" at entry {i}"))
        .unwrap_or_default();
    format!(
        "{} chain broken{at}: {}\n",
        paint(RED, "✗"),
        report.reason.as_deref().unwrap_or("unknown")
    )
}

pub fn render_status(status: &EngineStatus) -> String {
    let mut out = String::from("Warden status\n\n");
    let kill_switch = if status.kill_switch {
        paint(RED, "ENGAGED")
    } else {
        "off".to_string()
    };
    let chain = if status.chain_valid {
        paint(GREEN, "valid")
    } else {
        paint(RED, "BROKEN")
    };
    out.push_str(&render_fields(&[
        ("Kill switch", kill_switch),
        (
            "Allowlist",
            format!("{} hosts, {} networks", status.allowlist_hosts, status.allowlist_networks),
        ),
        (
            "Audit window",
            format!("{}/{}", status.audit_entries, status.audit_max_entries),
        ),
        ("Audit store", status.audit_store.clone()),
        ("Hash policy", hash_policy_label(status.hash_policy).to_string()),
        ("Head hash", status.head_hash.clone().unwrap_or_else(|| "-".into())),
        ("Chain", chain),
    ]));

    out.push_str("\nModes\n");
    for mode in [OperatingMode::Restricted, OperatingMode::Privileged] {
        let spec = status.modes.get(mode);
        let keyword = if spec.requires_authorization { " (watchword)" } else { "" };
        out.push_str(&format!(
            "  {}{keyword}: {}\n",
            mode_label(mode),
            spec.allowed_actions.join(", ")
        ));
    }
    out
}
