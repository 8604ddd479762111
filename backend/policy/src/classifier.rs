//! Command classifier: maps free-text commands to an action type, risk tier,
//! and the targets they name.
//!
//! Pure keyword matching over fixed vocabularies. Same input, same output.

use std::net::IpAddr;

use warden_core::{ActionType, CommandAnalysis, TargetType};

use crate::network::IpNetwork;

/// Vocabularies in priority order; the first table with a hit decides.
static VOCABULARIES: &[(ActionType, &[&str])] = &[
    (ActionType::PenetrationTesting, &["attack", "exploit", "pentest"]),
    (ActionType::Reconnaissance, &["recon", "enumerate", "discover"]),
    (ActionType::Scanning, &["scan", "nmap", "port"]),
    (ActionType::Monitoring, &["monitor", "check", "status"]),
];

static LOCALHOST_NAMES: &[&str] = &["localhost", "localhost.localdomain", "ip6-localhost"];

/// Classify a command text.
pub fn classify(text: &str) -> CommandAnalysis {
    let action_type = classify_action(text);
    let extracted_targets = extract_targets(text);
    let target_type = extracted_targets
        .first()
        .map(|t| classify_target_type(t))
        .unwrap_or_default();

    CommandAnalysis {
        action_type,
        risk_level: action_type.risk_level(),
        requires_authorization_keyword: action_type == ActionType::PenetrationTesting,
        extracted_targets,
        target_type,
    }
}

/// Case-insensitive substring match against the vocabularies.
pub fn classify_action(text: &str) -> ActionType {
    let lowered = text.to_lowercase();
    VOCABULARIES
        .iter()
        .find(|(_, words)| words.iter().any(|w| lowered.contains(w)))
        .map(|(action, _)| *action)
        .unwrap_or(ActionType::Unknown)
}

/// Whitespace tokens that look like an IP, a CIDR block, or a domain name,
/// in order of appearance. Repeated tokens are kept.
///
/// The domain test is a heuristic (contains a dot, no leading dot, longer than
/// three characters), so `3.14` or `file.txt` are picked up as well.
pub fn extract_targets(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|token| is_ip_literal(token) || is_cidr_literal(token) || looks_like_domain(token))
        .map(str::to_string)
        .collect()
}

fn is_ip_literal(token: &str) -> bool {
    token.parse::<IpAddr>().is_ok()
}

fn is_cidr_literal(token: &str) -> bool {
    token.contains('/') && token.parse::<IpNetwork>().is_ok()
}

fn looks_like_domain(token: &str) -> bool {
    token.contains('.') && !token.starts_with('.') && token.chars().count() > 3
}

/// Coarse type of a single target string.
pub fn classify_target_type(target: &str) -> TargetType {
    if target.is_empty() {
        return TargetType::Unknown;
    }
    if LOCALHOST_NAMES.iter().any(|n| target.eq_ignore_ascii_case(n)) {
        return TargetType::Localhost;
    }
    if let Ok(ip) = target.parse::<IpAddr>() {
        return classify_ip(&ip);
    }
    if target.contains('.') && !target.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return TargetType::Domain;
    }
    TargetType::Unknown
}

fn classify_ip(ip: &IpAddr) -> TargetType {
    if ip.is_loopback() {
        return TargetType::Localhost;
    }
    if ip.is_unspecified() || ip.is_multicast() {
        return TargetType::Unknown;
    }
    match ip {
        IpAddr::V4(v4) => {
            if v4.is_private() || v4.is_link_local() {
                TargetType::PrivateIp
            } else if v4.is_broadcast() || v4.is_documentation() {
                TargetType::Unknown
            } else {
                TargetType::PublicIp
            }
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link local
            if first & 0xfe00 == 0xfc00 || first & 0xffc0 == 0xfe80 {
                TargetType::PrivateIp
            } else {
                TargetType::PublicIp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::RiskLevel;

    #[test]
    fn scan_with_private_ip() {
        let a = classify("scan 192.168.1.1");
        assert_eq!(a.action_type, ActionType::Scanning);
        assert_eq!(a.risk_level, RiskLevel::Medium);
        assert!(!a.requires_authorization_keyword);
        assert_eq!(a.extracted_targets, vec!["192.168.1.1"]);
        assert_eq!(a.target_type, TargetType::PrivateIp);
    }

    #[test]
    fn pentest_requires_keyword() {
        let a = classify("Wassim pentest 10.0.0.9");
        assert_eq!(a.action_type, ActionType::PenetrationTesting);
        assert_eq!(a.risk_level, RiskLevel::High);
        assert!(a.requires_authorization_keyword);
    }

    #[test]
    fn priority_order_pentest_over_scan() {
        assert_eq!(classify_action("scan then exploit"), ActionType::PenetrationTesting);
        assert_eq!(classify_action("discover open ports"), ActionType::Reconnaissance);
        assert_eq!(classify_action("nmap status"), ActionType::Scanning);
        assert_eq!(classify_action("CHECK uptime"), ActionType::Monitoring);
    }

    #[test]
    fn empty_input() {
        let a = classify("");
        assert_eq!(a.action_type, ActionType::Unknown);
        assert_eq!(a.risk_level, RiskLevel::Unknown);
        assert!(a.extracted_targets.is_empty());
        assert!(!a.requires_authorization_keyword);
        assert_eq!(a.target_type, TargetType::Unknown);
    }

    #[test]
    fn extraction_keeps_order_and_duplicates() {
        let targets = extract_targets("nmap 10.0.0.1 example.com 10.0.0.0/24 10.0.0.1 -sV");
        assert_eq!(targets, vec!["10.0.0.1", "example.com", "10.0.0.0/24", "10.0.0.1"]);
    }

    #[test]
    fn numeric_text_matches_domain_heuristic() {
        assert_eq!(extract_targets("pi is 3.14"), vec!["3.14"]);
        assert_eq!(classify_target_type("3.14"), TargetType::Unknown);
    }

    #[test]
    fn short_and_leading_dot_tokens_are_skipped() {
        assert!(extract_targets("a.b .hidden ok").is_empty());
    }

    #[test]
    fn ipv6_literals_are_targets() {
        assert_eq!(extract_targets("monitor ::1"), vec!["::1"]);
    }

    #[test]
    fn target_types() {
        assert_eq!(classify_target_type("localhost"), TargetType::Localhost);
        assert_eq!(classify_target_type("127.0.0.1"), TargetType::Localhost);
        assert_eq!(classify_target_type("::1"), TargetType::Localhost);
        assert_eq!(classify_target_type("10.1.2.3"), TargetType::PrivateIp);
        assert_eq!(classify_target_type("fd00::5"), TargetType::PrivateIp);
        assert_eq!(classify_target_type("8.8.8.8"), TargetType::PublicIp);
        assert_eq!(classify_target_type("example.org"), TargetType::Domain);
        assert_eq!(classify_target_type("router"), TargetType::Unknown);
        assert_eq!(classify_target_type(""), TargetType::Unknown);
    }

    #[test]
    fn classification_is_deterministic() {
        let text = "Wassim exploit 10.0.0.9 lab.internal";
        let first = serde_json::to_vec(&classify(text)).unwrap();
        let second = serde_json::to_vec(&classify(text)).unwrap();
        assert_eq!(first, second);
    }
}
