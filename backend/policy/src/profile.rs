//! Operational profile recommendation and per-action command suggestions.

use std::fmt;

use serde::{Deserialize, Serialize};
use warden_core::{ActionType, CommandAnalysis, RiskLevel, TargetType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Profile {
    Defend,
    Test,
    Stealth,
    Aggressive,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Profile::Defend => "DEFEND",
            Profile::Test => "TEST",
            Profile::Stealth => "STEALTH",
            Profile::Aggressive => "AGGRESSIVE",
        })
    }
}

pub fn recommend_profile(analysis: &CommandAnalysis) -> Profile {
    match analysis.action_type {
        ActionType::Monitoring => Profile::Defend,
        ActionType::PenetrationTesting => Profile::Test,
        _ if analysis.risk_level == RiskLevel::High => Profile::Stealth,
        _ if analysis.target_type == TargetType::Localhost => Profile::Aggressive,
        _ => Profile::Defend,
    }
}

/// Example invocations an operator might run for this kind of action.
pub fn suggestions_for(action: ActionType) -> &'static [&'static str] {
    match action {
        ActionType::Scanning => &[
            "nmap -sn <target>  # ping scan",
            "nmap -sS <target>  # SYN scan",
            "nmap -sV <target>  # version detection",
        ],
        ActionType::Monitoring => &[
            "netstat -tulpn  # active connections",
            "ss -tulpn       # socket statistics",
            "ps aux          # running processes",
        ],
        ActionType::Reconnaissance => &[
            "subfinder -d <domain>   # subdomain enumeration",
            "amass enum -d <domain>  # active reconnaissance",
            "nuclei -u <target>      # vulnerability scan",
        ],
        ActionType::PenetrationTesting | ActionType::Unknown => &[],
    }
}
