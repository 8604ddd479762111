use std::fmt;

use serde::{Deserialize, Serialize};

/// What a command is trying to do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Scanning,
    Monitoring,
    Reconnaissance,
    PenetrationTesting,
    #[default]
    Unknown,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Scanning => "scanning",
            ActionType::Monitoring => "monitoring",
            ActionType::Reconnaissance => "reconnaissance",
            ActionType::PenetrationTesting => "penetration_testing",
            ActionType::Unknown => "unknown",
        }
    }

    /// Risk tier implied by the action type.
    pub fn risk_level(&self) -> RiskLevel {
        match self {
            ActionType::PenetrationTesting => RiskLevel::High,
            ActionType::Scanning | ActionType::Reconnaissance => RiskLevel::Medium,
            ActionType::Monitoring => RiskLevel::Low,
            ActionType::Unknown => RiskLevel::Unknown,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk tier. `Unknown` means risk could not be established.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Unknown => "unknown",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse shape of a target string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Localhost,
    PrivateIp,
    PublicIp,
    Domain,
    #[default]
    Unknown,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetType::Localhost => "localhost",
            TargetType::PrivateIp => "private_ip",
            TargetType::PublicIp => "public_ip",
            TargetType::Domain => "domain",
            TargetType::Unknown => "unknown",
        })
    }
}

/// Result of classifying a command text. Immutable once built.
///
/// `target_type` describes the primary (first) extracted target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CommandAnalysis {
    pub action_type: ActionType,
    pub risk_level: RiskLevel,
    pub requires_authorization_keyword: bool,
    pub extracted_targets: Vec<String>,
    pub target_type: TargetType,
}

impl CommandAnalysis {
    pub fn primary_target(&self) -> Option<&str> {
        self.extracted_targets.first().map(String::as_str)
    }
}
