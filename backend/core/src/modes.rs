//! Mode-to-allowed-action table. Display and validation only; the gate does
//! not consult it.

use serde::{Deserialize, Serialize};

use crate::context::OperatingMode;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModeSpec {
    pub description: String,
    #[serde(default)]
    pub allowed_actions: Vec<String>,
    #[serde(default)]
    pub requires_authorization: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModeTable {
    pub restricted: ModeSpec,
    pub privileged: ModeSpec,
}

impl Default for ModeTable {
    fn default() -> Self {
        let restricted_actions = ["scan", "monitor", "analyze", "report"];
        Self {
            restricted: ModeSpec {
                description: "Defensive operations only".to_string(),
                allowed_actions: restricted_actions.iter().map(|a| a.to_string()).collect(),
                requires_authorization: false,
            },
            privileged: ModeSpec {
                description: "Advanced testing operations".to_string(),
                allowed_actions: restricted_actions
                    .iter()
                    .chain(["install", "firewall", "suid_check"].iter())
                    .map(|a| a.to_string())
                    .collect(),
                requires_authorization: true,
            },
        }
    }
}

impl ModeTable {
    pub fn get(&self, mode: OperatingMode) -> &ModeSpec {
        match mode {
            OperatingMode::Restricted => &self.restricted,
            OperatingMode::Privileged => &self.privileged,
        }
    }

    /// Whether `action` is listed for `mode` (case-insensitive).
    pub fn permits(&self, mode: OperatingMode, action: &str) -> bool {
        self.get(mode)
            .allowed_actions
            .iter()
            .any(|a| a.eq_ignore_ascii_case(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_is_superset_of_restricted() {
        let table = ModeTable::default();
        for action in &table.restricted.allowed_actions {
            assert!(table.permits(OperatingMode::Privileged, action));
        }
        assert!(table.permits(OperatingMode::Privileged, "FIREWALL"));
        assert!(!table.permits(OperatingMode::Restricted, "firewall"));
    }

    #[test]
    fn only_privileged_requires_authorization() {
        let table = ModeTable::default();
        assert!(!table.get(OperatingMode::Restricted).requires_authorization);
        assert!(table.get(OperatingMode::Privileged).requires_authorization);
    }
}
