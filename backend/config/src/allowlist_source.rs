//! Allowlist file formats.
//!
//! Two shapes are accepted under the `allowed_targets` key:
//!
//! ```yaml
//! allowed_targets:            # categorised
//!   lab:
//!     hosts: [lab.internal]
//!     cidrs: [10.0.0.0/24]
//! ```
//!
//! ```yaml
//! allowed_targets: [localhost, 10.0.0.0/24]   # flat
//! ```
//!
//! Category values that are not maps are skipped with a warning.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;
use warden_policy::AllowlistEntry;

#[derive(Debug, Clone, Deserialize)]
pub struct AllowlistSource {
    pub allowed_targets: AllowedTargets,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AllowedTargets {
    Flat(Vec<String>),
    Categorised(BTreeMap<String, Value>),
}

impl AllowlistSource {
    /// Flatten into parsed entries. Malformed networks degrade to literal
    /// hosts inside `AllowlistEntry`.
    pub fn entries(&self) -> Vec<AllowlistEntry> {
        match &self.allowed_targets {
            AllowedTargets::Flat(targets) => targets
                .iter()
                .filter(|t| !t.trim().is_empty())
                .map(|t| AllowlistEntry::parse(t))
                .collect(),
            AllowedTargets::Categorised(categories) => {
                let mut entries = Vec::new();
                for (name, category) in categories {
                    let Value::Object(fields) = category else {
                        warn!(category = %name, "Allowlist category is not a map; skipping");
                        continue;
                    };
                    for host in string_list(fields.get("hosts")) {
                        entries.push(AllowlistEntry::Host(host.trim().to_string()));
                    }
                    for cidr in string_list(fields.get("cidrs")) {
                        entries.push(AllowlistEntry::network_or_host(cidr));
                    }
                }
                entries
            }
        }
    }
}

fn string_list(value: Option<&Value>) -> impl Iterator<Item = &str> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
