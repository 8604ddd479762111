//! Environment overrides applied on top of the config file.
//!
//! - `WARDEN_DISABLE` (or the older `MONICA_DISABLE`) set to a truthy value
//!   turns the kill switch on. It never turns it off.
//! - `WARDEN_WATCHWORD` replaces the configured watchword.
//!
//! `RUST_LOG` is read by the logger itself.

use std::collections::HashMap;
use tracing::warn;

use crate::schema::WardenConfig;

pub const DISABLE_VARS: [&str; 2] = ["WARDEN_DISABLE", "MONICA_DISABLE"];

pub const WATCHWORD_VAR: &str = "WARDEN_WATCHWORD";

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: WardenConfig) -> WardenConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map (useful for testing).
pub fn apply_env_overrides_with(
    mut config: WardenConfig,
    env: &HashMap<String, String>,
) -> WardenConfig {
    if let Some(var) = DISABLE_VARS
        .iter()
        .find(|v| env.get(**v).is_some_and(|value| is_truthy(value)))
    {
        warn!(variable = %var, "Kill switch enabled from environment");
        config.kill_switch = Some(true);
    }

    if let Some(watchword) = env.get(WATCHWORD_VAR) {
        config.watchword = Some(watchword.clone());
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn disable_flag_sets_kill_switch() {
        let config = apply_env_overrides_with(WardenConfig::default(), &env(&[("WARDEN_DISABLE", "1")]));
        assert_eq!(config.kill_switch, Some(true));
    }

    #[test]
    fn legacy_disable_flag_is_honoured() {
        let config = apply_env_overrides_with(WardenConfig::default(), &env(&[("MONICA_DISABLE", "1")]));
        assert!(config.kill_switch());
    }

    #[test]
    fn falsy_value_leaves_config_alone() {
        let base = WardenConfig { kill_switch: Some(true), ..Default::default() };
        let config = apply_env_overrides_with(base, &env(&[("WARDEN_DISABLE", "0")]));
        assert_eq!(config.kill_switch, Some(true));

        let config = apply_env_overrides_with(WardenConfig::default(), &env(&[("WARDEN_DISABLE", "")]));
        assert_eq!(config.kill_switch, None);
    }

    #[test]
    fn watchword_override() {
        let config = apply_env_overrides_with(
            WardenConfig { watchword: Some("Wassim".into()), ..Default::default() },
            &env(&[("WARDEN_WATCHWORD", "Hunter")]),
        );
        assert_eq!(config.watchword(), "Hunter");
    }
}
