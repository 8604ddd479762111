//! Log Redaction Layer
//!
//! Scrubs the authorization watchword, API keys, and bearer tokens from
//! command text before it reaches a log line.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)")
        .expect("static regex")
});
static CREDENTIAL_ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(password|passwd|token|secret)=\S+").expect("static regex")
});

/// Redacts sensitive patterns in a string. Watchword matching is
/// case-insensitive, like the gate's own check. An empty watchword is ignored.
pub fn redact_sensitive_data(input: &str, watchword: &str) -> String {
    let mut redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]").to_string();
    redacted = CREDENTIAL_ARG_RE.replace_all(&redacted, "$1=[REDACTED]").to_string();

    if !watchword.is_empty() {
        if let Ok(re) = RegexBuilder::new(&regex::escape(watchword))
            .case_insensitive(true)
            .build()
        {
            redacted = re.replace_all(&redacted, "[REDACTED_WATCHWORD]").to_string();
        }
    }

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchword_is_scrubbed_in_any_case() {
        let clean = redact_sensitive_data("WASSIM pentest 10.0.0.9 wassim", "Wassim");
        assert!(!clean.to_lowercase().contains("wassim"));
        assert!(clean.contains("pentest 10.0.0.9"));
    }

    #[test]
    fn tokens_are_scrubbed() {
        let raw = "curl -H Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9 password=hunter2";
        let clean = redact_sensitive_data(raw, "");
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
        assert!(!clean.contains("hunter2"));
        assert!(clean.contains("password=[REDACTED]"));
    }

    #[test]
    fn watchword_with_regex_metacharacters() {
        let clean = redact_sensitive_data("go a.b+c now", "a.b+c");
        assert_eq!(clean, "go [REDACTED_WATCHWORD] now");
    }
}
