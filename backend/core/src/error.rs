use thiserror::Error;

/// Top-level error type for the warden engine.
///
/// Nothing of this type crosses the engine boundary: the authorization
/// engine turns every variant into a `DENY` verdict naming the failed check.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("allowlist check failed: {0}")]
    Allowlist(String),

    #[error("classification failed: {0}")]
    Classification(String),

    #[error("audit unavailable: {0}")]
    AuditUnavailable(String),

    #[error("audit chain broken at index {index}: {reason}")]
    ChainBroken { index: usize, reason: String },

    #[error("request timed out after {0} ms")]
    Timeout(u64),
}

pub type Result<T, E = WardenError> = std::result::Result<T, E>;
