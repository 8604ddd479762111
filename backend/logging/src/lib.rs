//! Structured logging for warden.
//!
//! Console + daily-rotated JSON file output, watchword and token redaction,
//! and structured decision events.

pub mod decision_logger;
pub mod logger;
pub mod redact;

pub use decision_logger::{DecisionEvent, DecisionLogEntry, DecisionLogger};
pub use logger::{init_console_logger, init_logger};
pub use redact::redact_sensitive_data;
