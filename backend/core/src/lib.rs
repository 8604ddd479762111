pub mod audit;
pub mod command;
pub mod context;
pub mod error;
pub mod modes;
pub mod types;

pub use audit::{AuditChainEntry, HashPolicy, DEFAULT_MAX_ENTRIES, GENESIS_HASH};
pub use command::Command;
pub use context::{Decision, OperatingMode, SecurityContext};
pub use error::WardenError;
pub use modes::{ModeSpec, ModeTable};
pub use types::{ActionType, CommandAnalysis, RiskLevel, TargetType};
