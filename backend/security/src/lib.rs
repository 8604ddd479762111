pub mod audit_chain;
pub mod audit_store;
pub mod engine;
pub mod gate;
pub mod planner;
pub mod report;

pub use audit_chain::{record_hash, verify_entries, AuditChain, ChainVerification};
pub use audit_store::{stream_digest, AuditStore, ChainFile, FileAuditStore, MemoryAuditStore};
pub use engine::{AuthorizationEngine, EngineSettings, Verdict};
pub use gate::SecurityGate;
pub use planner::{plan_operation, OperationPlan};
pub use report::{explain, EngineStatus};
