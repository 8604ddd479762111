pub mod allowlist;
pub mod classifier;
pub mod network;
pub mod profile;

pub use allowlist::{AllowlistEntry, AllowlistMatcher, AllowlistSnapshot};
pub use classifier::{classify, classify_action, classify_target_type, extract_targets};
pub use network::{IpNetwork, NetworkParseError};
pub use profile::{recommend_profile, suggestions_for, Profile};
