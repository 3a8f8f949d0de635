//! The master server core: request handlers, reject rules, and recovery.

pub mod errors;
pub mod recovery;
pub mod reject;
pub mod service;

pub use errors::{MasterError, MasterResult, Status};
pub use recovery::RecoveryTransports;
pub use reject::{reject_operation, RejectRules};
pub use service::Master;

/// Version reported in place of a real one when the object does not exist.
pub const VERSION_NONEXISTENT: u64 = 0;
