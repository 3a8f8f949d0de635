//! The coordinator protocol this master consumes.
//!
//! The coordinator assigns tablets and tracks cluster membership. The
//! master only ever initiates two calls: enlisting itself at startup and
//! reporting a completed recovery.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::TabletDescriptor;

/// Result type for coordinator calls.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Failures a coordinator call can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// The call never completed.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// What kind of server is enlisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    Master,
    Backup,
}

/// Client side of the coordinator protocol.
pub trait CoordinatorClient {
    /// Register this server; returns the server id the coordinator
    /// assigned.
    fn enlist_server(&mut self, kind: ServerKind, locator: &str) -> CoordinatorResult<u64>;

    /// Report that the given tablets have been recovered and are now
    /// served by this master.
    fn tablets_recovered(
        &mut self,
        master_id: u64,
        tablets: &[TabletDescriptor],
    ) -> CoordinatorResult<()>;
}
