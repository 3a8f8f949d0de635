//! The backup protocol this master consumes during recovery.
//!
//! Backups hold replicas of closed log segments. Recovery asks each backup
//! to start filtering its segments for the crashed master, then pulls the
//! per-partition recovery data segment by segment. Transport is abstracted
//! behind [`BackupClient`] so the engine can run against mock backups in
//! tests and a real transport in production.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::TabletDescriptor;

/// Result type for backup calls.
pub type BackupResult<T> = Result<T, BackupError>;

/// Failures a backup call can report.
///
/// A timed-out fetch surfaces as `Transport` and is treated identically to
/// an explicit failure: the engine falls through to the next backup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackupError {
    /// The backup does not hold the requested segment.
    #[error("bad segment id")]
    BadSegmentId,

    /// The call never completed.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// One advertised `(backup, segment)` pair in a recovery request.
///
/// The list a recovery receives is redundant: the same `segment_id` may be
/// advertised by several backups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// Locator the transport can dial.
    pub service_locator: String,
    /// Id of the crashed master whose segment this is.
    pub server_id: u64,
    /// The advertised segment.
    pub segment_id: u64,
}

/// Client side of the backup protocol.
pub trait BackupClient {
    /// Ask a backup to start reading the crashed master's segments and
    /// filter them by tablet. Idempotent on the backup side.
    fn start_reading_data(
        &mut self,
        locator: &str,
        master_id: u64,
        tablets: &[TabletDescriptor],
    ) -> BackupResult<()>;

    /// Fetch the recovery data for one segment: the bytes of every object
    /// and tombstone belonging to the given partition.
    fn get_recovery_data(
        &mut self,
        locator: &str,
        master_id: u64,
        segment_id: u64,
        partition_id: u64,
        tablets: &[TabletDescriptor],
    ) -> BackupResult<Vec<u8>>;
}
