//! Client-facing master errors and their stable status codes.

use thiserror::Error;

use crate::log::LogError;
use super::VERSION_NONEXISTENT;

/// Stable numeric status codes surfaced on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    Ok = 0,
    TableDoesntExist = 1,
    ObjectDoesntExist = 2,
    ObjectExists = 3,
    WrongVersion = 4,
    SegmentRecoveryFailed = 5,
    TransportError = 6,
    InternalError = 7,
}

impl Status {
    /// The numeric code. These values are part of the wire contract and
    /// never change.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// String form of the code, for log and error bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::TableDoesntExist => "TABLE_DOESNT_EXIST",
            Status::ObjectDoesntExist => "OBJECT_DOESNT_EXIST",
            Status::ObjectExists => "OBJECT_EXISTS",
            Status::WrongVersion => "WRONG_VERSION",
            Status::SegmentRecoveryFailed => "SEGMENT_RECOVERY_FAILED",
            Status::TransportError => "TRANSPORT_ERROR",
            Status::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Result type for master operations.
pub type MasterResult<T> = Result<T, MasterError>;

/// Errors surfaced by the request handlers and the recovery engine.
///
/// Reject errors carry the version observed at evaluation time so the
/// client can react; it is `VERSION_NONEXISTENT` when the object was
/// absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MasterError {
    /// No tablet on this master covers the key's table.
    #[error("table {table_id} does not exist")]
    TableDoesntExist { table_id: u64 },

    /// The object does not exist (or a reject rule required absence).
    #[error("object does not exist")]
    ObjectDoesntExist { version: u64 },

    /// A reject rule required the object to be absent, but it exists.
    #[error("object exists at version {version}")]
    ObjectExists { version: u64 },

    /// A version-based reject rule fired.
    #[error("wrong version: object at version {version}")]
    WrongVersion { version: u64 },

    /// Every advertised backup for some segment failed during recovery.
    #[error("segment {segment_id} could not be recovered from any backup")]
    SegmentRecoveryFailed { segment_id: u64 },

    /// A consumed-protocol call never completed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MasterError {
    /// The stable status code for this error.
    pub fn status(&self) -> Status {
        match self {
            MasterError::TableDoesntExist { .. } => Status::TableDoesntExist,
            MasterError::ObjectDoesntExist { .. } => Status::ObjectDoesntExist,
            MasterError::ObjectExists { .. } => Status::ObjectExists,
            MasterError::WrongVersion { .. } => Status::WrongVersion,
            MasterError::SegmentRecoveryFailed { .. } => Status::SegmentRecoveryFailed,
            MasterError::Transport(_) => Status::TransportError,
            MasterError::Internal(_) => Status::InternalError,
        }
    }

    /// The version observed when the error was raised, for errors that
    /// report one.
    pub fn version(&self) -> Option<u64> {
        match self {
            MasterError::ObjectDoesntExist { version }
            | MasterError::ObjectExists { version }
            | MasterError::WrongVersion { version } => Some(*version),
            MasterError::TableDoesntExist { .. } => Some(VERSION_NONEXISTENT),
            _ => None,
        }
    }
}

impl From<LogError> for MasterError {
    fn from(e: LogError) -> Self {
        MasterError::Internal(e.to_string())
    }
}
