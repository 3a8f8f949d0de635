//! Log error types.

use thiserror::Error;

/// Result type for segment operations.
pub type SegmentResult<T> = Result<T, SegmentError>;

/// Errors raised by a single segment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// Not enough free capacity for the entry.
    #[error("segment full: {needed} bytes needed, {free} free")]
    Full { needed: usize, free: usize },

    /// The segment has been closed; appends are no longer allowed.
    #[error("segment closed")]
    Closed,

    /// An entry failed framing or checksum validation.
    #[error("corrupt entry at offset {offset}: {reason}")]
    Corrupt { offset: usize, reason: String },
}

/// Result type for whole-log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors raised by the append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The configured log capacity is spent; no further segment can be
    /// allocated.
    #[error("log exhausted: {segments} segments of {segment_bytes} bytes in use")]
    Exhausted {
        segments: usize,
        segment_bytes: usize,
    },

    /// The entry cannot fit into any segment, even an empty one.
    #[error("entry of {payload} bytes exceeds segment capacity {segment_bytes}")]
    EntryTooLarge {
        payload: usize,
        segment_bytes: usize,
    },
}
