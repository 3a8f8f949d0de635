//! The append-only in-memory log.
//!
//! The log exclusively owns all record bytes. It is partitioned into
//! fixed-capacity segments; when the head segment cannot hold an entry it
//! is closed and a fresh one is opened, so callers never observe a full
//! segment. References returned by `append` stay valid for the lifetime of
//! the segment they point into.

pub mod entry;
pub mod errors;
pub mod segment;

pub use entry::{EntryKind, ObjectRecord, ObjectView, TombstoneRecord};
pub use errors::{LogError, LogResult, SegmentError};
pub use segment::{Segment, SegmentEntry, ENTRY_OVERHEAD};

use std::collections::HashMap;

/// Stable location of an entry payload inside the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRef {
    /// Segment holding the entry.
    pub segment_id: u64,
    /// Payload offset within the segment.
    pub offset: u32,
    /// Payload length.
    pub length: u32,
}

/// Append-only log made of fixed-capacity segments.
#[derive(Debug)]
pub struct Log {
    segment_capacity: usize,
    max_segments: usize,
    segments: HashMap<u64, Segment>,
    head_id: u64,
    next_id: u64,
}

impl Log {
    /// Create a log with the given per-segment and total byte capacities.
    pub fn new(segment_capacity: usize, total_capacity: usize) -> Self {
        let max_segments = (total_capacity / segment_capacity).max(1);
        let head = Segment::new(0, segment_capacity);
        let mut segments = HashMap::new();
        segments.insert(0, head);
        Self {
            segment_capacity,
            max_segments,
            segments,
            head_id: 0,
            next_id: 1,
        }
    }

    /// Append an entry, rotating to a new segment when the head is full.
    pub fn append(&mut self, kind: EntryKind, payload: &[u8]) -> LogResult<LogRef> {
        if ENTRY_OVERHEAD + payload.len() > self.segment_capacity {
            return Err(LogError::EntryTooLarge {
                payload: payload.len(),
                segment_bytes: self.segment_capacity,
            });
        }

        let head = self
            .segments
            .get_mut(&self.head_id)
            .expect("head segment always present");
        match head.append(kind, payload) {
            Ok(offset) => Ok(LogRef {
                segment_id: self.head_id,
                offset,
                length: payload.len() as u32,
            }),
            Err(SegmentError::Full { .. }) | Err(SegmentError::Closed) => {
                self.rotate()?;
                let head = self
                    .segments
                    .get_mut(&self.head_id)
                    .expect("head segment always present");
                let offset = head
                    .append(kind, payload)
                    .expect("fresh segment accepts any entry that fits a segment");
                Ok(LogRef {
                    segment_id: self.head_id,
                    offset,
                    length: payload.len() as u32,
                })
            }
            Err(SegmentError::Corrupt { .. }) => unreachable!("append never reports corruption"),
        }
    }

    /// Resolve a reference to its payload bytes.
    ///
    /// A reference into a freed segment is a programming error.
    pub fn entry_payload(&self, log_ref: LogRef) -> &[u8] {
        let segment = self
            .segments
            .get(&log_ref.segment_id)
            .unwrap_or_else(|| panic!("dangling log reference: segment {} freed", log_ref.segment_id));
        segment.payload(log_ref.offset, log_ref.length)
    }

    /// Close the head segment so the next append rotates.
    pub fn close_head(&mut self) {
        if let Some(head) = self.segments.get_mut(&self.head_id) {
            head.close();
        }
    }

    /// Id of the segment currently accepting appends.
    pub fn head_segment_id(&self) -> u64 {
        self.head_id
    }

    /// Number of segments currently owned by the log.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn rotate(&mut self) -> LogResult<()> {
        if self.segments.len() >= self.max_segments {
            return Err(LogError::Exhausted {
                segments: self.segments.len(),
                segment_bytes: self.segment_capacity,
            });
        }
        if let Some(head) = self.segments.get_mut(&self.head_id) {
            head.close();
        }
        let id = self.next_id;
        self.next_id += 1;
        self.segments.insert(id, Segment::new(id, self.segment_capacity));
        self.head_id = id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_returns_resolvable_ref() {
        let mut log = Log::new(1024, 64 * 1024);
        let log_ref = log.append(EntryKind::Object, b"hello").unwrap();
        assert_eq!(log.entry_payload(log_ref), b"hello");
    }

    #[test]
    fn test_rotation_on_full_segment() {
        let payload = [7u8; 100];
        let mut log = Log::new(ENTRY_OVERHEAD + 100, 64 * 1024);

        let first = log.append(EntryKind::Object, &payload).unwrap();
        let second = log.append(EntryKind::Object, &payload).unwrap();

        assert_ne!(first.segment_id, second.segment_id);
        assert_eq!(log.segment_count(), 2);
        // Both references stay valid after rotation.
        assert_eq!(log.entry_payload(first), &payload[..]);
        assert_eq!(log.entry_payload(second), &payload[..]);
    }

    #[test]
    fn test_entry_too_large() {
        let mut log = Log::new(64, 1024);
        let payload = [0u8; 64];
        assert!(matches!(
            log.append(EntryKind::Object, &payload),
            Err(LogError::EntryTooLarge { .. })
        ));
    }

    #[test]
    fn test_log_exhaustion() {
        let payload = [1u8; 16];
        let segment_bytes = ENTRY_OVERHEAD + 16;
        // Room for exactly two segments.
        let mut log = Log::new(segment_bytes, segment_bytes * 2);

        log.append(EntryKind::Object, &payload).unwrap();
        log.append(EntryKind::Object, &payload).unwrap();
        assert!(matches!(
            log.append(EntryKind::Object, &payload),
            Err(LogError::Exhausted { .. })
        ));
    }

    #[test]
    fn test_close_head_rotates_on_next_append() {
        let mut log = Log::new(1024, 64 * 1024);
        let first = log.append(EntryKind::Object, b"a").unwrap();
        log.close_head();
        let second = log.append(EntryKind::Object, b"b").unwrap();
        assert_ne!(first.segment_id, second.segment_id);
    }

    #[test]
    #[should_panic(expected = "dangling log reference")]
    fn test_dangling_reference_panics() {
        let log = Log::new(1024, 64 * 1024);
        log.entry_payload(LogRef {
            segment_id: 99,
            offset: 0,
            length: 1,
        });
    }
}
