//! Fixed-capacity log segments.
//!
//! A segment is a bounded byte region with an append cursor and an
//! irreversible closed flag. Entries are framed as:
//!
//! ```text
//! +------------------+
//! | Kind             | (u8)
//! +------------------+
//! | Payload Length   | (u32 LE)
//! +------------------+
//! | Payload          | (variable)
//! +------------------+
//! | Checksum         | (u32 LE, crc32 over kind + length + payload)
//! +------------------+
//! ```
//!
//! A successful append returns the payload's offset, which stays valid and
//! byte-stable until the segment is freed.

use super::entry::EntryKind;
use super::errors::{SegmentError, SegmentResult};

/// Framing overhead per entry: kind byte, payload length, checksum.
pub const ENTRY_OVERHEAD: usize = 1 + 4 + 4;

const HEADER_LEN: usize = 1 + 4;

/// A fixed-capacity region of the append-only log.
#[derive(Debug)]
pub struct Segment {
    id: u64,
    capacity: usize,
    data: Vec<u8>,
    closed: bool,
}

impl Segment {
    /// Create an empty open segment.
    pub fn new(id: u64, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            data: Vec::with_capacity(capacity),
            closed: false,
        }
    }

    /// Adopt a fully written segment image, e.g. recovery bytes fetched
    /// from a backup. The segment is closed and iterable.
    pub fn from_bytes(id: u64, bytes: Vec<u8>) -> Self {
        Self {
            id,
            capacity: bytes.len(),
            data: bytes,
            closed: true,
        }
    }

    /// Segment id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Bytes appended so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remaining capacity in bytes.
    pub fn free_bytes(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Whether the segment has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Append an entry, returning the offset of its payload.
    ///
    /// Fails with `Full` when the remaining capacity cannot hold the framed
    /// entry, and with `Closed` once `close` has been called.
    pub fn append(&mut self, kind: EntryKind, payload: &[u8]) -> SegmentResult<u32> {
        if self.closed {
            return Err(SegmentError::Closed);
        }
        let needed = ENTRY_OVERHEAD + payload.len();
        if needed > self.free_bytes() {
            return Err(SegmentError::Full {
                needed,
                free: self.free_bytes(),
            });
        }

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&[kind.as_u8()]);
        hasher.update(&(payload.len() as u32).to_le_bytes());
        hasher.update(payload);
        let checksum = hasher.finalize();

        self.data.push(kind.as_u8());
        self.data
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        let payload_offset = self.data.len() as u32;
        self.data.extend_from_slice(payload);
        self.data.extend_from_slice(&checksum.to_le_bytes());

        Ok(payload_offset)
    }

    /// Mark the segment immutable. Irreversible.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Resolve a payload previously returned by `append`.
    ///
    /// An out-of-bounds reference means an index entry outlived its
    /// segment, which is a programming error.
    pub fn payload(&self, offset: u32, length: u32) -> &[u8] {
        let start = offset as usize;
        let end = start + length as usize;
        assert!(
            end <= self.data.len(),
            "dangling log reference: segment {} holds {} bytes, entry ends at {}",
            self.id,
            self.data.len(),
            end
        );
        &self.data[start..end]
    }

    /// Iterate entries in append order, verifying checksums.
    pub fn entries(&self) -> EntryIter<'_> {
        EntryIter {
            data: &self.data,
            pos: 0,
        }
    }

    /// The raw segment image, as shipped to backups.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// One decoded entry yielded by [`EntryIter`].
#[derive(Debug, Clone, Copy)]
pub struct SegmentEntry<'a> {
    /// Entry kind tag.
    pub kind: EntryKind,
    /// Offset of the payload within the segment.
    pub payload_offset: u32,
    /// The payload bytes.
    pub payload: &'a [u8],
}

/// Iterator over a segment's entries in append order.
#[derive(Debug)]
pub struct EntryIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for EntryIter<'a> {
    type Item = SegmentResult<SegmentEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos == self.data.len() {
            return None;
        }
        let start = self.pos;
        if self.data.len() - start < HEADER_LEN {
            self.pos = self.data.len();
            return Some(Err(SegmentError::Corrupt {
                offset: start,
                reason: "truncated entry header".to_string(),
            }));
        }

        let kind_byte = self.data[start];
        let length = u32::from_le_bytes(
            self.data[start + 1..start + 5]
                .try_into()
                .expect("4 bytes"),
        ) as usize;
        let payload_offset = start + HEADER_LEN;
        let checksum_offset = payload_offset + length;
        if checksum_offset + 4 > self.data.len() {
            self.pos = self.data.len();
            return Some(Err(SegmentError::Corrupt {
                offset: start,
                reason: format!("truncated entry: {} payload bytes claimed", length),
            }));
        }

        let Some(kind) = EntryKind::from_u8(kind_byte) else {
            self.pos = self.data.len();
            return Some(Err(SegmentError::Corrupt {
                offset: start,
                reason: format!("unknown entry kind {}", kind_byte),
            }));
        };

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.data[start..checksum_offset]);
        let computed = hasher.finalize();
        let stored = u32::from_le_bytes(
            self.data[checksum_offset..checksum_offset + 4]
                .try_into()
                .expect("4 bytes"),
        );
        if computed != stored {
            self.pos = self.data.len();
            return Some(Err(SegmentError::Corrupt {
                offset: start,
                reason: format!(
                    "checksum mismatch: computed {:08x}, stored {:08x}",
                    computed, stored
                ),
            }));
        }

        self.pos = checksum_offset + 4;
        Some(Ok(SegmentEntry {
            kind,
            payload_offset: payload_offset as u32,
            payload: &self.data[payload_offset..checksum_offset],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_resolve() {
        let mut segment = Segment::new(1, 1024);
        let offset = segment.append(EntryKind::Object, b"payload").unwrap();
        assert_eq!(segment.payload(offset, 7), b"payload");
    }

    #[test]
    fn test_append_full() {
        let mut segment = Segment::new(1, ENTRY_OVERHEAD + 4);
        segment.append(EntryKind::Object, b"1234").unwrap();
        let err = segment.append(EntryKind::Object, b"x").unwrap_err();
        assert!(matches!(err, SegmentError::Full { .. }));
    }

    #[test]
    fn test_append_after_close() {
        let mut segment = Segment::new(1, 1024);
        segment.close();
        assert_eq!(
            segment.append(EntryKind::Object, b"x"),
            Err(SegmentError::Closed)
        );
    }

    #[test]
    fn test_entries_in_append_order() {
        let mut segment = Segment::new(1, 1024);
        segment.append(EntryKind::Object, b"first").unwrap();
        segment.append(EntryKind::Tombstone, b"second").unwrap();
        segment.close();

        let entries: Vec<_> = segment.entries().map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, EntryKind::Object);
        assert_eq!(entries[0].payload, b"first");
        assert_eq!(entries[1].kind, EntryKind::Tombstone);
        assert_eq!(entries[1].payload, b"second");
    }

    #[test]
    fn test_iteration_detects_corruption() {
        let mut segment = Segment::new(1, 1024);
        segment.append(EntryKind::Object, b"payload").unwrap();

        let mut bytes = segment.as_bytes().to_vec();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        let corrupted = Segment::from_bytes(1, bytes);

        let results: Vec<_> = corrupted.entries().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(SegmentError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_iteration_detects_truncation() {
        let mut segment = Segment::new(1, 1024);
        segment.append(EntryKind::Object, b"payload").unwrap();

        let bytes = segment.as_bytes();
        let truncated = Segment::from_bytes(1, bytes[..bytes.len() - 5].to_vec());
        let results: Vec<_> = truncated.entries().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_from_bytes_roundtrip() {
        let mut segment = Segment::new(5, 1024);
        segment.append(EntryKind::Object, b"abc").unwrap();
        segment.close();

        let adopted = Segment::from_bytes(5, segment.as_bytes().to_vec());
        assert!(adopted.is_closed());
        let entries: Vec<_> = adopted.entries().map(|e| e.unwrap()).collect();
        assert_eq!(entries[0].payload, b"abc");
    }

    #[test]
    fn test_payload_offsets_stable_across_appends() {
        let mut segment = Segment::new(1, 1024);
        let first = segment.append(EntryKind::Object, b"first").unwrap();
        segment.append(EntryKind::Object, b"second").unwrap();
        assert_eq!(segment.payload(first, 5), b"first");
    }
}
