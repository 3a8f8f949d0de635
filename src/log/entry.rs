//! Log entry types and their byte layout.
//!
//! Every live object and every tombstone lives inside exactly one log
//! segment, serialized with the layouts below. All integers are
//! little-endian; variable data is length-prefixed.
//!
//! Object payload:
//!
//! ```text
//! +------------------+
//! | Table ID         | (u64 LE)
//! +------------------+
//! | Object ID        | (u64 LE)
//! +------------------+
//! | Version          | (u64 LE)
//! +------------------+
//! | Data             | (length-prefixed bytes, u32 LE)
//! +------------------+
//! ```
//!
//! Tombstone payload: table id, object id, the version of the deleted
//! object, and the id of the segment that held it (all u64 LE).

use std::io::{self, Read};

/// Kinds of entries a segment can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryKind {
    /// A live object record.
    Object = 0,
    /// A deletion marker carrying the deleted object's version.
    Tombstone = 1,
}

impl EntryKind {
    /// Convert from u8, returns None for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(EntryKind::Object),
            1 => Some(EntryKind::Tombstone),
            _ => None,
        }
    }

    /// Convert to u8.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A live object as stored in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Owning table.
    pub table_id: u64,
    /// Object id within the table.
    pub object_id: u64,
    /// Version at the time of the write.
    pub version: u64,
    /// Object value.
    pub data: Vec<u8>,
}

impl ObjectRecord {
    /// Create a new object record.
    pub fn new(table_id: u64, object_id: u64, version: u64, data: Vec<u8>) -> Self {
        Self {
            table_id,
            object_id,
            version,
            data,
        }
    }

    /// Serialize to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 8 + 8 + 4 + self.data.len());
        buf.extend_from_slice(&self.table_id.to_le_bytes());
        buf.extend_from_slice(&self.object_id.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Deserialize from bytes into an owned record.
    pub fn deserialize(data: &[u8]) -> io::Result<Self> {
        let view = ObjectView::parse(data)?;
        Ok(Self {
            table_id: view.table_id,
            object_id: view.object_id,
            version: view.version,
            data: view.data.to_vec(),
        })
    }
}

/// Borrowed parse of a serialized object record.
///
/// The read path serves object data straight out of log storage, so the
/// value bytes stay borrowed instead of being copied per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectView<'a> {
    pub table_id: u64,
    pub object_id: u64,
    pub version: u64,
    pub data: &'a [u8],
}

impl<'a> ObjectView<'a> {
    /// Parse a serialized object record without copying the value.
    pub fn parse(bytes: &'a [u8]) -> io::Result<Self> {
        if bytes.len() < 8 + 8 + 8 + 4 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "object record too short",
            ));
        }
        let table_id = u64::from_le_bytes(bytes[0..8].try_into().expect("8 bytes"));
        let object_id = u64::from_le_bytes(bytes[8..16].try_into().expect("8 bytes"));
        let version = u64::from_le_bytes(bytes[16..24].try_into().expect("8 bytes"));
        let data_len = u32::from_le_bytes(bytes[24..28].try_into().expect("4 bytes")) as usize;
        if bytes.len() < 28 + data_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "object record truncated: expected {} data bytes, got {}",
                    data_len,
                    bytes.len() - 28
                ),
            ));
        }
        Ok(Self {
            table_id,
            object_id,
            version,
            data: &bytes[28..28 + data_len],
        })
    }
}

/// A deletion marker as stored in the log.
///
/// `version` is the version of the object being deleted; `segment_id`
/// identifies the segment containing the superseded object, kept for the
/// log cleaner's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TombstoneRecord {
    pub table_id: u64,
    pub object_id: u64,
    pub version: u64,
    pub segment_id: u64,
}

impl TombstoneRecord {
    /// Create a new tombstone record.
    pub fn new(table_id: u64, object_id: u64, version: u64, segment_id: u64) -> Self {
        Self {
            table_id,
            object_id,
            version,
            segment_id,
        }
    }

    /// Serialize to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        buf.extend_from_slice(&self.table_id.to_le_bytes());
        buf.extend_from_slice(&self.object_id.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.segment_id.to_le_bytes());
        buf
    }

    /// Deserialize from bytes.
    pub fn deserialize(data: &[u8]) -> io::Result<Self> {
        let mut cursor = io::Cursor::new(data);
        let mut field = [0u8; 8];

        cursor.read_exact(&mut field)?;
        let table_id = u64::from_le_bytes(field);
        cursor.read_exact(&mut field)?;
        let object_id = u64::from_le_bytes(field);
        cursor.read_exact(&mut field)?;
        let version = u64::from_le_bytes(field);
        cursor.read_exact(&mut field)?;
        let segment_id = u64::from_le_bytes(field);

        Ok(Self {
            table_id,
            object_id,
            version,
            segment_id,
        })
    }
}
