//! Scatter/gather byte container for the read path.
//!
//! A `Buffer` presents a logically linear byte range assembled from
//! discontiguous chunks, so a value can travel from log storage to the wire
//! without being copied along the way. Chunks are borrowed slices; the
//! buffer owns only its chunk list and the arena copies that `get_range`
//! produces when a requested range straddles chunk boundaries.

/// An ordered collection of borrowed byte chunks.
///
/// The buffer must not outlive the memory its chunks point into; in practice
/// chunks borrow from log segments, which outlive any in-flight request.
#[derive(Debug, Default)]
pub struct Buffer<'a> {
    chunks: Vec<&'a [u8]>,
    total_len: usize,
    arenas: Vec<Vec<u8>>,
}

impl<'a> Buffer<'a> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            total_len: 0,
            arenas: Vec::new(),
        }
    }

    /// Create a buffer holding a single chunk.
    pub fn with_chunk(chunk: &'a [u8]) -> Self {
        let mut buffer = Self::new();
        buffer.append(chunk);
        buffer
    }

    /// Add a chunk at the front of the buffer.
    pub fn prepend(&mut self, chunk: &'a [u8]) {
        self.total_len += chunk.len();
        self.chunks.insert(0, chunk);
    }

    /// Add a chunk at the back of the buffer.
    pub fn append(&mut self, chunk: &'a [u8]) {
        self.total_len += chunk.len();
        self.chunks.push(chunk);
    }

    /// Total number of bytes across all chunks.
    pub fn total_length(&self) -> usize {
        self.total_len
    }

    /// Number of chunks currently in the buffer.
    pub fn number_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Return the contiguous run of bytes starting at `offset`, up to the
    /// end of the chunk containing it. Returns `None` past the end.
    pub fn peek(&self, offset: usize) -> Option<&'a [u8]> {
        let (chunk, chunk_offset) = self.find_chunk(offset)?;
        Some(&self.chunks[chunk][chunk_offset..])
    }

    /// Return `length` contiguous bytes starting at `offset`.
    ///
    /// If the range lies within one chunk the slice is returned directly;
    /// otherwise the bytes are copied into an internal arena that lives as
    /// long as the buffer. Returns `None` if the range runs past the end.
    pub fn get_range(&mut self, offset: usize, length: usize) -> Option<&[u8]> {
        if offset + length > self.total_len {
            return None;
        }
        if length == 0 {
            return Some(&[]);
        }
        let (chunk, chunk_offset) = self.find_chunk(offset)?;
        if chunk_offset + length <= self.chunks[chunk].len() {
            return Some(&self.chunks[chunk][chunk_offset..chunk_offset + length]);
        }

        let mut arena = Vec::with_capacity(length);
        let mut remaining = length;
        let mut chunk = chunk;
        let mut chunk_offset = chunk_offset;
        while remaining > 0 {
            let run = &self.chunks[chunk][chunk_offset..];
            let take = run.len().min(remaining);
            arena.extend_from_slice(&run[..take]);
            remaining -= take;
            chunk += 1;
            chunk_offset = 0;
        }
        self.arenas.push(arena);
        Some(self.arenas.last().expect("arena just pushed").as_slice())
    }

    /// Copy up to `length` bytes starting at `offset` into `dst`, returning
    /// the number of bytes actually copied. The copy is truncated by the end
    /// of the buffer and by the size of `dst`.
    pub fn copy(&self, offset: usize, length: usize, dst: &mut [u8]) -> usize {
        let mut copied = 0;
        let limit = length.min(dst.len());
        let mut offset = offset;
        while copied < limit {
            let Some(run) = self.peek(offset) else { break };
            let take = run.len().min(limit - copied);
            dst[copied..copied + take].copy_from_slice(&run[..take]);
            copied += take;
            offset += take;
        }
        copied
    }

    /// Iterate over the chunks in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.chunks.iter().copied()
    }

    /// Collect the whole buffer into one owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Locate the chunk containing `offset`, returning its index and the
    /// offset within it. `None` if `offset` is at or past the end.
    fn find_chunk(&self, offset: usize) -> Option<(usize, usize)> {
        let mut skipped = 0;
        for (index, chunk) in self.chunks.iter().enumerate() {
            if offset < skipped + chunk.len() {
                return Some((index, offset - skipped));
            }
            skipped += chunk.len();
        }
        None
    }
}
