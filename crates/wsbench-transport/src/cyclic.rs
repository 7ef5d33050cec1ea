use crate::error::{Result, TransportError};

/// Fixed-capacity byte store with independent write and read cursors.
///
/// Writes land at the write cursor and wrap modulo capacity, so once the
/// buffer is full the oldest bytes are overwritten. Reads serve the captured
/// bytes from the read cursor and wrap back to offset 0 when they reach the
/// end of the captured region: the same bytes are replayed indefinitely.
///
/// The storage is allocated once at construction and never grows.
pub struct CyclicBuffer {
    storage: Box<[u8]>,
    /// Number of captured bytes, `<= storage.len()`.
    len: usize,
    write_pos: usize,
    read_pos: usize,
}

impl CyclicBuffer {
    /// Create an empty buffer able to capture `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TransportError::ZeroCapacity);
        }
        Ok(Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            write_pos: 0,
            read_pos: 0,
        })
    }

    /// Create a full buffer holding a copy of `template`.
    pub fn from_template(template: &[u8]) -> Result<Self> {
        if template.is_empty() {
            return Err(TransportError::EmptyTemplate);
        }
        Ok(Self {
            storage: template.to_vec().into_boxed_slice(),
            len: template.len(),
            write_pos: 0,
            read_pos: 0,
        })
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of captured bytes available for replay.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current read offset within the captured region.
    pub fn read_position(&self) -> usize {
        self.read_pos
    }

    /// The captured bytes in storage order.
    pub fn captured(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    /// Copy `src` in at the write cursor. Always accepts the whole slice.
    pub fn write(&mut self, mut src: &[u8]) -> usize {
        let accepted = src.len();
        let capacity = self.storage.len();

        while !src.is_empty() {
            let n = src.len().min(capacity - self.write_pos);
            self.storage[self.write_pos..self.write_pos + n].copy_from_slice(&src[..n]);
            self.write_pos = (self.write_pos + n) % capacity;
            self.len = (self.len + n).min(capacity);
            src = &src[n..];
        }

        accepted
    }

    /// Borrow up to `max` bytes from the read cursor and advance past them.
    ///
    /// Never crosses the end of the captured region in one call; the next call
    /// starts again at offset 0. Returns an empty slice without moving the
    /// cursor when `max == 0` or nothing has been captured.
    pub fn next_chunk(&mut self, max: usize) -> &[u8] {
        if max == 0 || self.len == 0 {
            return &[];
        }

        let start = self.read_pos;
        let n = max.min(self.len - start);
        self.read_pos = (start + n) % self.len;
        &self.storage[start..start + n]
    }

    /// Copy up to `dst.len()` bytes from the read cursor into `dst`.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let chunk = self.next_chunk(dst.len());
        let n = chunk.len();
        dst[..n].copy_from_slice(chunk);
        n
    }

    /// Move the read cursor back to the start of the captured region.
    pub fn rewind(&mut self) {
        self.read_pos = 0;
    }
}

impl std::fmt::Debug for CyclicBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CyclicBuffer")
            .field("capacity", &self.storage.len())
            .field("len", &self.len)
            .field("write_pos", &self.write_pos)
            .field("read_pos", &self.read_pos)
            .finish()
    }
}
