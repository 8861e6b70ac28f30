//! Fixed-capacity byte ring used to reassemble stream frames
//!
//! Bytes arrive in arbitrary chunks from `poll()`. The stream manager appends
//! them here, scans for the frame header and consumes whole frames from the
//! front in O(1).

/// Fixed-capacity ring buffer with O(1) advance
pub struct RingBuffer<const N: usize> {
    data: [u8; N],
    head: usize, // next write slot
    tail: usize, // first valid byte
    len: usize,
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: [0u8; N],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Append bytes, returning how many did not fit
    ///
    /// Nothing is overwritten; bytes past capacity are rejected so the caller
    /// can tell an overrun apart from a slow producer.
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let room = N - self.len;
        let accepted = bytes.len().min(room);
        for &b in &bytes[..accepted] {
            self.data[self.head] = b;
            self.head = (self.head + 1) % N;
        }
        self.len += accepted;
        bytes.len() - accepted
    }

    /// Drop `n` bytes from the front
    #[inline]
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.len);
        self.tail = (self.tail + n) % N;
        self.len -= n;
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Byte at logical index from the front
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        if index < self.len {
            Some(self.data[(self.tail + index) % N])
        } else {
            None
        }
    }

    /// Offset of the first occurrence of `byte`
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        (0..self.len).find(|&i| self.data[(self.tail + i) % N] == byte)
    }

    /// Copy `out.len()` bytes starting at logical `start` (handles wraparound)
    ///
    /// Returns false if the range is not fully buffered.
    pub fn copy_to(&self, start: usize, out: &mut [u8]) -> bool {
        if start + out.len() > self.len {
            return false;
        }
        let real_start = (self.tail + start) % N;
        let first = out.len().min(N - real_start);
        out[..first].copy_from_slice(&self.data[real_start..real_start + first]);
        let rest = out.len() - first;
        out[first..].copy_from_slice(&self.data[..rest]);
        true
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
