/// A chunk handed out by the sequencer.
///
/// The empty chunk (index 0, no data) signals that the stream is fully
/// consumed; it is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based chunk number.
    pub index: usize,
    /// Raw chunk bytes.
    pub data: Vec<u8>,
    /// Bytes still unread after this chunk.
    pub remaining: u64,
}

impl Chunk {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True for the chunk that brought `remaining` to zero.
    pub fn is_last(&self) -> bool {
        !self.data.is_empty() && self.remaining == 0
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// The final chunk, retained once the stream is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastChunk {
    pub data: Vec<u8>,
    /// Index of the final chunk, which is also the total chunk count.
    pub chunk_count: usize,
}
