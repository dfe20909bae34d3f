use std::collections::BTreeMap;
use std::io::{ErrorKind, Read};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha512};
use tracing::debug;

use crate::types::{Chunk, LastChunk};
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-512 of `data` and returns the lowercase hex digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// ChunkSequencer
// ---------------------------------------------------------------------------

/// Hands out sequential chunks of a stream to concurrent workers.
///
/// Two independent locks guard disjoint state: one for the stream and its
/// counters, one for the digest map. No method holds both at once, so a
/// slow digest or upload never waits behind the next read.
///
/// A sequencer covers exactly one pass over its stream. After a failure the
/// caller builds a new one.
pub struct ChunkSequencer<R> {
    stream: Mutex<StreamState<R>>,
    digests: Mutex<BTreeMap<usize, String>>,
}

struct StreamState<R> {
    source: R,
    chunk_size: usize,
    remaining: u64,
    chunk_index: usize,
    last_chunk: Option<Vec<u8>>,
}

impl<R: Read> ChunkSequencer<R> {
    /// Takes ownership of `source`, which must yield `total_size` bytes.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(source: R, total_size: u64, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            stream: Mutex::new(StreamState {
                source,
                chunk_size,
                remaining: total_size,
                chunk_index: 0,
                last_chunk: None,
            }),
            digests: Mutex::new(BTreeMap::new()),
        }
    }

    /// Reads the next chunk.
    ///
    /// Returns the empty chunk once the stream is exhausted. A final chunk
    /// shorter than the chunk size is normal; a stream that ends while bytes
    /// are still expected fails with [`TransferError::Truncated`].
    pub fn next_chunk(&self) -> Result<Chunk, TransferError> {
        let mut state = lock(&self.stream);
        if state.remaining == 0 {
            return Ok(Chunk::default());
        }

        state.chunk_index += 1;
        let index = state.chunk_index;
        // Never read past the declared size.
        let want = state.remaining.min(state.chunk_size as u64) as usize;
        let mut buf = vec![0u8; want];
        let n = read_full(&mut state.source, &mut buf)?;
        if n == 0 {
            return Err(TransferError::Truncated {
                remaining: state.remaining,
            });
        }
        buf.truncate(n);

        state.remaining -= n as u64;
        if state.remaining == 0 {
            state.last_chunk = Some(buf.clone());
        }
        debug!(
            chunk = index,
            size = n,
            remaining = state.remaining,
            "chunk read"
        );

        Ok(Chunk {
            index,
            data: buf,
            remaining: state.remaining,
        })
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> u64 {
        lock(&self.stream).remaining
    }

    /// Configured chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        lock(&self.stream).chunk_size
    }

    /// The retained final chunk and the total chunk count.
    ///
    /// `None` until the stream has been read to the end.
    pub fn last_chunk(&self) -> Option<LastChunk> {
        let state = lock(&self.stream);
        state.last_chunk.as_ref().map(|data| LastChunk {
            data: data.clone(),
            chunk_count: state.chunk_index,
        })
    }
}

impl<R> ChunkSequencer<R> {
    /// Records the digest of an acknowledged chunk, replacing any earlier
    /// digest for the same index.
    pub fn record_digest(&self, index: usize, digest: impl Into<String>) {
        lock(&self.digests).insert(index, digest.into());
    }

    /// Concatenates the recorded digests in ascending chunk order.
    ///
    /// The result depends only on which (index, digest) pairs were
    /// recorded, never on the order workers reported them.
    pub fn final_digest(&self) -> String {
        lock(&self.digests).values().map(String::as_str).collect()
    }

    /// Number of digests recorded so far.
    pub fn recorded(&self) -> usize {
        lock(&self.digests).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fills `buf` unless the stream ends first; returns the bytes read.
fn read_full(source: &mut impl Read, buf: &mut [u8]) -> Result<usize, TransferError> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
