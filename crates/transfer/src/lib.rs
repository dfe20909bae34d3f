//! Chunk sequencing for chunked uploads.
//!
//! A [`ChunkSequencer`] owns the upload stream and hands out sequential
//! chunks to any number of concurrent workers, while collecting the
//! per-chunk SHA-512 digests those workers report back.

mod chunked;
mod types;

pub use chunked::{ChunkSequencer, checksum_bytes};
pub use types::{Chunk, LastChunk};

/// Default chunk size: 4 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("stream read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("stream ended with {remaining} bytes still expected")]
    Truncated { remaining: u64 },
}
