//! Streaming byte transfer in bounded chunks

use strata_vfs::ErrorCode;
use thiserror::Error;

use crate::vfs::{VfsError, VfsFile};

/// Default chunk size for streaming reads and writes
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// A byte-oriented stream with C-style short transfers.
///
/// Implemented by [`VfsFile`]; the seam lets the codec and transfer logic run
/// against in-memory streams too.
pub trait ByteStream {
    /// Read up to `buf.len()` bytes. `Ok(0)` is end of stream.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, VfsError>;

    /// Write `buf`, returning how many bytes were taken
    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, VfsError>;

    /// Why the last transfer came up short (`fallback` if nobody said)
    fn shortfall(&self, fallback: ErrorCode) -> VfsError;
}

impl ByteStream for VfsFile {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, VfsError> {
        VfsFile::read_bytes(self, buf)
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, VfsError> {
        VfsFile::write_bytes(self, buf)
    }

    fn shortfall(&self, fallback: ErrorCode) -> VfsError {
        VfsFile::shortfall(self, fallback)
    }
}

/// A write that stopped early
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct PartialWrite {
    /// Why it stopped
    pub error: VfsError,
    /// Bytes written before it stopped
    pub written: usize,
}

/// Read `limit` bytes, or everything left when `limit` is `None`.
///
/// Stops early at end of stream and returns what was gathered. A bounded
/// request that gathers nothing at all fails; reading everything from an
/// exhausted stream yields an empty buffer. A zero-byte request succeeds
/// without touching the stream.
pub fn read_all_or_n<S: ByteStream + ?Sized>(
    stream: &mut S,
    limit: Option<usize>,
    chunk_size: usize,
) -> Result<Vec<u8>, VfsError> {
    let chunk_size = chunk_size.max(1);
    let mut out = Vec::new();
    let mut remain = limit.unwrap_or(usize::MAX);

    while remain > 0 {
        let want = remain.min(chunk_size);
        let start = out.len();
        out.resize(start + want, 0);
        match stream.read_bytes(&mut out[start..]) {
            Ok(n) if n > 0 => {
                out.truncate(start + n);
                remain -= n;
            }
            Ok(_) => {
                out.truncate(start);
                if start == 0 && limit.is_some() {
                    return Err(stream.shortfall(ErrorCode::PastEof));
                }
                break;
            }
            Err(e) => {
                out.truncate(start);
                if start == 0 {
                    return Err(e);
                }
                tracing::debug!(error = %e, kept = start, "read stopped early");
                break;
            }
        }
    }
    Ok(out)
}

/// Write all of `data`, in chunks of at most `chunk_size` bytes.
///
/// Fails at the first chunk the stream does not fully take, reporting the
/// running total.
pub fn write_all<S: ByteStream + ?Sized>(
    stream: &mut S,
    data: &[u8],
    chunk_size: usize,
) -> Result<usize, PartialWrite> {
    let chunk_size = chunk_size.max(1);
    let mut written = 0;
    for chunk in data.chunks(chunk_size) {
        match stream.write_bytes(chunk) {
            Ok(n) => {
                written += n;
                if n < chunk.len() {
                    return Err(PartialWrite {
                        error: stream.shortfall(ErrorCode::Io),
                        written,
                    });
                }
            }
            Err(error) => return Err(PartialWrite { error, written }),
        }
    }
    Ok(written)
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory stream for unit tests

    use super::*;

    pub(crate) struct MemStream {
        pub data: Vec<u8>,
        pub pos: usize,
        /// Bytes a write may take before the stream refuses more
        pub capacity: usize,
        /// Largest single read the stream serves
        pub max_read: usize,
    }

    impl MemStream {
        pub(crate) fn new(data: &[u8]) -> Self {
            MemStream {
                data: data.to_vec(),
                pos: 0,
                capacity: usize::MAX,
                max_read: usize::MAX,
            }
        }
    }

    impl ByteStream for MemStream {
        fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, VfsError> {
            let n = buf.len().min(self.max_read).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, VfsError> {
            let room = self.capacity.saturating_sub(self.data.len());
            let n = buf.len().min(room);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn shortfall(&self, fallback: ErrorCode) -> VfsError {
            VfsError::new(fallback)
        }
    }
}
