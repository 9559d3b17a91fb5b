//! File handle object
//!
//! A [`FileHandle`] owns at most one open [`VfsFile`]. Closing is one-way and
//! idempotent; handing the file to a mount empties the handle without
//! closing the file.

use crate::codec::{read_scalar, write_scalar};
use crate::error::FileError;
use crate::format::{FormatError, FormatTag};
use crate::transfer::{read_all_or_n, write_all, PartialWrite};
use crate::vfs::VfsFile;

/// One item of a variadic `read`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRequest {
    /// Up to this many raw bytes
    ByteCount(usize),
    /// One integer in this format
    Scalar(FormatTag),
    /// Everything left in the file
    ReadAll,
}

impl ReadRequest {
    /// Classify a string request: `"a"` (or `"*a"`) reads everything,
    /// anything else is a scalar format. A leading `*` is ignored.
    pub fn parse(request: &str) -> Result<Self, FormatError> {
        let request = request.strip_prefix('*').unwrap_or(request);
        if request == "a" {
            return Ok(ReadRequest::ReadAll);
        }
        FormatTag::parse(request).map(ReadRequest::Scalar)
    }
}

/// One value produced by `read`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadValue {
    /// Raw bytes
    Bytes(Vec<u8>),
    /// A decoded scalar
    Integer(i64),
}

/// A `read` that failed part way: the values produced before the failure
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRead {
    /// Results of the requests that succeeded
    pub values: Vec<ReadValue>,
    /// Failure of the first request that did not
    pub error: FileError,
}

/// Script-visible file handle
#[derive(Debug)]
pub struct FileHandle {
    file: Option<VfsFile>,
    chunk_size: usize,
}

impl FileHandle {
    /// Wrap an open file. `chunk_size` bounds each streaming transfer call.
    pub fn new(file: VfsFile, chunk_size: usize) -> Self {
        FileHandle {
            file: Some(file),
            chunk_size,
        }
    }

    /// Whether the handle still owns a file
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn file(&mut self) -> Result<&mut VfsFile, FileError> {
        self.file.as_mut().ok_or(FileError::Closed)
    }

    /// Give up the file without closing it (ownership moves to the caller)
    pub fn take(&mut self) -> Option<VfsFile> {
        self.file.take()
    }

    /// Put back a file that [`FileHandle::take`] handed out
    pub fn restore(&mut self, file: VfsFile) {
        debug_assert!(self.file.is_none());
        self.file = Some(file);
    }

    /// Close the file. Closing a closed handle succeeds; a failed close still
    /// leaves the handle closed.
    pub fn close(&mut self) -> Result<(), FileError> {
        match self.file.take() {
            Some(file) => file.close().map_err(FileError::vfs("close")),
            None => Ok(()),
        }
    }

    /// End of file reached
    pub fn eof(&mut self) -> Result<bool, FileError> {
        Ok(self.file()?.eof())
    }

    /// Current offset
    pub fn tell(&mut self) -> Result<u64, FileError> {
        self.file()?.tell().map_err(FileError::vfs("tell"))
    }

    /// Total size
    pub fn length(&mut self) -> Result<u64, FileError> {
        self.file()?.length().map_err(FileError::vfs("length"))
    }

    /// Move to an absolute offset
    pub fn seek(&mut self, pos: u64) -> Result<(), FileError> {
        self.file()?.seek(pos).map_err(FileError::vfs("seek"))
    }

    /// Buffer up to `size` bytes of writes
    pub fn set_buffer_size(&mut self, size: u64) -> Result<(), FileError> {
        self.file()?
            .set_buffer(size)
            .map_err(FileError::vfs("bufSize"))
    }

    /// Push buffered writes out
    pub fn flush(&mut self) -> Result<(), FileError> {
        self.file()?.flush().map_err(FileError::vfs("flush"))
    }

    /// Serve one read request
    pub fn read_one(&mut self, request: ReadRequest) -> Result<ReadValue, FileError> {
        let chunk_size = self.chunk_size;
        let file = self.file()?;
        let value = match request {
            ReadRequest::ByteCount(n) => read_all_or_n(file, Some(n), chunk_size).map(ReadValue::Bytes),
            ReadRequest::ReadAll => read_all_or_n(file, None, chunk_size).map(ReadValue::Bytes),
            ReadRequest::Scalar(tag) => read_scalar(file, tag).map(ReadValue::Integer),
        };
        value.map_err(FileError::vfs("read"))
    }

    /// Serve requests left to right, stopping at the first failure
    pub fn read(&mut self, requests: &[ReadRequest]) -> Result<Vec<ReadValue>, PartialRead> {
        let mut values = Vec::with_capacity(requests.len());
        for request in requests {
            match self.read_one(*request) {
                Ok(value) => values.push(value),
                Err(error) => return Err(PartialRead { values, error }),
            }
        }
        Ok(values)
    }

    /// Write each chunk in order. Returns the total written; a short write
    /// reports the total up to the failure.
    pub fn write(&mut self, chunks: &[&[u8]]) -> Result<usize, FileError> {
        let chunk_size = self.chunk_size;
        let file = self.file()?;
        let mut total = 0;
        for chunk in chunks {
            match write_all(file, chunk, chunk_size) {
                Ok(n) => total += n,
                Err(partial) => {
                    return Err(FileError::Write(PartialWrite {
                        error: partial.error,
                        written: total + partial.written,
                    }))
                }
            }
        }
        Ok(total)
    }

    /// Write each value with one format, stopping at the first failure
    pub fn write_typed(&mut self, tag: FormatTag, values: &[i64]) -> Result<(), FileError> {
        let file = self.file()?;
        for (i, value) in values.iter().enumerate() {
            write_scalar(file, tag, *value)
                .map_err(|source| FileError::WriteInt { source, index: i + 1 })?;
        }
        Ok(())
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.close() {
                tracing::warn!(error = %e, "failed to close unreachable file handle");
            }
        }
    }
}
