//! Open files of the native backend.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use crate::backend::RawFile;
use crate::error::{ErrorCode, ErrorState};

enum Storage {
    Host(File),
    Memory(Cursor<Vec<u8>>),
}

impl Storage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Storage::Host(f) => f.read(buf),
            Storage::Memory(c) => c.read(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Storage::Host(f) => f.write_all(buf),
            Storage::Memory(_) => Err(io::Error::new(
                io::ErrorKind::ReadOnlyFilesystem,
                "archive entries are read-only",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Storage::Host(f) => f.flush(),
            Storage::Memory(_) => Ok(()),
        }
    }

    fn position(&mut self) -> io::Result<u64> {
        match self {
            Storage::Host(f) => f.stream_position(),
            Storage::Memory(c) => Ok(c.position()),
        }
    }

    fn seek(&mut self, pos: u64) -> io::Result<u64> {
        match self {
            Storage::Host(f) => f.seek(SeekFrom::Start(pos)),
            Storage::Memory(c) => c.seek(SeekFrom::Start(pos)),
        }
    }

    fn len(&mut self) -> io::Result<u64> {
        match self {
            Storage::Host(f) => f.metadata().map(|m| m.len()),
            Storage::Memory(c) => Ok(c.get_ref().len() as u64),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

/// A file opened by [`super::NativeFs`].
///
/// Reads come from a host file or from a fully decompressed archive entry.
/// Writes always go to a host file and can be buffered.
pub(crate) struct NativeFile {
    storage: Storage,
    mode: Mode,
    errors: ErrorState,
    buffer: Vec<u8>,
    buffer_size: usize,
}

impl NativeFile {
    pub(crate) fn host_reader(file: File, errors: ErrorState) -> Self {
        Self::new(Storage::Host(file), Mode::Read, errors)
    }

    pub(crate) fn host_writer(file: File, errors: ErrorState) -> Self {
        Self::new(Storage::Host(file), Mode::Write, errors)
    }

    pub(crate) fn memory(data: Vec<u8>, errors: ErrorState) -> Self {
        Self::new(Storage::Memory(Cursor::new(data)), Mode::Read, errors)
    }

    fn new(storage: Storage, mode: Mode, errors: ErrorState) -> Self {
        NativeFile {
            storage,
            mode,
            errors,
            buffer: Vec::new(),
            buffer_size: 0,
        }
    }

    fn fail(&self, code: ErrorCode) -> bool {
        self.errors.set(code);
        false
    }

    fn drain_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let result = self.storage.write_all(&self.buffer);
        self.buffer.clear();
        result
    }
}

impl RawFile for NativeFile {
    fn read_bytes(&mut self, buf: &mut [u8]) -> i64 {
        if self.mode == Mode::Write {
            self.errors.set(ErrorCode::OpenForWriting);
            return -1;
        }
        let mut filled = 0;
        while filled < buf.len() {
            match self.storage.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.errors.set_io(&e);
                    if filled == 0 {
                        return -1;
                    }
                    break;
                }
            }
        }
        filled as i64
    }

    fn write_bytes(&mut self, buf: &[u8]) -> i64 {
        if self.mode == Mode::Read {
            self.errors.set(ErrorCode::OpenForReading);
            return -1;
        }
        if self.buffer_size > 0 {
            if self.buffer.len() + buf.len() > self.buffer_size {
                if let Err(e) = self.drain_buffer() {
                    self.errors.set_io(&e);
                    return -1;
                }
            }
            if buf.len() < self.buffer_size {
                self.buffer.extend_from_slice(buf);
                return buf.len() as i64;
            }
        }
        match self.storage.write_all(buf) {
            Ok(()) => buf.len() as i64,
            Err(e) => {
                self.errors.set_io(&e);
                -1
            }
        }
    }

    fn eof(&mut self) -> bool {
        let pos = self.tell();
        let len = self.length();
        pos >= 0 && len >= 0 && pos >= len
    }

    fn tell(&mut self) -> i64 {
        match self.storage.position() {
            Ok(pos) => (pos + self.buffer.len() as u64) as i64,
            Err(e) => {
                self.errors.set_io(&e);
                -1
            }
        }
    }

    fn seek(&mut self, pos: u64) -> bool {
        if let Err(e) = self.drain_buffer() {
            self.errors.set_io(&e);
            return false;
        }
        if self.mode == Mode::Read {
            match self.storage.len() {
                Ok(len) if pos > len => return self.fail(ErrorCode::PastEof),
                Ok(_) => {}
                Err(e) => {
                    self.errors.set_io(&e);
                    return false;
                }
            }
        }
        match self.storage.seek(pos) {
            Ok(_) => true,
            Err(e) => {
                self.errors.set_io(&e);
                false
            }
        }
    }

    fn length(&mut self) -> i64 {
        match self.storage.len() {
            Ok(len) => {
                // Buffered bytes past the end of the stored data count too
                let pending_end = self
                    .storage
                    .position()
                    .map(|p| p + self.buffer.len() as u64)
                    .unwrap_or(0);
                len.max(pending_end) as i64
            }
            Err(e) => {
                self.errors.set_io(&e);
                -1
            }
        }
    }

    fn set_buffer(&mut self, size: u64) -> bool {
        if let Err(e) = self.drain_buffer() {
            self.errors.set_io(&e);
            return false;
        }
        let Ok(size) = usize::try_from(size) else {
            return self.fail(ErrorCode::InvalidArgument);
        };
        self.buffer_size = size;
        self.buffer = Vec::with_capacity(size.min(1 << 20));
        true
    }

    fn flush(&mut self) -> bool {
        if self.mode == Mode::Read {
            return true;
        }
        match self.drain_buffer().and_then(|_| self.storage.flush()) {
            Ok(()) => true,
            Err(e) => {
                self.errors.set_io(&e);
                false
            }
        }
    }

    fn close(mut self: Box<Self>) -> bool {
        self.flush()
    }

    fn read_to_end(&mut self) -> Option<Vec<u8>> {
        if self.mode == Mode::Write {
            self.errors.set(ErrorCode::OpenForWriting);
            return None;
        }
        let mut out = Vec::new();
        let result = match &mut self.storage {
            Storage::Host(f) => f.read_to_end(&mut out),
            Storage::Memory(c) => c.read_to_end(&mut out),
        };
        match result {
            Ok(_) => Some(out),
            Err(e) => {
                self.errors.set_io(&e);
                None
            }
        }
    }
}

impl Drop for NativeFile {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            if let Err(e) = self.drain_buffer() {
                tracing::warn!(error = %e, "dropping buffered writes");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(data: &[u8]) -> (NativeFile, ErrorState) {
        let errors = ErrorState::new();
        (NativeFile::memory(data.to_vec(), errors.clone()), errors)
    }

    #[test]
    fn test_read_until_eof() {
        let (mut f, _) = memory(b"hello");
        let mut buf = [0u8; 3];
        assert_eq!(f.read_bytes(&mut buf), 3);
        assert!(!f.eof());
        assert_eq!(f.read_bytes(&mut buf), 2);
        assert!(f.eof());
        assert_eq!(f.read_bytes(&mut buf), 0);
    }

    #[test]
    fn test_write_to_reader_fails() {
        let (mut f, errors) = memory(b"x");
        assert_eq!(f.write_bytes(b"y"), -1);
        assert_eq!(errors.take(), ErrorCode::OpenForReading);
    }

    #[test]
    fn test_seek_past_end() {
        let (mut f, errors) = memory(b"abc");
        assert!(f.seek(3));
        assert!(!f.seek(4));
        assert_eq!(errors.take(), ErrorCode::PastEof);
        assert_eq!(f.tell(), 3);
        assert_eq!(f.length(), 3);
    }
}
