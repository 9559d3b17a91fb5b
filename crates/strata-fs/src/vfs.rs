//! Error-snapshotting adapter over the filesystem boundary
//!
//! The backend reports failure through a shared last-error slot that the very
//! next call may overwrite. Every method here reads the slot right after a
//! failing call and returns it as a [`VfsError`], so nothing above this layer
//! touches the slot directly.

use std::fmt;
use std::rc::Rc;

use strata_vfs::{ArchiveInfo, Backend, ErrorCode, RawFile, Stat, Version};
use thiserror::Error;

/// A failed filesystem call: the code read from the slot and its message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct VfsError {
    /// Code read from the last-error slot
    pub code: ErrorCode,
    /// Human readable description
    pub message: String,
}

impl VfsError {
    /// Error for a code
    pub fn new(code: ErrorCode) -> Self {
        VfsError {
            code,
            message: code.description().to_string(),
        }
    }

    /// Error for a code read from the slot, substituting `fallback` when the
    /// slot was empty
    pub fn from_slot(code: ErrorCode, fallback: ErrorCode) -> Self {
        if code == ErrorCode::Ok {
            VfsError::new(fallback)
        } else {
            VfsError::new(code)
        }
    }
}

/// Shared handle on a filesystem backend
#[derive(Clone)]
pub struct Vfs {
    backend: Rc<dyn Backend>,
}

impl fmt::Debug for Vfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vfs")
            .field("initialized", &self.backend.is_init())
            .finish()
    }
}

impl Vfs {
    /// Wrap a backend
    pub fn new(backend: Rc<dyn Backend>) -> Self {
        Vfs { backend }
    }

    fn error(&self) -> VfsError {
        VfsError::from_slot(self.backend.last_error_code(), ErrorCode::OtherError)
    }

    fn check(&self, ok: bool) -> Result<(), VfsError> {
        if ok {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn some<T>(&self, value: Option<T>) -> Result<T, VfsError> {
        value.ok_or_else(|| self.error())
    }

    fn wrap(&self, raw: Box<dyn RawFile>) -> VfsFile {
        VfsFile {
            raw,
            backend: self.backend.clone(),
        }
    }

    // ========================================================================
    // Lifecycle and error slot
    // ========================================================================

    /// Initialise the backend
    pub fn init(&self, argv0: Option<&str>) -> Result<(), VfsError> {
        self.check(self.backend.init(argv0))
    }

    /// Shut the backend down
    pub fn deinit(&self) -> Result<(), VfsError> {
        self.check(self.backend.deinit())
    }

    /// Whether the backend is initialised
    pub fn is_init(&self) -> bool {
        self.backend.is_init()
    }

    /// Read and clear the last error code
    pub fn last_error(&self) -> ErrorCode {
        self.backend.last_error_code()
    }

    /// Overwrite the last error code
    pub fn set_last_error(&self, code: ErrorCode) {
        self.backend.set_error_code(code);
    }

    // ========================================================================
    // Environment
    // ========================================================================

    /// Platform directory separator
    pub fn dir_separator(&self) -> &'static str {
        self.backend.dir_separator()
    }

    /// Program directory
    pub fn base_dir(&self) -> Option<String> {
        self.backend.base_dir()
    }

    /// Per-user writable directory
    pub fn pref_dir(&self, org: &str, app: &str) -> Result<String, VfsError> {
        let dir = self.backend.pref_dir(org, app);
        self.some(dir)
    }

    /// Current write directory
    pub fn write_dir(&self) -> Option<String> {
        self.backend.write_dir()
    }

    /// Set or clear the write directory
    pub fn set_write_dir(&self, dir: Option<&str>) -> Result<(), VfsError> {
        self.check(self.backend.set_write_dir(dir))
    }

    /// Mounted sources in search order
    pub fn search_path(&self) -> Result<Vec<String>, VfsError> {
        let list = self.backend.search_path();
        self.some(list)
    }

    /// Mounted optical drives
    pub fn cd_rom_dirs(&self) -> Result<Vec<String>, VfsError> {
        let list = self.backend.cd_rom_dirs();
        self.some(list)
    }

    /// Allow or refuse symbolic links
    pub fn permit_symlinks(&self, allow: bool) {
        self.backend.permit_symbolic_links(allow);
    }

    /// Whether symbolic links are followed
    pub fn symlinks_permitted(&self) -> bool {
        self.backend.symbolic_links_permitted()
    }

    /// Standard game-style setup
    pub fn sane_config(
        &self,
        org: &str,
        app: &str,
        archive_ext: Option<&str>,
        include_cdroms: bool,
        archives_first: bool,
    ) -> Result<(), VfsError> {
        self.check(self.backend.set_sane_config(
            org,
            app,
            archive_ext,
            include_cdroms,
            archives_first,
        ))
    }

    /// Mountable archive formats
    pub fn supported_archive_types(&self) -> Vec<ArchiveInfo> {
        self.backend.supported_archive_types()
    }

    /// Backend version
    pub fn version(&self) -> Version {
        self.backend.linked_version()
    }

    // ========================================================================
    // Namespace
    // ========================================================================

    /// Create a directory in the write dir
    pub fn mkdir(&self, path: &str) -> Result<(), VfsError> {
        self.check(self.backend.mkdir(path))
    }

    /// Delete a file or empty directory in the write dir
    pub fn delete(&self, path: &str) -> Result<(), VfsError> {
        self.check(self.backend.delete(path))
    }

    /// Whether a path exists anywhere in the search path
    pub fn exists(&self, path: &str) -> bool {
        self.backend.exists(path)
    }

    /// Source serving `path`. A miss leaves the reason in the slot.
    pub fn real_dir(&self, path: &str) -> Option<String> {
        self.backend.real_dir(path)
    }

    /// Mount point of a source. A miss leaves the reason in the slot.
    pub fn mount_point(&self, source: &str) -> Option<String> {
        self.backend.mount_point(source)
    }

    /// Status of a path
    pub fn stat(&self, path: &str) -> Result<Stat, VfsError> {
        let stat = self.backend.stat(path);
        self.some(stat)
    }

    /// Directory listing merged over the search path
    pub fn enumerate(&self, dir: &str) -> Result<Vec<String>, VfsError> {
        let list = self.backend.enumerate(dir);
        self.some(list)
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Open for reading
    pub fn open_read(&self, path: &str) -> Result<VfsFile, VfsError> {
        let raw = self.backend.open_read(path);
        self.some(raw).map(|raw| self.wrap(raw))
    }

    /// Create or truncate for writing
    pub fn open_write(&self, path: &str) -> Result<VfsFile, VfsError> {
        let raw = self.backend.open_write(path);
        self.some(raw).map(|raw| self.wrap(raw))
    }

    /// Open for appending
    pub fn open_append(&self, path: &str) -> Result<VfsFile, VfsError> {
        let raw = self.backend.open_append(path);
        self.some(raw).map(|raw| self.wrap(raw))
    }

    // ========================================================================
    // Mounting
    // ========================================================================

    /// Mount a directory or archive
    pub fn mount(&self, source: &str, point: Option<&str>, append: bool) -> Result<(), VfsError> {
        self.check(self.backend.mount(source, point, append))
    }

    /// Mount an open file. On failure the file comes back with the error.
    pub fn mount_file(
        &self,
        file: VfsFile,
        name: &str,
        point: Option<&str>,
        append: bool,
    ) -> Result<(), (VfsFile, VfsError)> {
        self.backend
            .mount_handle(file.raw, name, point, append)
            .map_err(|raw| {
                let error = self.error();
                (self.wrap(raw), error)
            })
    }

    /// Mount an archive image held in memory
    pub fn mount_memory(
        &self,
        data: Vec<u8>,
        name: &str,
        point: Option<&str>,
        append: bool,
    ) -> Result<(), VfsError> {
        self.check(self.backend.mount_memory(data, name, point, append))
    }

    /// Remove a source from the search path
    pub fn unmount(&self, source: &str) -> Result<(), VfsError> {
        self.check(self.backend.unmount(source))
    }
}

/// One open file plus the backend whose slot it reports through
pub struct VfsFile {
    raw: Box<dyn RawFile>,
    backend: Rc<dyn Backend>,
}

impl fmt::Debug for VfsFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VfsFile({:p})", self.raw.as_ref() as *const dyn RawFile as *const ())
    }
}

impl VfsFile {
    fn error(&self, fallback: ErrorCode) -> VfsError {
        VfsError::from_slot(self.backend.last_error_code(), fallback)
    }

    fn count(&self, n: i64) -> Result<u64, VfsError> {
        u64::try_from(n).map_err(|_| self.error(ErrorCode::OtherError))
    }

    /// Error explaining why a transfer came up short. `fallback` is used when
    /// the backend left no code (a clean end of file on read).
    pub fn shortfall(&self, fallback: ErrorCode) -> VfsError {
        self.error(fallback)
    }

    /// Read up to `buf.len()` bytes; `Ok(0)` is end of file
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, VfsError> {
        let n = self.raw.read_bytes(buf);
        self.count(n).map(|n| n as usize)
    }

    /// Write `buf`, returning how many bytes the backend took
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, VfsError> {
        let n = self.raw.write_bytes(buf);
        self.count(n).map(|n| n as usize)
    }

    /// End of file reached
    pub fn eof(&mut self) -> bool {
        self.raw.eof()
    }

    /// Current offset
    pub fn tell(&mut self) -> Result<u64, VfsError> {
        let pos = self.raw.tell();
        self.count(pos)
    }

    /// Total length
    pub fn length(&mut self) -> Result<u64, VfsError> {
        let len = self.raw.length();
        self.count(len)
    }

    /// Move to an absolute offset
    pub fn seek(&mut self, pos: u64) -> Result<(), VfsError> {
        if self.raw.seek(pos) {
            Ok(())
        } else {
            Err(self.error(ErrorCode::OtherError))
        }
    }

    /// Buffer writes up to `size` bytes
    pub fn set_buffer(&mut self, size: u64) -> Result<(), VfsError> {
        if self.raw.set_buffer(size) {
            Ok(())
        } else {
            Err(self.error(ErrorCode::OtherError))
        }
    }

    /// Push buffered writes out
    pub fn flush(&mut self) -> Result<(), VfsError> {
        if self.raw.flush() {
            Ok(())
        } else {
            Err(self.error(ErrorCode::OtherError))
        }
    }

    /// Close the file; it is released whatever the outcome
    pub fn close(self) -> Result<(), VfsError> {
        let VfsFile { raw, backend } = self;
        if raw.close() {
            Ok(())
        } else {
            Err(VfsError::from_slot(
                backend.last_error_code(),
                ErrorCode::OtherError,
            ))
        }
    }
}
