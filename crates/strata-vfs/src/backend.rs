//! The C-style filesystem surface.
//!
//! Every call reports failure through its return value (`false`, `None`,
//! `-1`) and stores the reason in the shared last-error slot, read back with
//! [`Backend::last_error_code`]. The slot is overwritten by the next failing
//! call, so callers must read it before doing anything else.

use crate::error::ErrorCode;
use crate::stat::{ArchiveInfo, Stat, Version};

/// An open file inside the virtual filesystem.
pub trait RawFile {
    /// Read up to `buf.len()` bytes. Returns the count read, or -1.
    /// Zero means end of file.
    fn read_bytes(&mut self, buf: &mut [u8]) -> i64;

    /// Write `buf`. Returns the count written, or -1.
    fn write_bytes(&mut self, buf: &[u8]) -> i64;

    /// True when the read position is at or past the end
    fn eof(&mut self) -> bool;

    /// Current offset, or -1
    fn tell(&mut self) -> i64;

    /// Move to an absolute offset
    fn seek(&mut self, pos: u64) -> bool;

    /// Total size in bytes, or -1
    fn length(&mut self) -> i64;

    /// Buffer up to `size` bytes of writes (0 disables buffering)
    fn set_buffer(&mut self, size: u64) -> bool;

    /// Push buffered writes to the underlying storage
    fn flush(&mut self) -> bool;

    /// Flush and release. The file is gone whatever the outcome.
    fn close(self: Box<Self>) -> bool;

    /// Drain the rest of the file into memory. Used to mount a file's
    /// contents; the default reads through [`RawFile::read_bytes`].
    fn read_to_end(&mut self) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match self.read_bytes(&mut chunk) {
                n if n < 0 => return None,
                0 => return Some(out),
                n => out.extend_from_slice(&chunk[..n as usize]),
            }
        }
    }
}

/// The filesystem itself.
pub trait Backend {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initialise. `argv0` locates the base directory when given.
    fn init(&self, argv0: Option<&str>) -> bool;

    /// Tear down: drops every mount and the write dir
    fn deinit(&self) -> bool;

    /// Whether `init` succeeded and `deinit` has not run
    fn is_init(&self) -> bool;

    // ========================================================================
    // Errors
    // ========================================================================

    /// Read and clear the last error
    fn last_error_code(&self) -> ErrorCode;

    /// Overwrite the last error
    fn set_error_code(&self, code: ErrorCode);

    // ========================================================================
    // Environment
    // ========================================================================

    /// Platform directory separator
    fn dir_separator(&self) -> &'static str;

    /// Directory the program lives in, with a trailing separator
    fn base_dir(&self) -> Option<String>;

    /// Per-user writable directory for `org`/`app`, created on demand
    fn pref_dir(&self, org: &str, app: &str) -> Option<String>;

    /// Current write directory
    fn write_dir(&self) -> Option<String>;

    /// Set (or with `None`, clear) the write directory
    fn set_write_dir(&self, dir: Option<&str>) -> bool;

    /// Mounted sources in search order
    fn search_path(&self) -> Option<Vec<String>>;

    /// Mounted optical drives
    fn cd_rom_dirs(&self) -> Option<Vec<String>>;

    /// Allow or refuse symbolic links
    fn permit_symbolic_links(&self, allow: bool);

    /// Whether symbolic links are followed
    fn symbolic_links_permitted(&self) -> bool;

    /// Typical game-style setup: pref dir as write dir, base dir mounted,
    /// archives with `archive_ext` mounted from both.
    fn set_sane_config(
        &self,
        org: &str,
        app: &str,
        archive_ext: Option<&str>,
        include_cdroms: bool,
        archives_first: bool,
    ) -> bool;

    /// Supported archive formats
    fn supported_archive_types(&self) -> Vec<ArchiveInfo>;

    /// Library version
    fn linked_version(&self) -> Version;

    // ========================================================================
    // Namespace
    // ========================================================================

    /// Create a directory (and parents) in the write dir
    fn mkdir(&self, path: &str) -> bool;

    /// Delete a file or empty directory in the write dir
    fn delete(&self, path: &str) -> bool;

    /// Whether the path resolves anywhere in the search path
    fn exists(&self, path: &str) -> bool;

    /// Source that would serve `path`
    fn real_dir(&self, path: &str) -> Option<String>;

    /// Where a mounted source is attached
    fn mount_point(&self, source: &str) -> Option<String>;

    /// Status of a path
    fn stat(&self, path: &str) -> Option<Stat>;

    /// Names in a directory, merged over the search path
    fn enumerate(&self, dir: &str) -> Option<Vec<String>>;

    // ========================================================================
    // Files
    // ========================================================================

    /// Open for reading through the search path
    fn open_read(&self, path: &str) -> Option<Box<dyn RawFile>>;

    /// Create or truncate in the write dir
    fn open_write(&self, path: &str) -> Option<Box<dyn RawFile>>;

    /// Open for appending in the write dir
    fn open_append(&self, path: &str) -> Option<Box<dyn RawFile>>;

    // ========================================================================
    // Mounting
    // ========================================================================

    /// Mount a directory or archive from the host filesystem
    fn mount(&self, source: &str, point: Option<&str>, append: bool) -> bool;

    /// Mount the contents of an open file. On success the filesystem owns
    /// the file; on failure it is handed back untouched.
    fn mount_handle(
        &self,
        file: Box<dyn RawFile>,
        name: &str,
        point: Option<&str>,
        append: bool,
    ) -> Result<(), Box<dyn RawFile>>;

    /// Mount an archive image held in memory
    fn mount_memory(&self, data: Vec<u8>, name: &str, point: Option<&str>, append: bool) -> bool;

    /// Remove a source from the search path
    fn unmount(&self, source: &str) -> bool;
}
