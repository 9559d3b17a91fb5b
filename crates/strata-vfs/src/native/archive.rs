//! Mountable sources: host directories and ZIP images.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, File, Metadata};
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ErrorCode, ErrorState};
use crate::path::{sanitize, to_host};
use crate::stat::{FileType, Stat};

use super::file::NativeFile;

/// A mounted source. Paths passed in are sanitized and relative to the
/// source's root.
pub(crate) trait Archive {
    fn open(&self, path: &str, symlinks: bool, errors: &ErrorState) -> Result<NativeFile, ErrorCode>;

    fn stat(&self, path: &str, symlinks: bool) -> Result<Stat, ErrorCode>;

    fn enumerate(&self, dir: &str, symlinks: bool) -> Result<Vec<String>, ErrorCode>;
}

// ============================================================================
// Host directory
// ============================================================================

pub(crate) struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    pub(crate) fn new(root: PathBuf) -> Self {
        DirArchive { root }
    }

    fn metadata(&self, path: &str, symlinks: bool) -> Result<Metadata, ErrorCode> {
        let host = to_host(&self.root, path);
        let meta = fs::symlink_metadata(&host).map_err(|e| ErrorCode::from(&e))?;
        if meta.file_type().is_symlink() {
            if !symlinks {
                return Err(ErrorCode::SymlinkForbidden);
            }
            return fs::metadata(&host).map_err(|e| ErrorCode::from(&e));
        }
        Ok(meta)
    }
}

fn epoch_seconds(time: std::io::Result<SystemTime>) -> i64 {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(-1)
}

#[cfg(unix)]
fn is_special(meta: &Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;

    let ft = meta.file_type();
    ft.is_block_device() || ft.is_char_device() || ft.is_fifo() || ft.is_socket()
}

#[cfg(not(unix))]
fn is_special(_meta: &Metadata) -> bool {
    false
}

fn stat_from_metadata(meta: &Metadata) -> Stat {
    let filetype = if meta.is_dir() {
        FileType::Directory
    } else if meta.is_file() {
        FileType::Regular
    } else if meta.file_type().is_symlink() {
        FileType::Symlink
    } else if is_special(meta) {
        FileType::Other
    } else {
        FileType::Unknown
    };
    Stat {
        filetype,
        readonly: meta.permissions().readonly(),
        filesize: if meta.is_dir() { 0 } else { meta.len() as i64 },
        modtime: epoch_seconds(meta.modified()),
        createtime: epoch_seconds(meta.created()),
        accesstime: epoch_seconds(meta.accessed()),
    }
}

impl Archive for DirArchive {
    fn open(&self, path: &str, symlinks: bool, errors: &ErrorState) -> Result<NativeFile, ErrorCode> {
        let meta = self.metadata(path, symlinks)?;
        if !meta.is_file() {
            return Err(ErrorCode::NotAFile);
        }
        let file = File::open(to_host(&self.root, path)).map_err(|e| ErrorCode::from(&e))?;
        Ok(NativeFile::host_reader(file, errors.clone()))
    }

    fn stat(&self, path: &str, symlinks: bool) -> Result<Stat, ErrorCode> {
        self.metadata(path, symlinks).map(|m| stat_from_metadata(&m))
    }

    fn enumerate(&self, dir: &str, symlinks: bool) -> Result<Vec<String>, ErrorCode> {
        let meta = self.metadata(dir, symlinks)?;
        if !meta.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(to_host(&self.root, dir)).map_err(|e| ErrorCode::from(&e))?;
        let mut names = Vec::new();
        for entry in entries.flatten() {
            if !symlinks && entry.file_type().map(|t| t.is_symlink()).unwrap_or(false) {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

// ============================================================================
// ZIP image
// ============================================================================

enum ZipEntry {
    Dir,
    File { index: usize, size: u64 },
}

pub(crate) struct ZipArchive {
    zip: RefCell<zip::ZipArchive<Cursor<Vec<u8>>>>,
    entries: BTreeMap<String, ZipEntry>,
}

fn zip_error_code(e: &zip::result::ZipError) -> ErrorCode {
    match e {
        zip::result::ZipError::Io(io) => ErrorCode::from(io),
        zip::result::ZipError::InvalidArchive(_) => ErrorCode::Corrupt,
        zip::result::ZipError::UnsupportedArchive(_) => ErrorCode::Unsupported,
        zip::result::ZipError::FileNotFound => ErrorCode::NotFound,
        _ => ErrorCode::OtherError,
    }
}

impl ZipArchive {
    /// Index a ZIP image. Anything that is not a readable ZIP is `Unsupported`.
    pub(crate) fn new(data: Vec<u8>) -> Result<Self, ErrorCode> {
        let mut zip =
            zip::ZipArchive::new(Cursor::new(data)).map_err(|_| ErrorCode::Unsupported)?;
        let mut entries = BTreeMap::new();
        for index in 0..zip.len() {
            let file = zip.by_index_raw(index).map_err(|e| zip_error_code(&e))?;
            let Ok(name) = sanitize(file.name()) else {
                tracing::warn!(name = file.name(), "skipping archive entry with unsafe name");
                continue;
            };
            if name.is_empty() {
                continue;
            }
            let mut parent = name.as_str();
            while let Some((dir, _)) = parent.rsplit_once('/') {
                entries.entry(dir.to_string()).or_insert(ZipEntry::Dir);
                parent = dir;
            }
            let entry = if file.is_dir() {
                ZipEntry::Dir
            } else {
                ZipEntry::File {
                    index,
                    size: file.size(),
                }
            };
            entries.insert(name, entry);
        }
        Ok(ZipArchive {
            zip: RefCell::new(zip),
            entries,
        })
    }
}

/// Most memory reserved up front for an entry before any of it is read
const RESERVE_LIMIT: u64 = 1 << 20;

impl Archive for ZipArchive {
    fn open(&self, path: &str, _symlinks: bool, errors: &ErrorState) -> Result<NativeFile, ErrorCode> {
        let index = match self.entries.get(path) {
            Some(ZipEntry::File { index, .. }) => *index,
            Some(ZipEntry::Dir) => return Err(ErrorCode::NotAFile),
            None if path.is_empty() => return Err(ErrorCode::NotAFile),
            None => return Err(ErrorCode::NotFound),
        };
        let mut zip = self.zip.borrow_mut();
        let mut entry = zip.by_index(index).map_err(|e| zip_error_code(&e))?;
        // The declared size comes from the image and is only a hint.
        let hint = entry.size().min(RESERVE_LIMIT) as usize;
        let mut data = Vec::new();
        data.try_reserve(hint).map_err(|_| ErrorCode::OutOfMemory)?;
        entry
            .read_to_end(&mut data)
            .map_err(|_| ErrorCode::Corrupt)?;
        Ok(NativeFile::memory(data, errors.clone()))
    }

    fn stat(&self, path: &str, _symlinks: bool) -> Result<Stat, ErrorCode> {
        if path.is_empty() {
            return Ok(Stat::directory(true));
        }
        match self.entries.get(path) {
            Some(ZipEntry::Dir) => Ok(Stat::directory(true)),
            Some(ZipEntry::File { size, .. }) => Ok(Stat {
                filetype: FileType::Regular,
                readonly: true,
                filesize: *size as i64,
                modtime: -1,
                createtime: -1,
                accesstime: -1,
            }),
            None => Err(ErrorCode::NotFound),
        }
    }

    fn enumerate(&self, dir: &str, _symlinks: bool) -> Result<Vec<String>, ErrorCode> {
        match self.entries.get(dir) {
            Some(ZipEntry::Dir) => {}
            Some(ZipEntry::File { .. }) => return Ok(Vec::new()),
            None if dir.is_empty() => {}
            None => return Err(ErrorCode::NotFound),
        }
        let names = self
            .entries
            .keys()
            .filter_map(|key| {
                let rest = if dir.is_empty() {
                    key.as_str()
                } else {
                    key.strip_prefix(dir)?.strip_prefix('/')?
                };
                (!rest.contains('/')).then(|| rest.to_string())
            })
            .collect();
        Ok(names)
    }
}
