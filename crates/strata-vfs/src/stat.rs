//! Status records and descriptive metadata.

use serde::Serialize;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Regular file
    Regular,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Device, pipe or socket
    Other,
    /// The source could not classify the entry
    Unknown,
}

/// Status record for a path.
///
/// Sizes and timestamps are `-1` when the source cannot tell. Timestamps are
/// seconds since the UNIX epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stat {
    /// Entry kind
    pub filetype: FileType,
    /// True when the entry cannot be written through the filesystem
    pub readonly: bool,
    /// Size in bytes
    pub filesize: i64,
    /// Last modification
    pub modtime: i64,
    /// Creation
    pub createtime: i64,
    /// Last access
    pub accesstime: i64,
}

impl Stat {
    /// A directory entry with unknown times
    pub fn directory(readonly: bool) -> Self {
        Stat {
            filetype: FileType::Directory,
            readonly,
            filesize: 0,
            modtime: -1,
            createtime: -1,
            accesstime: -1,
        }
    }
}

/// Description of an archive format the filesystem can mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveInfo {
    /// File extension, without the dot ("ZIP")
    pub extension: String,
    /// Human readable description
    pub description: String,
    /// Implementation author
    pub author: String,
    /// Where to find more information
    pub url: String,
    /// Whether the format can store symbolic links
    pub supports_symlinks: bool,
}

/// Linked library version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Version {
    /// Major
    pub major: u8,
    /// Minor
    pub minor: u8,
    /// Patch
    pub patch: u8,
}
