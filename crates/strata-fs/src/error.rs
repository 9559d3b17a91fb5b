//! Error types for the bindings

use std::path::PathBuf;

use strata_sdk::HostError;
use thiserror::Error;

use crate::transfer::PartialWrite;
use crate::vfs::VfsError;

/// Type name of file handle userdata
pub const FILE_TYPE: &str = "strata.File";

/// Errors from file handle operations.
///
/// `Display` renders the `"<op>: <message>"` form returned to scripts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FileError {
    /// The handle was closed or handed to a mount
    #[error("invalid strata.File got")]
    Closed,

    /// A filesystem call failed
    #[error("{op}: {source}")]
    Vfs {
        /// Script-visible operation name
        op: &'static str,
        /// Snapshot of the failure
        source: VfsError,
    },

    /// `write` stopped early
    #[error("write: {}", .0.error)]
    Write(PartialWrite),

    /// `writeInt` failed on the value at `index` (1-based)
    #[error("writeInt: {source}")]
    WriteInt {
        /// Snapshot of the failure
        source: VfsError,
        /// 1-based index of the value that failed
        index: usize,
    },
}

impl FileError {
    /// Attach an operation name to a filesystem failure
    pub fn vfs(op: &'static str) -> impl FnOnce(VfsError) -> FileError {
        move |source| FileError::Vfs { op, source }
    }
}

/// Errors from the module searcher
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// The filesystem is not initialised
    #[error("vfs not init")]
    NotInitialized,

    /// No candidate file exists; carries the full diagnostic
    #[error("{0}")]
    NotFound(String),

    /// A candidate was found but could not be read or compiled
    #[error("error loading module '{module}' from file '{path}':\n\tvfs: {message}")]
    Load {
        /// Module name as requested
        module: String,
        /// Candidate path that was opened
        path: String,
        /// Read or compile error text
        message: String,
    },
}

impl From<LoadError> for HostError {
    fn from(e: LoadError) -> Self {
        HostError::Runtime(e.to_string())
    }
}

/// Errors loading `strata.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_vfs::ErrorCode;

    #[test]
    fn test_file_error_messages() {
        let e = FileError::Vfs {
            op: "seek",
            source: VfsError::new(ErrorCode::PastEof),
        };
        assert_eq!(e.to_string(), "seek: past end of file");
        assert_eq!(FileError::Closed.to_string(), "invalid strata.File got");

        let e = FileError::Write(PartialWrite {
            error: VfsError::new(ErrorCode::NoSpace),
            written: 3,
        });
        assert_eq!(e.to_string(), "write: no space available for writing");
    }

    #[test]
    fn test_load_error_message() {
        let e = LoadError::Load {
            module: "a.b".to_string(),
            path: "a/b.lua".to_string(),
            message: "not found".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "error loading module 'a.b' from file 'a/b.lua':\n\tvfs: not found"
        );
    }
}
