//! Error codes and the last-error slot.
//!
//! The filesystem reports failure C-style: the call returns a failure marker
//! and stores an [`ErrorCode`] in a shared slot. Callers read the slot right
//! after the failing call; reading clears it.

use std::cell::Cell;
use std::io;
use std::rc::Rc;

macro_rules! error_codes {
    ($($variant:ident => $name:literal, $desc:literal;)*) => {
        /// Filesystem error code
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum ErrorCode {
            /// No error
            #[default]
            Ok,
            $(
                #[doc = $desc]
                $variant,
            )*
        }

        impl ErrorCode {
            /// Every code, in declaration order
            pub const ALL: &'static [ErrorCode] = &[ErrorCode::Ok, $(ErrorCode::$variant,)*];

            /// Symbolic name ("NOT_FOUND")
            pub fn name(self) -> &'static str {
                match self {
                    ErrorCode::Ok => "OK",
                    $(ErrorCode::$variant => $name,)*
                }
            }

            /// Human readable description ("not found")
            pub fn description(self) -> &'static str {
                match self {
                    ErrorCode::Ok => "no error",
                    $(ErrorCode::$variant => $desc,)*
                }
            }

            /// Parse a symbolic name
            pub fn from_name(name: &str) -> Option<ErrorCode> {
                match name {
                    "OK" => Some(ErrorCode::Ok),
                    $($name => Some(ErrorCode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

error_codes! {
    OtherError => "OTHER_ERROR", "unknown error";
    OutOfMemory => "OUT_OF_MEMORY", "out of memory";
    NotInitialized => "NOT_INITIALIZED", "not initialized";
    IsInitialized => "IS_INITIALIZED", "already initialized";
    Argv0IsNull => "ARGV0_IS_NULL", "argv[0] is NULL";
    Unsupported => "UNSUPPORTED", "unsupported";
    PastEof => "PAST_EOF", "past end of file";
    FilesStillOpen => "FILES_STILL_OPEN", "files still open";
    InvalidArgument => "INVALID_ARGUMENT", "invalid argument";
    NotMounted => "NOT_MOUNTED", "not mounted";
    NotFound => "NOT_FOUND", "not found";
    SymlinkForbidden => "SYMLINK_FORBIDDEN", "symlinks are forbidden";
    NoWriteDir => "NO_WRITE_DIR", "write directory is not set";
    OpenForReading => "OPEN_FOR_READING", "file open for reading";
    OpenForWriting => "OPEN_FOR_WRITING", "file open for writing";
    NotAFile => "NOT_A_FILE", "not a file";
    ReadOnly => "READ_ONLY", "read-only filesystem";
    Corrupt => "CORRUPT", "corrupted";
    SymlinkLoop => "SYMLINK_LOOP", "infinite symbolic link loop";
    Io => "IO", "i/o error";
    Permission => "PERMISSION", "permission denied";
    NoSpace => "NO_SPACE", "no space available for writing";
    BadFilename => "BAD_FILENAME", "filename is illegal or insecure";
    Busy => "BUSY", "tried to modify a file the OS needs";
    DirNotEmpty => "DIR_NOT_EMPTY", "directory isn't empty";
    OsError => "OS_ERROR", "OS reported an error";
    Duplicate => "DUPLICATE", "duplicate resource";
    BadPassword => "BAD_PASSWORD", "bad password";
    AppCallback => "APP_CALLBACK", "app callback reported error";
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

impl From<&io::Error> for ErrorCode {
    fn from(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => ErrorCode::NotFound,
            io::ErrorKind::PermissionDenied => ErrorCode::Permission,
            io::ErrorKind::AlreadyExists => ErrorCode::Duplicate,
            io::ErrorKind::InvalidInput => ErrorCode::InvalidArgument,
            io::ErrorKind::UnexpectedEof => ErrorCode::PastEof,
            io::ErrorKind::OutOfMemory => ErrorCode::OutOfMemory,
            io::ErrorKind::InvalidData => ErrorCode::Corrupt,
            io::ErrorKind::Unsupported => ErrorCode::Unsupported,
            io::ErrorKind::DirectoryNotEmpty => ErrorCode::DirNotEmpty,
            io::ErrorKind::ReadOnlyFilesystem => ErrorCode::ReadOnly,
            io::ErrorKind::StorageFull => ErrorCode::NoSpace,
            io::ErrorKind::NotADirectory | io::ErrorKind::IsADirectory => ErrorCode::NotAFile,
            _ => ErrorCode::Io,
        }
    }
}

/// Shared last-error slot.
///
/// Cloned into every open file so file operations report through the same
/// slot as the filesystem that opened them.
#[derive(Debug, Clone, Default)]
pub struct ErrorState(Rc<Cell<ErrorCode>>);

impl ErrorState {
    /// Create a slot holding `Ok`
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a code
    pub fn set(&self, code: ErrorCode) {
        self.0.set(code);
    }

    /// Store the code matching an I/O error
    pub fn set_io(&self, e: &io::Error) {
        self.0.set(ErrorCode::from(e));
    }

    /// Read and clear
    pub fn take(&self) -> ErrorCode {
        self.0.replace(ErrorCode::Ok)
    }

    /// Read without clearing
    pub fn peek(&self) -> ErrorCode {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_name(code.name()), Some(*code));
        }
        assert_eq!(ErrorCode::ALL.len(), 30);
        assert_eq!(ErrorCode::from_name("NOPE"), None);
    }

    #[test]
    fn test_take_clears() {
        let slot = ErrorState::new();
        slot.set(ErrorCode::NotFound);
        let shared = slot.clone();
        assert_eq!(shared.peek(), ErrorCode::NotFound);
        assert_eq!(slot.take(), ErrorCode::NotFound);
        assert_eq!(shared.take(), ErrorCode::Ok);
    }

    #[test]
    fn test_io_mapping() {
        let e = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(ErrorCode::from(&e), ErrorCode::NotFound);
        assert_eq!(ErrorCode::NotFound.to_string(), "not found");
    }
}
