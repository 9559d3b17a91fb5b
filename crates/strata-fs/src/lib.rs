//! Strata FS - scripting bindings for the strata virtual filesystem
//!
//! Exposes a mounted, sandboxed filesystem to an embedded script engine:
//! a library table of filesystem routines, a `strata.File` handle type with
//! raw and typed-integer I/O, and a module searcher that loads script
//! modules out of the mounted tree.
//!
//! The engine is reached only through [`strata_sdk::HostContext`]; the
//! filesystem only through [`strata_vfs::Backend`].
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use strata_fs::{library, Config};
//! use strata_vfs::NativeFs;
//!
//! let lib = library::open(&host, Rc::new(NativeFs::new()), &Config::default())?;
//! lib.call(&host, "mount", &["assets.zip".into(), Value::Nil, true.into()]);
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod error;
pub mod file;
pub mod format;
pub mod library;
pub mod loader;
pub mod marshal;
pub mod methods;
pub mod registry;
pub mod transfer;
pub mod vfs;

pub use config::Config;
pub use error::{ConfigError, FileError, LoadError, FILE_TYPE};
pub use file::{FileHandle, ReadRequest, ReadValue};
pub use format::{Endian, FormatError, FormatTag, Signedness, Width};
pub use library::{open, Library};
pub use loader::Loader;
pub use vfs::{Vfs, VfsError, VfsFile};
