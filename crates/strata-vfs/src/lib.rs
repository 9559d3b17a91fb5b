//! Strata virtual filesystem
//!
//! A search path of mounted directories and archives, a single write
//! directory, and a C-style error model: operations return failure markers
//! and leave an [`ErrorCode`] in a read-and-clear slot.
//!
//! [`Backend`] and [`RawFile`] are the boundary the scripting binding is
//! written against; [`NativeFs`] implements them over the host OS.

#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod native;
pub mod path;
pub mod stat;

pub use backend::{Backend, RawFile};
pub use error::{ErrorCode, ErrorState};
pub use native::NativeFs;
pub use stat::{ArchiveInfo, FileType, Stat, Version};
