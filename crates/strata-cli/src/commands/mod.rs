//! Subcommand implementations

pub mod archives;
pub mod cat;
pub mod ls;
pub mod put;
pub mod search_path;
pub mod stat;
pub mod version;
pub mod which;
