//! HostContext trait: abstract engine operations
//!
//! Defines the interface the embedding engine implements. Bindings program
//! against this trait and never depend on engine internals.

use crate::error::AbiResult;
use crate::value::{NativeFunction, Value};

/// Abstract engine context handed to every native call.
pub trait HostContext {
    /// Compile a chunk (source or precompiled) into a callable value.
    ///
    /// `chunk_name` is the name reported in the engine's diagnostics.
    /// A rejected chunk is reported as [`crate::HostError::Syntax`].
    fn compile(&self, chunk: &[u8], chunk_name: &str) -> AbiResult<Value>;

    /// Append a module searcher to the engine's searcher list.
    ///
    /// Returns `false` when the engine has no searcher list to extend.
    fn add_searcher(&self, searcher: NativeFunction) -> bool;

    /// Path the program was started with, if the engine knows it
    fn program_name(&self) -> Option<String> {
        None
    }
}
