//! Module searcher backed by the virtual filesystem
//!
//! A dotted module name `a.b` maps to `a/b`, `a/b.<source>` and
//! `a/b.<compiled>`, tried in that order. The first that opens is read
//! whole and handed to the host compiler.

use std::fmt::Write as _;
use std::rc::Rc;

use strata_sdk::{Args, CallResult, HostContext, NativeFunction, Value};

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::transfer::read_all_or_n;
use crate::vfs::{Vfs, VfsFile};

/// Module searcher
#[derive(Debug, Clone)]
pub struct Loader {
    source_suffix: String,
    compiled_suffix: String,
    chunk_prefix: String,
    chunk_size: usize,
}

impl Loader {
    /// Build a searcher from its config and the streaming chunk size
    pub fn new(config: &LoaderConfig, chunk_size: usize) -> Self {
        Loader {
            source_suffix: config.source_suffix.clone(),
            compiled_suffix: config.compiled_suffix.clone(),
            chunk_prefix: config.chunk_prefix.clone(),
            chunk_size,
        }
    }

    /// Candidate paths for a module, in the order they are tried
    pub fn candidates(&self, module: &str, separator: &str) -> [String; 3] {
        let base = module.replace('.', separator);
        [
            base.clone(),
            format!("{}.{}", base, self.source_suffix),
            format!("{}.{}", base, self.compiled_suffix),
        ]
    }

    /// Open the first candidate that exists
    pub fn locate(&self, vfs: &Vfs, module: &str) -> Result<(String, VfsFile), LoadError> {
        if !vfs.is_init() {
            return Err(LoadError::NotInitialized);
        }
        let candidates = self.candidates(module, vfs.dir_separator());
        for path in &candidates {
            match vfs.open_read(path) {
                Ok(file) => {
                    tracing::debug!(module, path = %path, "module found");
                    return Ok((path.clone(), file));
                }
                Err(e) => tracing::trace!(module, path = %path, error = %e, "candidate missed"),
            }
        }
        let mut diagnostic = String::new();
        for path in &candidates {
            let _ = write!(diagnostic, "\n\tno file '{}' in vfs search path", path);
        }
        Err(LoadError::NotFound(diagnostic))
    }

    /// Find, read and compile a module. Returns the chunk and its path.
    pub fn load(
        &self,
        ctx: &dyn HostContext,
        vfs: &Vfs,
        module: &str,
    ) -> Result<(Value, String), LoadError> {
        let (path, mut file) = self.locate(vfs, module)?;
        let load_error = |message: String| LoadError::Load {
            module: module.to_string(),
            path: path.clone(),
            message,
        };

        let data = read_all_or_n(&mut file, None, self.chunk_size);
        if let Err(e) = file.close() {
            tracing::warn!(path = %path, error = %e, "failed to close module file");
        }
        let data = data.map_err(|e| load_error(e.message))?;

        let chunk_name = format!("{}{}", self.chunk_prefix, path);
        let chunk = ctx
            .compile(&data, &chunk_name)
            .map_err(|e| load_error(e.to_string()))?;
        Ok((chunk, path))
    }

    /// The searcher as a script function.
    ///
    /// Returns a diagnostic string when nothing is found, `(chunk, path)` on
    /// success, and raises when a found module cannot be read or compiled.
    pub fn searcher(self: &Rc<Self>, vfs: Vfs) -> NativeFunction {
        let loader = Rc::clone(self);
        NativeFunction::new(move |ctx, values| {
            let args = Args::new(values);
            let module = match args.check_str(1) {
                Ok(module) => module,
                Err(e) => return e.into(),
            };
            match loader.load(ctx, &vfs, module) {
                Ok((chunk, path)) => CallResult::Values(vec![chunk, Value::from(path)]),
                Err(e @ (LoadError::NotInitialized | LoadError::NotFound(_))) => {
                    CallResult::one(e.to_string())
                }
                Err(e) => CallResult::Error(e.into()),
            }
        })
    }
}
