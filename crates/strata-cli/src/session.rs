//! An opened filesystem for one CLI invocation

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use strata_fs::config::MountConfig;
use strata_fs::{library, Config, Library, Loader, Vfs};
use strata_sdk::{AbiResult, HostContext, NativeFunction, Value};
use strata_vfs::NativeFs;

/// Config file picked up from the working directory when `-c` is absent
pub const DEFAULT_CONFIG: &str = "strata.toml";

/// Host for the command line: no engine, chunks pass through as strings
struct CliHost {
    program: Option<String>,
}

impl HostContext for CliHost {
    fn compile(&self, chunk: &[u8], _chunk_name: &str) -> AbiResult<Value> {
        Ok(Value::string(chunk))
    }

    fn add_searcher(&self, _searcher: NativeFunction) -> bool {
        false
    }

    fn program_name(&self) -> Option<String> {
        self.program.clone()
    }
}

/// Filesystem options shared by every command
#[derive(Debug, Clone, Default, clap::Args)]
pub struct VfsOptions {
    /// Config file (default: ./strata.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Mount a directory or archive, optionally at a point: PATH[=POINT]
    #[arg(short, long = "mount", value_name = "PATH[=POINT]", global = true)]
    pub mounts: Vec<String>,

    /// Host directory that receives writes
    #[arg(short, long, global = true)]
    pub write_dir: Option<String>,
}

impl VfsOptions {
    /// The config file merged with command-line mounts
    pub fn resolve(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None if Path::new(DEFAULT_CONFIG).is_file() => Config::load(Path::new(DEFAULT_CONFIG))?,
            None => Config::default(),
        };
        for spec in &self.mounts {
            config.vfs.mounts.push(parse_mount(spec));
        }
        if let Some(dir) = &self.write_dir {
            config.vfs.write_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

/// `PATH` or `PATH=POINT`
pub fn parse_mount(spec: &str) -> MountConfig {
    let (path, point) = match spec.rsplit_once('=') {
        Some((path, point)) if !path.is_empty() => (path, Some(point.to_string())),
        _ => (spec, None),
    };
    MountConfig {
        path: path.to_string(),
        point,
        append: true,
    }
}

/// Opened library plus what the commands need from it
pub struct Session {
    library: Library,
    chunk_size: usize,
}

impl Session {
    /// Open the filesystem described by `options`
    pub fn open(options: &VfsOptions) -> anyhow::Result<Self> {
        let config = options.resolve()?;
        let host = CliHost {
            program: std::env::args().next(),
        };
        let library = library::open(&host, Rc::new(NativeFs::new()), &config)
            .context("failed to open the virtual filesystem")?;
        tracing::debug!(mounts = config.vfs.mounts.len(), "session opened");
        Ok(Session {
            library,
            chunk_size: config.io.chunk_size,
        })
    }

    /// The filesystem
    pub fn vfs(&self) -> &Vfs {
        self.library.vfs()
    }

    /// The module searcher
    pub fn loader(&self) -> &Loader {
        self.library.loader()
    }

    /// Streaming chunk size from the config
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}
