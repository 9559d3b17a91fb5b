//! The `strata` library table
//!
//! [`open`] initialises the backend, applies the configured setup, installs
//! the module searcher and returns a [`Library`] whose table holds every
//! routine. Dropping the library shuts the backend down.
//!
//! Routines follow one convention: failures the script can recover from
//! come back as `nil, "<op>: <message>"`; bad arguments raise.

use std::rc::Rc;

use strata_sdk::handler::fail_values;
use strata_sdk::{
    AbiResult, Args, CallResult, FunctionRegistry, HostContext, HostError, TableRef, Value,
};
use strata_vfs::{Backend, ErrorCode};

use crate::codec;
use crate::config::{Config, VfsConfig};
use crate::format::FormatTag;
use crate::loader::Loader;
use crate::marshal::{archive_list, push_list, stat_table};
use crate::methods;
use crate::registry;
use crate::vfs::Vfs;

/// State shared by every routine of one library instance
#[derive(Debug)]
pub struct Shared {
    vfs: Vfs,
    file_meta: TableRef,
    chunk_size: usize,
}

impl Shared {
    /// The filesystem the routines act on
    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }
}

/// Signature of a library routine
pub type Routine = fn(&Shared, &dyn HostContext, Args<'_>) -> AbiResult<Vec<Value>>;

/// An opened `strata` library
#[derive(Debug)]
pub struct Library {
    shared: Rc<Shared>,
    table: TableRef,
    loader: Rc<Loader>,
}

impl Library {
    /// The library table handed to scripts
    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// The filesystem behind the library
    pub fn vfs(&self) -> &Vfs {
        &self.shared.vfs
    }

    /// The installed module searcher
    pub fn loader(&self) -> &Rc<Loader> {
        &self.loader
    }

    /// Metatable shared by file handles
    pub fn file_metatable(&self) -> &TableRef {
        &self.shared.file_meta
    }

    /// Call a routine by name
    pub fn call(&self, ctx: &dyn HostContext, name: &str, args: &[Value]) -> CallResult {
        let routine = self.table.borrow().get_field(name);
        match routine.as_function() {
            Some(f) => f.call(ctx, args),
            None => CallResult::Error(HostError::Runtime(format!(
                "attempt to call a nil value (field '{}')",
                name
            ))),
        }
    }

    fn apply(&self, config: &VfsConfig) -> AbiResult<()> {
        let vfs = &self.shared.vfs;
        vfs.permit_symlinks(config.permit_symlinks);
        if let Some(dir) = &config.write_dir {
            vfs.set_write_dir(Some(dir))
                .map_err(|e| HostError::Runtime(format!("writeDir: {}: {}", dir, e)))?;
        }
        for mount in &config.mounts {
            vfs.mount(&mount.path, mount.point.as_deref(), mount.append)
                .map_err(|e| HostError::Runtime(format!("mount: {}: {}", mount.path, e)))?;
            tracing::debug!(path = %mount.path, point = ?mount.point, "mounted from config");
        }
        Ok(())
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        let vfs = &self.shared.vfs;
        if vfs.is_init() {
            if let Err(e) = vfs.deinit() {
                tracing::warn!(error = %e, "failed to shut down vfs");
            }
        }
    }
}

/// Open the library against `backend`.
///
/// Fails when the backend will not initialise or the configured setup
/// cannot be applied; in the latter case the backend is shut down again.
pub fn open(
    ctx: &dyn HostContext,
    backend: Rc<dyn Backend>,
    config: &Config,
) -> AbiResult<Library> {
    config
        .validate()
        .map_err(|e| HostError::Runtime(e.to_string()))?;

    let vfs = Vfs::new(backend);
    let argv0 = ctx.program_name();
    if let Err(e) = vfs.init(argv0.as_deref()) {
        tracing::error!(error = %e, "vfs init failed");
        return Err(HostError::Runtime("can not init vfs library".to_string()));
    }

    let mut methods = FunctionRegistry::new();
    registry::register_file_methods(&mut methods);
    let shared = Rc::new(Shared {
        vfs: vfs.clone(),
        file_meta: methods.to_table(),
        chunk_size: config.io.chunk_size,
    });

    let mut routines = FunctionRegistry::new();
    registry::register_library(&mut routines, &shared);
    let table = routines.to_table();
    {
        let mut t = table.borrow_mut();
        t.set_field(
            "baseDir",
            vfs.base_dir().map(Value::from).unwrap_or_default(),
        );
        t.set_field("dirSep", Value::from(vfs.dir_separator()));
    }

    let loader = Rc::new(Loader::new(&config.loader, config.io.chunk_size));
    let library = Library {
        shared,
        table,
        loader: Rc::clone(&loader),
    };
    library.apply(&config.vfs)?;

    if !ctx.add_searcher(loader.searcher(vfs)) {
        tracing::debug!("host has no searcher list, module loading disabled");
    }
    tracing::info!(
        routines = routines.len(),
        mounts = config.vfs.mounts.len(),
        "strata library opened"
    );
    Ok(library)
}

// ============================================================================
// Environment
// ============================================================================

/// `supportedArchiveTypes([t])` -> table, count
pub fn supported_archive_types(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    let infos = shared.vfs.supported_archive_types();
    let (table, count) = archive_list(&infos, args.opt_table(1));
    Ok(vec![Value::from(table), Value::Integer(count as i64)])
}

/// `version()` -> major, minor, patch
pub fn version(shared: &Shared, _ctx: &dyn HostContext, _args: Args<'_>) -> AbiResult<Vec<Value>> {
    let v = shared.vfs.version();
    Ok(vec![
        Value::Integer(v.major.into()),
        Value::Integer(v.minor.into()),
        Value::Integer(v.patch.into()),
    ])
}

/// `saneConfig(org, app, [ext], cdroms, archivesFirst)`
pub fn sane_config(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    let org = args.check_str(1)?;
    let app = args.check_str(2)?;
    let ext = args.opt_str(3)?;
    let cdroms = args.to_boolean(4);
    let archives_first = args.to_boolean(5);
    match shared.vfs.sane_config(org, app, ext, cdroms, archives_first) {
        Ok(()) => Ok(vec![args.get(1)]),
        Err(e) => Ok(fail_values("saneConfig", e)),
    }
}

/// `prefDir(org, app)` -> path
pub fn pref_dir(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    let org = args.check_str(1)?;
    let app = args.check_str(2)?;
    match shared.vfs.pref_dir(org, app) {
        Ok(dir) => Ok(vec![Value::from(dir)]),
        Err(e) => Ok(fail_values("prefDir", e)),
    }
}

/// `writeDir()` gets, `writeDir(dir)` sets
pub fn write_dir(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    if args.is_empty() {
        return Ok(vec![shared.vfs.write_dir().map(Value::from).unwrap_or_default()]);
    }
    let dir = args.check_str(1)?;
    match shared.vfs.set_write_dir(Some(dir)) {
        Ok(()) => Ok(vec![args.get(1)]),
        Err(e) => Ok(fail_values("writeDir", e)),
    }
}

/// `cdRomDirs([t])`
pub fn cd_rom_dirs(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    match shared.vfs.cd_rom_dirs() {
        Ok(dirs) => Ok(vec![Value::from(push_list(dirs, args.opt_table(1)))]),
        Err(e) => Ok(fail_values("cdRomDirs", e)),
    }
}

/// `searchPath([t])`
pub fn search_path(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    match shared.vfs.search_path() {
        Ok(path) => Ok(vec![Value::from(push_list(path, args.opt_table(1)))]),
        Err(e) => Ok(fail_values("searchPath", e)),
    }
}

/// `useSymlink()` gets, `useSymlink(allow)` sets
pub fn use_symlink(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    if args.is_empty() {
        return Ok(vec![Value::Boolean(shared.vfs.symlinks_permitted())]);
    }
    shared.vfs.permit_symlinks(args.to_boolean(1));
    Ok(vec![])
}

/// `lastError()` reads and clears, `lastError(name)` sets
pub fn last_error(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    if args.is_empty() {
        return Ok(vec![Value::from(shared.vfs.last_error().name())]);
    }
    let name = args.check_str(1)?;
    let code = ErrorCode::from_name(name)
        .ok_or_else(|| HostError::argument(1, format!("invalid option '{}'", name)))?;
    shared.vfs.set_last_error(code);
    Ok(vec![])
}

// ============================================================================
// Namespace
// ============================================================================

/// `mkdir(path)`
pub fn mkdir(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    let path = args.check_str(1)?;
    match shared.vfs.mkdir(path) {
        Ok(()) => Ok(vec![args.get(1)]),
        Err(e) => Ok(fail_values("mkdir", e)),
    }
}

/// `delete(path)`
pub fn delete(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    let path = args.check_str(1)?;
    match shared.vfs.delete(path) {
        Ok(()) => Ok(vec![args.get(1)]),
        Err(e) => Ok(fail_values("delete", e)),
    }
}

/// `exists(path)` -> boolean
pub fn exists(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    let path = args.check_str(1)?;
    Ok(vec![Value::Boolean(shared.vfs.exists(path))])
}

/// `realDir(path)` -> source or nil
pub fn real_dir(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    let path = args.check_str(1)?;
    Ok(vec![shared.vfs.real_dir(path).map(Value::from).unwrap_or_default()])
}

/// `stat(path, [t])`
pub fn stat(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    let path = args.check_str(1)?;
    match shared.vfs.stat(path) {
        Ok(stat) => Ok(vec![Value::from(stat_table(&stat, args.opt_table(2)))]),
        Err(e) => Ok(fail_values("stat", e)),
    }
}

/// `files(dir, [t])`
pub fn files(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    let dir = args.check_str(1)?;
    match shared.vfs.enumerate(dir) {
        Ok(list) => Ok(vec![Value::from(push_list(list, args.opt_table(2)))]),
        Err(e) => Ok(fail_values("files", e)),
    }
}

// ============================================================================
// Files
// ============================================================================

#[derive(Clone, Copy)]
enum OpenMode {
    Read,
    Write,
    Append,
}

fn open_file(shared: &Shared, args: &Args<'_>, mode: OpenMode) -> AbiResult<Vec<Value>> {
    let path = args.check_str(1)?;
    let (op, opened) = match mode {
        OpenMode::Read => ("openRead", shared.vfs.open_read(path)),
        OpenMode::Write => ("openWrite", shared.vfs.open_write(path)),
        OpenMode::Append => ("openAppend", shared.vfs.open_append(path)),
    };
    match opened {
        Ok(file) => Ok(vec![methods::new_file(
            file,
            shared.chunk_size,
            &shared.file_meta,
        )]),
        Err(e) => Ok(fail_values(op, e)),
    }
}

/// `openRead(path)` -> file
pub fn open_read(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    open_file(shared, &args, OpenMode::Read)
}

/// `openWrite(path)` -> file
pub fn open_write(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    open_file(shared, &args, OpenMode::Write)
}

/// `openAppend(path)` -> file
pub fn open_append(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    open_file(shared, &args, OpenMode::Append)
}

// ============================================================================
// Mounting
// ============================================================================

/// `mount(source, [point], append)`
pub fn mount(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    let source = args.check_str(1)?;
    let point = args.opt_str(2)?;
    let append = args.to_boolean(3);
    match shared.vfs.mount(source, point, append) {
        Ok(()) => Ok(vec![args.get(1)]),
        Err(e) => Ok(fail_values("mount", e)),
    }
}

/// `mountPoint(source)` -> point or nil
pub fn mount_point(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    let source = args.check_str(1)?;
    Ok(vec![shared.vfs.mount_point(source).map(Value::from).unwrap_or_default()])
}

/// `mountFile(file, name, [point], append)`.
///
/// On success the file belongs to the mount and the handle reads as closed.
pub fn mount_file(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    let handle = methods::check_file(&args, 1)?;
    let name = args.check_str(2)?;
    let point = args.opt_str(3)?;
    let append = args.to_boolean(4);
    let Some(file) = handle.borrow_mut().take() else {
        return Err(HostError::argument(1, "invalid strata.File got"));
    };
    match shared.vfs.mount_file(file, name, point, append) {
        Ok(()) => Ok(vec![args.get(1)]),
        Err((file, e)) => {
            handle.borrow_mut().restore(file);
            Ok(fail_values("mountFile", e))
        }
    }
}

/// `mountMemory(data, name, [point], append)`
pub fn mount_memory(
    shared: &Shared,
    _ctx: &dyn HostContext,
    args: Args<'_>,
) -> AbiResult<Vec<Value>> {
    let data = args.check_bytes(1)?;
    let name = args.check_str(2)?;
    let point = args.opt_str(3)?;
    let append = args.to_boolean(4);
    match shared.vfs.mount_memory(data.to_vec(), name, point, append) {
        Ok(()) => Ok(vec![args.get(1)]),
        Err(e) => Ok(fail_values("mountMemory", e)),
    }
}

/// `unmount(source)`
pub fn unmount(shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    let source = args.check_str(1)?;
    match shared.vfs.unmount(source) {
        Ok(()) => Ok(vec![args.get(1)]),
        Err(e) => Ok(fail_values("unmount", e)),
    }
}

// ============================================================================
// Scalars
// ============================================================================

/// `convInt(fmt, ...)`: reinterpret each value between native and `fmt` order
pub fn conv_int(_shared: &Shared, _ctx: &dyn HostContext, args: Args<'_>) -> AbiResult<Vec<Value>> {
    let fmt = args.check_str(1)?;
    let tag = FormatTag::parse(fmt).map_err(|e| HostError::argument(1, e.to_string()))?;
    (2..=args.len())
        .map(|i| {
            args.check_integer(i)
                .map(|v| Value::Integer(codec::swap(tag, v)))
        })
        .collect()
}
