//! Symbolic function registry for the strata library
//!
//! Registers the file-handle methods into the handle metatable and the
//! library routines into the library table.

use std::rc::Rc;

use strata_sdk::{Args, FunctionRegistry};

use crate::library::{self, Routine, Shared};

/// Register every `strata.File` method (plus metamethods)
pub fn register_file_methods(registry: &mut FunctionRegistry) {
    registry.register("close", |ctx, args| crate::methods::close(ctx, args));
    registry.register("eof", |ctx, args| crate::methods::eof(ctx, args));
    registry.register("tell", |ctx, args| crate::methods::tell(ctx, args));
    registry.register("seek", |ctx, args| crate::methods::seek(ctx, args));
    registry.register("length", |ctx, args| crate::methods::length(ctx, args));
    registry.register("bufSize", |ctx, args| crate::methods::buf_size(ctx, args));
    registry.register("flush", |ctx, args| crate::methods::flush(ctx, args));
    registry.register("read", |ctx, args| crate::methods::read(ctx, args));
    registry.register("write", |ctx, args| crate::methods::write(ctx, args));
    registry.register("writeInt", |ctx, args| crate::methods::write_int(ctx, args));
    registry.register("__len", |ctx, args| crate::methods::len(ctx, args));
    registry.register("__tostring", |ctx, args| crate::methods::tostring(ctx, args));
}

/// Register every library routine bound to `shared`
pub fn register_library(registry: &mut FunctionRegistry, shared: &Rc<Shared>) {
    register_environment(registry, shared);
    register_namespace(registry, shared);
    register_files(registry, shared);
    register_mounting(registry, shared);
    bind(registry, shared, "convInt", library::conv_int);
}

fn bind(registry: &mut FunctionRegistry, shared: &Rc<Shared>, name: &str, routine: Routine) {
    let shared = Rc::clone(shared);
    registry.register(name, move |ctx, args| {
        routine(&shared, ctx, Args::new(args)).into()
    });
}

fn register_environment(registry: &mut FunctionRegistry, shared: &Rc<Shared>) {
    bind(registry, shared, "supportedArchiveTypes", library::supported_archive_types);
    bind(registry, shared, "version", library::version);
    bind(registry, shared, "saneConfig", library::sane_config);
    bind(registry, shared, "prefDir", library::pref_dir);
    bind(registry, shared, "writeDir", library::write_dir);
    bind(registry, shared, "cdRomDirs", library::cd_rom_dirs);
    bind(registry, shared, "searchPath", library::search_path);
    bind(registry, shared, "useSymlink", library::use_symlink);
    bind(registry, shared, "lastError", library::last_error);
}

fn register_namespace(registry: &mut FunctionRegistry, shared: &Rc<Shared>) {
    bind(registry, shared, "mkdir", library::mkdir);
    bind(registry, shared, "delete", library::delete);
    bind(registry, shared, "exists", library::exists);
    bind(registry, shared, "realDir", library::real_dir);
    bind(registry, shared, "stat", library::stat);
    bind(registry, shared, "files", library::files);
}

fn register_files(registry: &mut FunctionRegistry, shared: &Rc<Shared>) {
    bind(registry, shared, "openRead", library::open_read);
    bind(registry, shared, "openWrite", library::open_write);
    bind(registry, shared, "openAppend", library::open_append);
    registry.register("close", |ctx, args| crate::methods::close(ctx, args));
}

fn register_mounting(registry: &mut FunctionRegistry, shared: &Rc<Shared>) {
    bind(registry, shared, "mount", library::mount);
    bind(registry, shared, "mountPoint", library::mount_point);
    bind(registry, shared, "mountFile", library::mount_file);
    bind(registry, shared, "mountMemory", library::mount_memory);
    bind(registry, shared, "unmount", library::unmount);
}
