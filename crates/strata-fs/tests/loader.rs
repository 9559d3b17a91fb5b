//! Integration tests for the module searcher

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{s, Fixture, TestHost};
use strata_fs::config::LoaderConfig;
use strata_fs::Config;
use strata_sdk::{CallResult, HostError, Value};
use strata_vfs::{ArchiveInfo, Backend, ErrorCode, NativeFs, RawFile, Stat, Version};

fn found(result: CallResult) -> (Value, Value) {
    match result {
        CallResult::Values(mut values) => {
            assert_eq!(values.len(), 2, "unexpected {:?}", values);
            let path = values.pop().unwrap();
            let chunk = values.pop().unwrap();
            (chunk, path)
        }
        CallResult::Error(e) => panic!("searcher raised: {}", e),
    }
}

fn field(chunk: &Value, name: &str) -> Value {
    chunk.as_table().expect("chunk is a table").borrow().get_field(name)
}

#[test]
fn test_dotted_name_maps_to_source_file() {
    let fx = Fixture::new();
    fx.put("game/util.lua", b"return 42");

    let (chunk, path) = found(fx.host.search("game.util"));
    assert_eq!(path, s("game/util.lua"));
    assert_eq!(field(&chunk, "name"), s("@game/util.lua"));
    assert_eq!(field(&chunk, "source"), s("return 42"));
}

#[test]
fn test_candidate_order() {
    let fx = Fixture::new();
    fx.put("m.lua", b"source");
    fx.put("m.luac", b"compiled");
    assert_eq!(found(fx.host.search("m")).1, s("m.lua"));

    fx.put("m", b"bare");
    assert_eq!(found(fx.host.search("m")).1, s("m"));

    fx.put("only.luac", b"compiled");
    let (chunk, path) = found(fx.host.search("only"));
    assert_eq!(path, s("only.luac"));
    assert_eq!(field(&chunk, "source"), s("compiled"));
}

#[test]
fn test_missing_module_diagnostic() {
    let fx = Fixture::new();
    let result = fx.host.search("a.b").into_result().unwrap();
    assert_eq!(
        result,
        vec![s("\n\tno file 'a/b' in vfs search path\
                \n\tno file 'a/b.lua' in vfs search path\
                \n\tno file 'a/b.luac' in vfs search path")]
    );
}

#[test]
fn test_compile_error_raises() {
    let fx = Fixture::new();
    fx.put("bad.lua", b"!!!");
    let err = fx.host.search("bad").into_result().unwrap_err();
    assert_eq!(
        err,
        HostError::Runtime(
            "error loading module 'bad' from file 'bad.lua':\n\tvfs: @bad.lua: syntax error"
                .to_string()
        )
    );
}

#[test]
fn test_not_initialised() {
    let fx = Fixture::new();
    fx.lib.vfs().deinit().unwrap();
    assert_eq!(
        fx.host.search("anything").into_result().unwrap(),
        vec![s("vfs not init")]
    );
}

#[test]
fn test_modules_from_mounted_archive() {
    let fx = Fixture::new();
    let image = common::zip_image(&[("lib/net.lua", b"return 'net'")]);
    fx.call(
        "mountMemory",
        &[Value::from(image), s("mods.zip"), Value::Nil, Value::Boolean(true)],
    );
    let (_, path) = found(fx.host.search("lib.net"));
    assert_eq!(path, s("lib/net.lua"));
}

#[test]
fn test_configured_suffixes_and_prefix() {
    let config = Config {
        loader: LoaderConfig {
            source_suffix: "st".to_string(),
            compiled_suffix: "stc".to_string(),
            chunk_prefix: "=".to_string(),
        },
        ..Config::default()
    };
    let fx = Fixture::with_config(config);
    fx.put("x.st", b"ok");
    fx.put("y.lua", b"ignored");

    let (chunk, path) = found(fx.host.search("x"));
    assert_eq!(path, s("x.st"));
    assert_eq!(field(&chunk, "name"), s("=x.st"));
    let miss = fx.host.search("y").into_result().unwrap();
    assert!(miss[0].to_str().unwrap().contains("no file 'y.stc'"));
}

#[test]
fn test_non_string_module_name() {
    let fx = Fixture::new();
    let searcher = fx.host.searchers.borrow()[0].clone();
    let err = searcher.call(&fx.host, &[Value::Integer(1)]).into_result().unwrap_err();
    assert!(matches!(err, HostError::Argument { position: 1, .. }));
}

// ============================================================================
// Read failures
// ============================================================================

/// File whose reads fail with an i/o error
struct BrokenFile {
    inner: Box<dyn RawFile>,
    fs: Rc<NativeFs>,
    closes: Rc<Cell<usize>>,
}

impl RawFile for BrokenFile {
    fn read_bytes(&mut self, _buf: &mut [u8]) -> i64 {
        self.fs.set_error_code(ErrorCode::Io);
        -1
    }
    fn write_bytes(&mut self, buf: &[u8]) -> i64 {
        self.inner.write_bytes(buf)
    }
    fn eof(&mut self) -> bool {
        self.inner.eof()
    }
    fn tell(&mut self) -> i64 {
        self.inner.tell()
    }
    fn seek(&mut self, pos: u64) -> bool {
        self.inner.seek(pos)
    }
    fn length(&mut self) -> i64 {
        self.inner.length()
    }
    fn set_buffer(&mut self, size: u64) -> bool {
        self.inner.set_buffer(size)
    }
    fn flush(&mut self) -> bool {
        self.inner.flush()
    }
    fn close(self: Box<Self>) -> bool {
        self.closes.set(self.closes.get() + 1);
        self.inner.close()
    }
}

/// NativeFs that hands out `BrokenFile`s for reading
struct BrokenReads {
    fs: Rc<NativeFs>,
    closes: Rc<Cell<usize>>,
}

impl Backend for BrokenReads {
    fn init(&self, argv0: Option<&str>) -> bool {
        self.fs.init(argv0)
    }
    fn deinit(&self) -> bool {
        self.fs.deinit()
    }
    fn is_init(&self) -> bool {
        self.fs.is_init()
    }
    fn last_error_code(&self) -> ErrorCode {
        self.fs.last_error_code()
    }
    fn set_error_code(&self, code: ErrorCode) {
        self.fs.set_error_code(code)
    }
    fn dir_separator(&self) -> &'static str {
        self.fs.dir_separator()
    }
    fn base_dir(&self) -> Option<String> {
        self.fs.base_dir()
    }
    fn pref_dir(&self, org: &str, app: &str) -> Option<String> {
        self.fs.pref_dir(org, app)
    }
    fn write_dir(&self) -> Option<String> {
        self.fs.write_dir()
    }
    fn set_write_dir(&self, dir: Option<&str>) -> bool {
        self.fs.set_write_dir(dir)
    }
    fn search_path(&self) -> Option<Vec<String>> {
        self.fs.search_path()
    }
    fn cd_rom_dirs(&self) -> Option<Vec<String>> {
        self.fs.cd_rom_dirs()
    }
    fn permit_symbolic_links(&self, allow: bool) {
        self.fs.permit_symbolic_links(allow)
    }
    fn symbolic_links_permitted(&self) -> bool {
        self.fs.symbolic_links_permitted()
    }
    fn set_sane_config(
        &self,
        org: &str,
        app: &str,
        archive_ext: Option<&str>,
        include_cdroms: bool,
        archives_first: bool,
    ) -> bool {
        self.fs
            .set_sane_config(org, app, archive_ext, include_cdroms, archives_first)
    }
    fn supported_archive_types(&self) -> Vec<ArchiveInfo> {
        self.fs.supported_archive_types()
    }
    fn linked_version(&self) -> Version {
        self.fs.linked_version()
    }
    fn mkdir(&self, path: &str) -> bool {
        self.fs.mkdir(path)
    }
    fn delete(&self, path: &str) -> bool {
        self.fs.delete(path)
    }
    fn exists(&self, path: &str) -> bool {
        self.fs.exists(path)
    }
    fn real_dir(&self, path: &str) -> Option<String> {
        self.fs.real_dir(path)
    }
    fn mount_point(&self, source: &str) -> Option<String> {
        self.fs.mount_point(source)
    }
    fn stat(&self, path: &str) -> Option<Stat> {
        self.fs.stat(path)
    }
    fn enumerate(&self, dir: &str) -> Option<Vec<String>> {
        self.fs.enumerate(dir)
    }
    fn open_read(&self, path: &str) -> Option<Box<dyn RawFile>> {
        let inner = self.fs.open_read(path)?;
        Some(Box::new(BrokenFile {
            inner,
            fs: Rc::clone(&self.fs),
            closes: Rc::clone(&self.closes),
        }))
    }
    fn open_write(&self, path: &str) -> Option<Box<dyn RawFile>> {
        self.fs.open_write(path)
    }
    fn open_append(&self, path: &str) -> Option<Box<dyn RawFile>> {
        self.fs.open_append(path)
    }
    fn mount(&self, source: &str, point: Option<&str>, append: bool) -> bool {
        self.fs.mount(source, point, append)
    }
    fn mount_handle(
        &self,
        file: Box<dyn RawFile>,
        name: &str,
        point: Option<&str>,
        append: bool,
    ) -> Result<(), Box<dyn RawFile>> {
        self.fs.mount_handle(file, name, point, append)
    }
    fn mount_memory(&self, data: Vec<u8>, name: &str, point: Option<&str>, append: bool) -> bool {
        self.fs.mount_memory(data, name, point, append)
    }
    fn unmount(&self, source: &str) -> bool {
        self.fs.unmount(source)
    }
}

#[test]
fn test_read_failure_raises_and_closes() {
    let host = TestHost::new();
    let closes = Rc::new(Cell::new(0));
    let backend = Rc::new(BrokenReads {
        fs: Rc::new(NativeFs::new()),
        closes: Rc::clone(&closes),
    });
    let lib = strata_fs::open(&host, backend.clone(), &Config::default()).unwrap();
    let image = common::zip_image(&[("m.lua", b"return 1")]);
    assert!(backend.fs.mount_memory(image, "mods.zip", None, true));

    let err = host.search("m").into_result().unwrap_err();
    assert_eq!(
        err,
        HostError::Runtime(
            "error loading module 'm' from file 'm.lua':\n\tvfs: i/o error".to_string()
        )
    );
    assert_eq!(closes.get(), 1);
    drop(lib);
}
