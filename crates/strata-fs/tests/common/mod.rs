//! Shared fixtures for the binding integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{Cursor, Write};
use std::rc::Rc;

use strata_fs::config::{MountConfig, VfsConfig};
use strata_fs::{library, Config, Library};
use strata_sdk::{AbiResult, CallResult, HostContext, HostError, NativeFunction, Table, Value};
use strata_vfs::NativeFs;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Minimal engine: "compiles" a chunk into a table describing it
pub struct TestHost {
    pub searchers: RefCell<Vec<NativeFunction>>,
    pub accepts_searchers: bool,
}

impl TestHost {
    pub fn new() -> Self {
        TestHost {
            searchers: RefCell::new(Vec::new()),
            accepts_searchers: true,
        }
    }

    pub fn without_searchers() -> Self {
        TestHost {
            searchers: RefCell::new(Vec::new()),
            accepts_searchers: false,
        }
    }

    /// Run the first installed searcher
    pub fn search(&self, module: &str) -> CallResult {
        let searcher = self.searchers.borrow()[0].clone();
        searcher.call(self, &[Value::from(module)])
    }
}

impl HostContext for TestHost {
    /// Chunks starting with `!` are rejected
    fn compile(&self, chunk: &[u8], chunk_name: &str) -> AbiResult<Value> {
        if chunk.starts_with(b"!") {
            return Err(HostError::Syntax(format!("{}: syntax error", chunk_name)));
        }
        let mut t = Table::new();
        t.set_field("name", Value::from(chunk_name));
        t.set_field("source", Value::string(chunk));
        Ok(Value::table(t))
    }

    fn add_searcher(&self, searcher: NativeFunction) -> bool {
        if self.accepts_searchers {
            self.searchers.borrow_mut().push(searcher);
        }
        self.accepts_searchers
    }
}

/// A library over a temp dir that is both the write dir and mounted at root
pub struct Fixture {
    pub temp: TempDir,
    pub host: TestHost,
    pub backend: Rc<NativeFs>,
    pub lib: Library,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(mut config: Config) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_str().unwrap().to_string();
        config.vfs = VfsConfig {
            write_dir: Some(root.clone()),
            permit_symlinks: false,
            mounts: vec![MountConfig {
                path: root,
                point: None,
                append: true,
            }],
        };
        let host = TestHost::new();
        let backend = Rc::new(NativeFs::new());
        let lib = library::open(&host, backend.clone(), &config).expect("open failed");
        Fixture {
            temp,
            host,
            backend,
            lib,
        }
    }

    /// Write a file on the host side
    pub fn put(&self, path: &str, data: &[u8]) {
        let full = self.temp.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, data).unwrap();
    }

    /// Call a routine that must not raise
    pub fn call(&self, name: &str, args: &[Value]) -> Vec<Value> {
        match self.lib.call(&self.host, name, args) {
            CallResult::Values(values) => values,
            CallResult::Error(e) => panic!("{} raised: {}", name, e),
        }
    }

    /// Call a routine that must raise
    pub fn call_err(&self, name: &str, args: &[Value]) -> HostError {
        match self.lib.call(&self.host, name, args) {
            CallResult::Values(values) => panic!("{} returned {:?}", name, values),
            CallResult::Error(e) => e,
        }
    }

    /// Call a method on a file handle
    pub fn method(&self, file: &Value, name: &str, args: &[Value]) -> CallResult {
        file.as_userdata()
            .expect("not a file handle")
            .call_method(&self.host, name, args)
    }

    /// Call a method that must not raise
    pub fn invoke(&self, file: &Value, name: &str, args: &[Value]) -> Vec<Value> {
        match self.method(file, name, args) {
            CallResult::Values(values) => values,
            CallResult::Error(e) => panic!("{} raised: {}", name, e),
        }
    }

    /// Open a file through the library
    pub fn open(&self, routine: &str, path: &str) -> Value {
        let values = self.call(routine, &[s(path)]);
        assert!(
            values[0].as_userdata().is_some(),
            "{}({}) failed: {:?}",
            routine,
            path,
            values
        );
        values[0].clone()
    }
}

pub fn s(text: &str) -> Value {
    Value::from(text)
}

pub fn int(n: i64) -> Value {
    Value::Integer(n)
}

pub fn failure(message: &str) -> Vec<Value> {
    vec![Value::Nil, Value::from(message)]
}

pub fn zip_image(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn strings(table: &Value) -> Vec<String> {
    table
        .as_table()
        .expect("not a table")
        .borrow()
        .sequence()
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}
