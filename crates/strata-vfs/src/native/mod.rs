//! The native backend: host directories and ZIP archives.
//!
//! Mounts are searched in order. A path is served by the first mount whose
//! mount point prefixes it and whose source holds the entry. Writes go to the
//! write directory only.

mod archive;
mod file;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use crate::backend::{Backend, RawFile};
use crate::error::{ErrorCode, ErrorState};
use crate::path::{display_mount_point, sanitize, strip_mount_point, to_host};
use crate::stat::{ArchiveInfo, Stat, Version};

use archive::{Archive, DirArchive, ZipArchive};
use file::NativeFile;

struct Mount {
    source: String,
    point: String,
    archive: Box<dyn Archive>,
}

#[derive(Default)]
struct State {
    initialized: bool,
    base_dir: Option<String>,
    write_dir: Option<PathBuf>,
    mounts: Vec<Mount>,
    permit_symlinks: bool,
}

/// Filesystem over the host OS.
#[derive(Default)]
pub struct NativeFs {
    errors: ErrorState,
    state: RefCell<State>,
}

/// True when `path` names a directory that only exists as a prefix of `point`
fn is_virtual_dir(path: &str, point: &str) -> bool {
    if point.is_empty() {
        return false;
    }
    path.is_empty()
        || point
            .strip_prefix(path)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// The component of `point` directly below `path`
fn next_component<'a>(path: &str, point: &'a str) -> Option<&'a str> {
    let rest = if path.is_empty() {
        point
    } else {
        point.strip_prefix(path)?.strip_prefix('/')?
    };
    rest.split('/').next().filter(|c| !c.is_empty())
}

fn with_trailing_separator(path: &Path) -> String {
    let mut s = path.to_string_lossy().into_owned();
    if !s.ends_with(MAIN_SEPARATOR_STR) {
        s.push_str(MAIN_SEPARATOR_STR);
    }
    s
}

fn version_part(part: &str) -> u8 {
    part.parse().unwrap_or(0)
}

impl NativeFs {
    /// Create an uninitialised filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the error of a failed result, keeping the value of a good one
    fn report<T>(&self, result: Result<T, ErrorCode>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(code) => {
                self.errors.set(code);
                None
            }
        }
    }

    fn flag(&self, result: Result<(), ErrorCode>) -> bool {
        self.report(result).is_some()
    }

    fn require_init(&self) -> Result<(), ErrorCode> {
        if self.state.borrow().initialized {
            Ok(())
        } else {
            Err(ErrorCode::NotInitialized)
        }
    }

    fn sanitize_point(point: Option<&str>) -> Result<String, ErrorCode> {
        sanitize(point.unwrap_or(""))
    }

    fn insert_mount(&self, mount: Mount, append: bool) {
        tracing::debug!(
            source = %mount.source,
            point = %display_mount_point(&mount.point),
            append,
            "mounted"
        );
        let mut state = self.state.borrow_mut();
        if append {
            state.mounts.push(mount);
        } else {
            state.mounts.insert(0, mount);
        }
    }

    fn is_mounted(&self, source: &str) -> bool {
        self.state
            .borrow()
            .mounts
            .iter()
            .any(|m| m.source == source)
    }

    fn lookup(&self, path: &str) -> Result<(Stat, String), ErrorCode> {
        let path = sanitize(path)?;
        let state = self.state.borrow();
        let mut error = ErrorCode::NotFound;
        for mount in &state.mounts {
            if let Some(rel) = strip_mount_point(&path, &mount.point) {
                match mount.archive.stat(rel, state.permit_symlinks) {
                    Ok(stat) => return Ok((stat, mount.source.clone())),
                    Err(ErrorCode::NotFound) => {}
                    Err(code) if error == ErrorCode::NotFound => error = code,
                    Err(_) => {}
                }
            } else if is_virtual_dir(&path, &mount.point) {
                return Ok((Stat::directory(true), mount.source.clone()));
            }
        }
        Err(error)
    }

    fn write_path(&self, path: &str) -> Result<PathBuf, ErrorCode> {
        self.require_init()?;
        let path = sanitize(path)?;
        let state = self.state.borrow();
        let root = state.write_dir.as_ref().ok_or(ErrorCode::NoWriteDir)?;
        if path.is_empty() {
            return Err(ErrorCode::InvalidArgument);
        }
        Ok(to_host(root, &path))
    }

    fn open_writer(&self, path: &str, append: bool) -> Result<Box<dyn RawFile>, ErrorCode> {
        let host = self.write_path(path)?;
        if host.is_dir() {
            return Err(ErrorCode::NotAFile);
        }
        let mut file = if append {
            OpenOptions::new().write(true).create(true).open(&host)
        } else {
            File::create(&host)
        }
        .map_err(|e| ErrorCode::from(&e))?;
        if append {
            file.seek(SeekFrom::End(0)).map_err(|e| ErrorCode::from(&e))?;
        }
        Ok(Box::new(NativeFile::host_writer(file, self.errors.clone())))
    }

    fn mount_source(&self, source: &str, point: Option<&str>, append: bool) -> Result<(), ErrorCode> {
        self.require_init()?;
        let point = Self::sanitize_point(point)?;
        if self.is_mounted(source) {
            return Ok(());
        }
        let host = PathBuf::from(source);
        let meta = fs::metadata(&host).map_err(|e| ErrorCode::from(&e))?;
        let archive: Box<dyn Archive> = if meta.is_dir() {
            Box::new(DirArchive::new(host))
        } else {
            let data = fs::read(&host).map_err(|e| ErrorCode::from(&e))?;
            Box::new(ZipArchive::new(data)?)
        };
        self.insert_mount(
            Mount {
                source: source.to_string(),
                point,
                archive,
            },
            append,
        );
        Ok(())
    }

    fn mount_image(&self, data: Vec<u8>, name: &str, point: &str, append: bool) -> Result<(), ErrorCode> {
        let archive = ZipArchive::new(data)?;
        self.insert_mount(
            Mount {
                source: name.to_string(),
                point: point.to_string(),
                archive: Box::new(archive),
            },
            append,
        );
        Ok(())
    }

    fn sane_config(
        &self,
        org: &str,
        app: &str,
        archive_ext: Option<&str>,
        archives_first: bool,
    ) -> Result<(), ErrorCode> {
        self.require_init()?;
        let pref = self.pref_dir(org, app).ok_or_else(|| self.errors.take())?;
        if !self.set_write_dir(Some(&pref)) {
            return Err(self.errors.take());
        }
        self.mount_source(&pref, None, false)?;
        let base = self.state.borrow().base_dir.clone();
        if let Some(base) = base {
            if let Err(code) = self.mount_source(&base, None, true) {
                tracing::debug!(base = %base, error = %code, "base dir not mounted");
            }
        }

        if let Some(ext) = archive_ext {
            let suffix = format!(".{}", ext.to_ascii_lowercase());
            let names = self.enumerate("").unwrap_or_default();
            for name in names {
                if !name.to_ascii_lowercase().ends_with(&suffix) {
                    continue;
                }
                let Some(dir) = self.real_dir(&name) else {
                    continue;
                };
                let archive = Path::new(&dir).join(&name);
                let archive = archive.to_string_lossy();
                if let Err(code) = self.mount_source(&archive, None, !archives_first) {
                    tracing::debug!(archive = %archive, error = %code, "archive not mounted");
                }
            }
        }
        Ok(())
    }
}

impl Backend for NativeFs {
    fn init(&self, argv0: Option<&str>) -> bool {
        let mut state = self.state.borrow_mut();
        if state.initialized {
            self.errors.set(ErrorCode::IsInitialized);
            return false;
        }
        let exe = match argv0 {
            Some(arg) => Some(PathBuf::from(arg)),
            None => std::env::current_exe().ok(),
        };
        state.base_dir = exe
            .as_deref()
            .and_then(Path::parent)
            .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
            .map(with_trailing_separator);
        state.initialized = true;
        tracing::debug!(base_dir = ?state.base_dir, "filesystem initialised");
        true
    }

    fn deinit(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.initialized {
            self.errors.set(ErrorCode::NotInitialized);
            return false;
        }
        *state = State::default();
        tracing::debug!("filesystem shut down");
        true
    }

    fn is_init(&self) -> bool {
        self.state.borrow().initialized
    }

    fn last_error_code(&self) -> ErrorCode {
        self.errors.take()
    }

    fn set_error_code(&self, code: ErrorCode) {
        self.errors.set(code);
    }

    fn dir_separator(&self) -> &'static str {
        MAIN_SEPARATOR_STR
    }

    fn base_dir(&self) -> Option<String> {
        self.state.borrow().base_dir.clone()
    }

    fn pref_dir(&self, org: &str, app: &str) -> Option<String> {
        let result = (|| {
            let org = sanitize(org)?;
            let app = sanitize(app)?;
            if app.is_empty() {
                return Err(ErrorCode::InvalidArgument);
            }
            let mut dir = dirs::data_dir().ok_or(ErrorCode::OsError)?;
            if !org.is_empty() {
                dir.push(&org);
            }
            dir.push(&app);
            fs::create_dir_all(&dir).map_err(|e| ErrorCode::from(&e))?;
            Ok(with_trailing_separator(&dir))
        })();
        self.report(result)
    }

    fn write_dir(&self) -> Option<String> {
        self.state
            .borrow()
            .write_dir
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
    }

    fn set_write_dir(&self, dir: Option<&str>) -> bool {
        let result = (|| {
            self.require_init()?;
            let dir = match dir {
                Some(dir) => {
                    let path = PathBuf::from(dir);
                    let meta = fs::metadata(&path).map_err(|e| ErrorCode::from(&e))?;
                    if !meta.is_dir() {
                        return Err(ErrorCode::NotAFile);
                    }
                    Some(path)
                }
                None => None,
            };
            tracing::debug!(write_dir = ?dir, "write dir changed");
            self.state.borrow_mut().write_dir = dir;
            Ok(())
        })();
        self.flag(result)
    }

    fn search_path(&self) -> Option<Vec<String>> {
        Some(
            self.state
                .borrow()
                .mounts
                .iter()
                .map(|m| m.source.clone())
                .collect(),
        )
    }

    fn cd_rom_dirs(&self) -> Option<Vec<String>> {
        Some(Vec::new())
    }

    fn permit_symbolic_links(&self, allow: bool) {
        self.state.borrow_mut().permit_symlinks = allow;
    }

    fn symbolic_links_permitted(&self) -> bool {
        self.state.borrow().permit_symlinks
    }

    fn set_sane_config(
        &self,
        org: &str,
        app: &str,
        archive_ext: Option<&str>,
        _include_cdroms: bool,
        archives_first: bool,
    ) -> bool {
        let result = self.sane_config(org, app, archive_ext, archives_first);
        self.flag(result)
    }

    fn supported_archive_types(&self) -> Vec<ArchiveInfo> {
        vec![ArchiveInfo {
            extension: "ZIP".to_string(),
            description: "PkZip/WinZip/Info-Zip compatible".to_string(),
            author: "zip-rs contributors".to_string(),
            url: "https://github.com/zip-rs/zip2".to_string(),
            supports_symlinks: false,
        }]
    }

    fn linked_version(&self) -> Version {
        Version {
            major: version_part(env!("CARGO_PKG_VERSION_MAJOR")),
            minor: version_part(env!("CARGO_PKG_VERSION_MINOR")),
            patch: version_part(env!("CARGO_PKG_VERSION_PATCH")),
        }
    }

    fn mkdir(&self, path: &str) -> bool {
        let result = self
            .write_path(path)
            .and_then(|host| fs::create_dir_all(host).map_err(|e| ErrorCode::from(&e)));
        self.flag(result)
    }

    fn delete(&self, path: &str) -> bool {
        let result = self.write_path(path).and_then(|host| {
            let meta = fs::symlink_metadata(&host).map_err(|e| ErrorCode::from(&e))?;
            let removed = if meta.is_dir() {
                fs::remove_dir(&host)
            } else {
                fs::remove_file(&host)
            };
            removed.map_err(|e| ErrorCode::from(&e))
        });
        self.flag(result)
    }

    fn exists(&self, path: &str) -> bool {
        self.lookup(path).is_ok()
    }

    fn real_dir(&self, path: &str) -> Option<String> {
        let result = self.lookup(path).map(|(_, source)| source);
        self.report(result)
    }

    fn mount_point(&self, source: &str) -> Option<String> {
        let result = self
            .state
            .borrow()
            .mounts
            .iter()
            .find(|m| m.source == source)
            .map(|m| display_mount_point(&m.point))
            .ok_or(ErrorCode::NotMounted);
        self.report(result)
    }

    fn stat(&self, path: &str) -> Option<Stat> {
        let result = self.lookup(path).map(|(stat, _)| stat);
        self.report(result)
    }

    fn enumerate(&self, dir: &str) -> Option<Vec<String>> {
        let result = sanitize(dir).map(|dir| {
            let state = self.state.borrow();
            let mut names = BTreeSet::new();
            for mount in &state.mounts {
                if let Some(rel) = strip_mount_point(&dir, &mount.point) {
                    if let Ok(found) = mount.archive.enumerate(rel, state.permit_symlinks) {
                        names.extend(found);
                    }
                } else if let Some(component) = next_component(&dir, &mount.point) {
                    names.insert(component.to_string());
                }
            }
            names.into_iter().collect()
        });
        self.report(result)
    }

    fn open_read(&self, path: &str) -> Option<Box<dyn RawFile>> {
        let result = (|| {
            let path = sanitize(path)?;
            let state = self.state.borrow();
            let mut error = ErrorCode::NotFound;
            for mount in &state.mounts {
                let Some(rel) = strip_mount_point(&path, &mount.point) else {
                    continue;
                };
                match mount.archive.open(rel, state.permit_symlinks, &self.errors) {
                    Ok(file) => return Ok(Box::new(file) as Box<dyn RawFile>),
                    Err(ErrorCode::NotFound) => {}
                    Err(code) if error == ErrorCode::NotFound => error = code,
                    Err(_) => {}
                }
            }
            Err(error)
        })();
        self.report(result)
    }

    fn open_write(&self, path: &str) -> Option<Box<dyn RawFile>> {
        let result = self.open_writer(path, false);
        self.report(result)
    }

    fn open_append(&self, path: &str) -> Option<Box<dyn RawFile>> {
        let result = self.open_writer(path, true);
        self.report(result)
    }

    fn mount(&self, source: &str, point: Option<&str>, append: bool) -> bool {
        let result = self.mount_source(source, point, append);
        self.flag(result)
    }

    fn mount_handle(
        &self,
        mut file: Box<dyn RawFile>,
        name: &str,
        point: Option<&str>,
        append: bool,
    ) -> Result<(), Box<dyn RawFile>> {
        let point = match self.require_init().and_then(|_| Self::sanitize_point(point)) {
            Ok(point) => point,
            Err(code) => {
                self.errors.set(code);
                return Err(file);
            }
        };
        if self.is_mounted(name) {
            file.close();
            return Ok(());
        }

        let start = file.tell();
        let Some(data) = file.read_to_end() else {
            let code = self.errors.take();
            if start >= 0 {
                file.seek(start as u64);
            }
            self.errors.set(code);
            return Err(file);
        };
        match self.mount_image(data, name, &point, append) {
            Ok(()) => {
                if !file.close() {
                    tracing::warn!(name, "mounted file did not close cleanly");
                }
                Ok(())
            }
            Err(code) => {
                if start >= 0 {
                    file.seek(start as u64);
                }
                self.errors.set(code);
                Err(file)
            }
        }
    }

    fn mount_memory(&self, data: Vec<u8>, name: &str, point: Option<&str>, append: bool) -> bool {
        let result = (|| {
            self.require_init()?;
            let point = Self::sanitize_point(point)?;
            if self.is_mounted(name) {
                return Ok(());
            }
            self.mount_image(data, name, &point, append)
        })();
        self.flag(result)
    }

    fn unmount(&self, source: &str) -> bool {
        let mut state = self.state.borrow_mut();
        match state.mounts.iter().position(|m| m.source == source) {
            Some(index) => {
                state.mounts.remove(index);
                tracing::debug!(source, "unmounted");
                true
            }
            None => {
                self.errors.set(ErrorCode::NotMounted);
                false
            }
        }
    }
}
