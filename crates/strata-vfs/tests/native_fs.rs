//! Integration tests for the native filesystem backend

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use strata_vfs::{Backend, ErrorCode, FileType, NativeFs};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn zip_image(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn u16_le(image: &[u8], at: usize) -> usize {
    u16::from_le_bytes([image[at], image[at + 1]]) as usize
}

/// Rewrite the uncompressed size every central directory record declares,
/// in the zip64 extra field when the entry has one.
fn patch_declared_size(image: &mut [u8], size: u64) {
    let records: Vec<usize> = image
        .windows(4)
        .enumerate()
        .filter(|(_, w)| *w == b"PK\x01\x02")
        .map(|(i, _)| i)
        .collect();
    for start in records {
        let name_len = u16_le(image, start + 28);
        let extra_len = u16_le(image, start + 30);
        let field = start + 24;
        if image[field..field + 4] == [0xFF; 4] {
            let mut at = start + 46 + name_len;
            let end = at + extra_len;
            while at + 4 <= end {
                let (id, len) = (u16_le(image, at), u16_le(image, at + 2));
                if id == 0x0001 {
                    image[at + 4..at + 12].copy_from_slice(&size.to_le_bytes());
                }
                at += 4 + len;
            }
        } else {
            image[field..field + 4].copy_from_slice(&(size as u32).to_le_bytes());
        }
    }
}

fn fs_with_dir(dir: &Path) -> NativeFs {
    let vfs = NativeFs::new();
    assert!(vfs.init(None));
    assert!(vfs.mount(dir.to_str().unwrap(), None, true));
    vfs
}

fn read_all(vfs: &NativeFs, path: &str) -> Vec<u8> {
    let mut file = vfs.open_read(path).expect("open_read failed");
    let data = file.read_to_end().unwrap();
    assert!(file.close());
    data
}

#[test]
fn test_mount_directory_and_read() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("data")).unwrap();
    fs::write(temp.path().join("data/hello.txt"), b"hello world").unwrap();

    let vfs = fs_with_dir(temp.path());
    assert!(vfs.exists("data/hello.txt"));
    assert!(vfs.exists("/data//hello.txt"));
    assert_eq!(read_all(&vfs, "data/hello.txt"), b"hello world");

    let stat = vfs.stat("data").unwrap();
    assert_eq!(stat.filetype, FileType::Directory);
    let stat = vfs.stat("data/hello.txt").unwrap();
    assert_eq!(stat.filetype, FileType::Regular);
    assert_eq!(stat.filesize, 11);
    assert!(stat.modtime > 0);
}

#[test]
fn test_missing_file_sets_not_found() {
    let temp = TempDir::new().unwrap();
    let vfs = fs_with_dir(temp.path());

    assert!(vfs.open_read("nope.txt").is_none());
    assert_eq!(vfs.last_error_code(), ErrorCode::NotFound);
    // Reading the slot clears it
    assert_eq!(vfs.last_error_code(), ErrorCode::Ok);
}

#[test]
fn test_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let vfs = fs_with_dir(temp.path());

    assert!(vfs.open_read("../etc/passwd").is_none());
    assert_eq!(vfs.last_error_code(), ErrorCode::BadFilename);
}

#[test]
fn test_mount_zip_at_mount_point() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("assets.zip");
    fs::write(
        &archive,
        zip_image(&[("maps/one.txt", b"1"), ("readme.txt", b"read me")]),
    )
    .unwrap();

    let vfs = NativeFs::new();
    assert!(vfs.init(None));
    let source = archive.to_str().unwrap();
    assert!(vfs.mount(source, Some("game"), true));

    assert_eq!(vfs.mount_point(source).unwrap(), "/game/");
    assert_eq!(read_all(&vfs, "game/maps/one.txt"), b"1");
    assert_eq!(vfs.real_dir("game/readme.txt").unwrap(), source);
    assert_eq!(vfs.enumerate("").unwrap(), vec!["game".to_string()]);
    assert_eq!(
        vfs.enumerate("game").unwrap(),
        vec!["maps".to_string(), "readme.txt".to_string()]
    );
    assert_eq!(vfs.stat("game").unwrap().filetype, FileType::Directory);

    assert!(vfs.unmount(source));
    assert!(!vfs.exists("game/readme.txt"));
    assert!(!vfs.unmount(source));
    assert_eq!(vfs.last_error_code(), ErrorCode::NotMounted);
}

#[test]
fn test_search_order() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    fs::write(first.path().join("same.txt"), b"first").unwrap();
    fs::write(second.path().join("same.txt"), b"second").unwrap();
    fs::write(second.path().join("only.txt"), b"only").unwrap();

    let vfs = fs_with_dir(first.path());
    assert!(vfs.mount(second.path().to_str().unwrap(), None, true));
    assert_eq!(read_all(&vfs, "same.txt"), b"first");
    assert_eq!(read_all(&vfs, "only.txt"), b"only");
    assert_eq!(
        vfs.enumerate("/").unwrap(),
        vec!["only.txt".to_string(), "same.txt".to_string()]
    );

    // Prepending puts a source in front
    let third = TempDir::new().unwrap();
    fs::write(third.path().join("same.txt"), b"third").unwrap();
    assert!(vfs.mount(third.path().to_str().unwrap(), None, false));
    assert_eq!(read_all(&vfs, "same.txt"), b"third");
    assert_eq!(vfs.search_path().unwrap().len(), 3);
}

#[test]
fn test_mount_memory_image() {
    let vfs = NativeFs::new();
    assert!(vfs.init(None));
    let image = zip_image(&[("a.txt", b"alpha")]);
    assert!(vfs.mount_memory(image, "mem.zip", None, true));
    assert_eq!(read_all(&vfs, "a.txt"), b"alpha");

    assert!(!vfs.mount_memory(b"not a zip".to_vec(), "junk", None, true));
    assert_eq!(vfs.last_error_code(), ErrorCode::Unsupported);
}

#[test]
fn test_zip64_declared_size_is_not_trusted() {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .large_file(true);
    writer.start_file("a.txt", options).unwrap();
    writer.write_all(b"hello").unwrap();
    let mut image = writer.finish().unwrap().into_inner();
    patch_declared_size(&mut image, u64::MAX);

    let vfs = NativeFs::new();
    assert!(vfs.init(None));
    assert!(vfs.mount_memory(image, "big.zip", None, true));
    assert_eq!(read_all(&vfs, "a.txt"), b"hello");
}

#[test]
fn test_oversized_declared_size_reads_actual_bytes() {
    let mut image = zip_image(&[("a.txt", b"hello")]);
    patch_declared_size(&mut image, 0xFFFF_FF00);

    let vfs = NativeFs::new();
    assert!(vfs.init(None));
    assert!(vfs.mount_memory(image, "big.zip", None, true));
    assert_eq!(read_all(&vfs, "a.txt"), b"hello");
}

#[test]
fn test_mount_handle_hands_back_on_failure() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("plain.txt"), b"plain text").unwrap();
    fs::write(temp.path().join("inner.zip"), zip_image(&[("deep.txt", b"deep")])).unwrap();

    let vfs = fs_with_dir(temp.path());

    let file = vfs.open_read("plain.txt").unwrap();
    let mut file = match vfs.mount_handle(file, "plain", None, true) {
        Ok(()) => panic!("plain text mounted as an archive"),
        Err(file) => file,
    };
    assert_eq!(vfs.last_error_code(), ErrorCode::Unsupported);
    // Still usable from where it was
    assert_eq!(file.tell(), 0);
    assert_eq!(file.read_to_end().unwrap(), b"plain text");

    let file = vfs.open_read("inner.zip").unwrap();
    assert!(vfs.mount_handle(file, "inner", Some("inner"), true).is_ok());
    assert_eq!(read_all(&vfs, "inner/deep.txt"), b"deep");
}

#[test]
fn test_write_dir_operations() {
    let temp = TempDir::new().unwrap();
    let vfs = NativeFs::new();
    assert!(vfs.init(None));

    assert!(vfs.open_write("out.txt").is_none());
    assert_eq!(vfs.last_error_code(), ErrorCode::NoWriteDir);

    let dir = temp.path().to_str().unwrap();
    assert!(vfs.set_write_dir(Some(dir)));
    assert_eq!(vfs.write_dir().unwrap(), dir);
    assert!(vfs.mkdir("saves/slot1"));
    assert!(temp.path().join("saves/slot1").is_dir());

    let mut file = vfs.open_write("saves/slot1/game.dat").unwrap();
    assert_eq!(file.write_bytes(b"abc"), 3);
    assert!(file.close());

    let mut file = vfs.open_append("saves/slot1/game.dat").unwrap();
    assert_eq!(file.tell(), 3);
    assert!(file.set_buffer(64));
    assert_eq!(file.write_bytes(b"def"), 3);
    assert_eq!(file.length(), 6);
    assert!(file.close());
    assert_eq!(fs::read(temp.path().join("saves/slot1/game.dat")).unwrap(), b"abcdef");

    assert!(!vfs.delete("saves"));
    assert_eq!(vfs.last_error_code(), ErrorCode::DirNotEmpty);
    assert!(vfs.delete("saves/slot1/game.dat"));
    assert!(vfs.delete("saves/slot1"));

    assert!(vfs.set_write_dir(None));
    assert!(vfs.write_dir().is_none());
}

#[cfg(unix)]
#[test]
fn test_symlinks_refused_by_default() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("target.txt"), b"target").unwrap();
    std::os::unix::fs::symlink(temp.path().join("target.txt"), temp.path().join("link.txt"))
        .unwrap();

    let vfs = fs_with_dir(temp.path());
    assert!(!vfs.symbolic_links_permitted());
    assert!(vfs.open_read("link.txt").is_none());
    assert_eq!(vfs.last_error_code(), ErrorCode::SymlinkForbidden);
    assert_eq!(vfs.enumerate("").unwrap(), vec!["target.txt".to_string()]);

    vfs.permit_symbolic_links(true);
    assert_eq!(read_all(&vfs, "link.txt"), b"target");
}

#[cfg(unix)]
#[test]
fn test_socket_stats_as_other() {
    let temp = TempDir::new().unwrap();
    let _listener = std::os::unix::net::UnixListener::bind(temp.path().join("sock")).unwrap();

    let vfs = fs_with_dir(temp.path());
    assert_eq!(vfs.stat("sock").unwrap().filetype, FileType::Other);
}

#[test]
fn test_supported_archive_types() {
    let vfs = NativeFs::new();
    let types = vfs.supported_archive_types();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].extension, "ZIP");
    assert_eq!(vfs.cd_rom_dirs().unwrap(), Vec::<String>::new());
}
