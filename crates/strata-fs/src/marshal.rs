//! Conversion of lists and status records into script tables

use strata_sdk::{Table, TableRef, Value};
use strata_vfs::{ArchiveInfo, FileType, Stat};

/// Append `items` to the sequence part of `target` (or a new table).
///
/// Entries go after the existing ones, so repeated calls with the same table
/// accumulate.
pub fn push_list<I, S>(items: I, target: Option<TableRef>) -> TableRef
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let table = target.unwrap_or_else(|| Table::new().into_ref());
    {
        let mut t = table.borrow_mut();
        let start = t.raw_len();
        for (i, item) in items.into_iter().enumerate() {
            t.raw_set_index(start + i + 1, Value::string(item));
        }
    }
    table
}

/// Script name of a file type
pub fn file_type_name(filetype: FileType) -> &'static str {
    match filetype {
        FileType::Regular => "file",
        FileType::Directory => "dir",
        FileType::Symlink => "symlink",
        FileType::Other => "other",
        FileType::Unknown => "unknown",
    }
}

/// Fill a status table: type, readonly, size, mtime, ctime, atime
pub fn stat_table(stat: &Stat, target: Option<TableRef>) -> TableRef {
    let table = target.unwrap_or_else(|| Table::with_capacity(0, 6).into_ref());
    {
        let mut t = table.borrow_mut();
        t.set_field("type", Value::from(file_type_name(stat.filetype)));
        t.set_field("readonly", Value::Boolean(stat.readonly));
        t.set_field("size", Value::Integer(stat.filesize));
        t.set_field("mtime", Value::Integer(stat.modtime));
        t.set_field("ctime", Value::Integer(stat.createtime));
        t.set_field("atime", Value::Integer(stat.accesstime));
    }
    table
}

fn archive_table(info: &ArchiveInfo) -> Value {
    let mut t = Table::with_capacity(0, 5);
    t.set_field("ext", Value::from(info.extension.as_str()));
    t.set_field("desc", Value::from(info.description.as_str()));
    t.set_field("author", Value::from(info.author.as_str()));
    t.set_field("url", Value::from(info.url.as_str()));
    t.set_field("supportsSymlinks", Value::Boolean(info.supports_symlinks));
    Value::table(t)
}

/// Append one record per archive type. Returns the table and how many were added.
pub fn archive_list(infos: &[ArchiveInfo], target: Option<TableRef>) -> (TableRef, usize) {
    let table = target.unwrap_or_else(|| Table::with_capacity(infos.len(), 0).into_ref());
    {
        let mut t = table.borrow_mut();
        let start = t.raw_len();
        for (i, info) in infos.iter().enumerate() {
            t.raw_set_index(start + i + 1, archive_table(info));
        }
    }
    (table, infos.len())
}
