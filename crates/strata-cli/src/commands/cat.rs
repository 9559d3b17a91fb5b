//! `strata cat`: dump a file, raw or as integers

use std::io::Write;

use anyhow::Context;
use strata_fs::{FileHandle, FormatTag, ReadRequest, ReadValue};

use crate::session::Session;

pub fn execute(session: &Session, path: &str, format: Option<&str>) -> anyhow::Result<()> {
    let file = session
        .vfs()
        .open_read(path)
        .with_context(|| format!("cannot open '{}'", path))?;
    let mut handle = FileHandle::new(file, session.chunk_size());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match format {
        None => {
            if let ReadValue::Bytes(data) = handle.read_one(ReadRequest::ReadAll)? {
                out.write_all(&data)?;
            }
        }
        Some(format) => {
            let tag: FormatTag = format.parse()?;
            while !handle.eof()? {
                if let ReadValue::Integer(n) = handle.read_one(ReadRequest::Scalar(tag))? {
                    writeln!(out, "{}", n)?;
                }
            }
        }
    }
    out.flush()?;
    handle.close()?;
    Ok(())
}
