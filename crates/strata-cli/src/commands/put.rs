//! `strata put`: copy stdin into the write directory

use std::io::Read;

use anyhow::Context;
use strata_fs::FileHandle;

use crate::session::Session;

pub fn execute(session: &Session, path: &str, append: bool) -> anyhow::Result<()> {
    let mut data = Vec::new();
    std::io::stdin().read_to_end(&mut data)?;

    let vfs = session.vfs();
    let file = if append {
        vfs.open_append(path)
    } else {
        vfs.open_write(path)
    }
    .with_context(|| format!("cannot open '{}' for writing", path))?;

    let mut handle = FileHandle::new(file, session.chunk_size());
    let written = handle.write(&[data.as_slice()])?;
    handle.close()?;
    tracing::info!(path, written, "stored");
    Ok(())
}
