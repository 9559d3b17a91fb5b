//! `strata which`: resolve a module like the searcher does

use crate::session::Session;

pub fn execute(session: &Session, module: &str) -> anyhow::Result<()> {
    let vfs = session.vfs();
    let (path, file) = session.loader().locate(vfs, module)?;
    if let Err(e) = file.close() {
        tracing::warn!(path = %path, error = %e, "failed to close module file");
    }
    match vfs.real_dir(&path) {
        Some(source) => println!("{}\t{}", path, source),
        None => println!("{}", path),
    }
    Ok(())
}
