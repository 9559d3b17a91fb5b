//! `strata ls`: list a directory merged over the search path

use crate::session::Session;

pub fn execute(session: &Session, dir: &str) -> anyhow::Result<()> {
    let vfs = session.vfs();
    let names = vfs.enumerate(dir)?;
    let prefix = dir.trim_matches('/');
    for name in names {
        let full = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        let marker = match vfs.stat(&full) {
            Ok(stat) if stat.filetype == strata_vfs::FileType::Directory => "/",
            _ => "",
        };
        println!("{}{}", name, marker);
    }
    Ok(())
}
