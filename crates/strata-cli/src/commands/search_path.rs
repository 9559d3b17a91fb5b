//! `strata search-path`

use crate::session::Session;

pub fn execute(session: &Session) -> anyhow::Result<()> {
    let vfs = session.vfs();
    for source in vfs.search_path()? {
        match vfs.mount_point(&source) {
            Some(point) => println!("{}\t{}", source, point),
            None => println!("{}", source),
        }
    }
    Ok(())
}
