//! `strata archives`: supported archive types

use serde_json::json;

use crate::session::Session;

pub fn execute(session: &Session, json: bool) -> anyhow::Result<()> {
    let types = session.vfs().supported_archive_types();
    if json {
        let list: Vec<_> = types
            .iter()
            .map(|info| {
                json!({
                    "ext": info.extension,
                    "desc": info.description,
                    "author": info.author,
                    "url": info.url,
                    "supportsSymlinks": info.supports_symlinks,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        for info in &types {
            println!("{:<6} {}", info.extension, info.description);
        }
    }
    Ok(())
}
