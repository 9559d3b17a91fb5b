//! `strata stat`: status record of a path

use serde::Serialize;
use strata_fs::marshal::file_type_name;

use crate::session::Session;

#[derive(Serialize)]
struct StatReport<'a> {
    path: &'a str,
    #[serde(rename = "type")]
    filetype: &'static str,
    readonly: bool,
    size: i64,
    mtime: i64,
    ctime: i64,
    atime: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    real_dir: Option<String>,
}

pub fn execute(session: &Session, path: &str, json: bool) -> anyhow::Result<()> {
    let vfs = session.vfs();
    let stat = vfs.stat(path)?;
    let report = StatReport {
        path,
        filetype: file_type_name(stat.filetype),
        readonly: stat.readonly,
        size: stat.filesize,
        mtime: stat.modtime,
        ctime: stat.createtime,
        atime: stat.accesstime,
        real_dir: vfs.real_dir(path),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Path:     {}", report.path);
        println!("Type:     {}", report.filetype);
        println!("Size:     {}", report.size);
        println!("Readonly: {}", report.readonly);
        println!("Modified: {}", report.mtime);
        if let Some(dir) = &report.real_dir {
            println!("Source:   {}", dir);
        }
    }
    Ok(())
}
