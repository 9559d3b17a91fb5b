//! `strata version`

use crate::session::Session;

pub fn execute(session: &Session) -> anyhow::Result<()> {
    let v = session.vfs().version();
    println!("strata {}", env!("CARGO_PKG_VERSION"));
    println!("vfs    {}.{}.{}", v.major, v.minor, v.patch);
    println!("sep    {}", session.vfs().dir_separator());
    if let Some(base) = session.vfs().base_dir() {
        println!("base   {}", base);
    }
    Ok(())
}
