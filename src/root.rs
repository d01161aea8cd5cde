use anyhow::Result;

use crate::config::load_config;
use crate::paths::local_roots;

/// CLI command: print the primary root, or every root with `all`.
pub fn cmd_root(all: bool) -> Result<()> {
    let cfg = load_config()?;
    let roots = local_roots(&cfg)?;
    if all {
        for r in roots.iter() {
            println!("{}", r.display());
        }
    } else {
        println!("{}", roots.primary().display());
    }
    Ok(())
}
