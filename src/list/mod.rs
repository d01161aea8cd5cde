use anyhow::{Context, Result};

use crate::config::load_config;
use crate::paths::local_roots;

mod fs_scan;

pub use fs_scan::{Found, scan_roots};

/// CLI command: print every checkout under the local roots.
///
/// Each line is `host/path` relative to the root it lives in, or the full
/// path with `full_path`. When `query` is given only lines containing it
/// are printed.
///
/// Example output:
/// ```text
/// github.com/example/repo
/// hg.example.org/proj
/// ```
pub fn cmd_list(query: Option<&str>, full_path: bool) -> Result<()> {
    let cfg = load_config()?;
    let roots = local_roots(&cfg)?;
    let found = scan_roots(&roots).context("failed to scan local roots")?;

    for f in &found {
        let line = if full_path {
            f.full_path.display().to_string()
        } else {
            f.rel_path.clone()
        };
        if query.is_none_or(|q| line.contains(q)) {
            println!("{}", line);
        }
    }
    Ok(())
}
