use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::local::{Roots, slash_join};
use crate::vcs::Vcs;

/// A checkout found under one of the roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub vcs: Vcs,
    pub full_path: PathBuf,
    /// `host/path` below the root it was found in.
    pub rel_path: String,
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Collect every directory holding VCS metadata below `root`.
///
/// Hidden directories are skipped and a checkout is never descended into,
/// so nested working copies (submodules, vendored trees) are not listed.
/// A missing root yields nothing.
pub fn scan_root(root: &Path) -> io::Result<Vec<Found>> {
    let mut out = Vec::new();
    let mut it = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_type().is_dir() && !is_hidden(e));

    while let Some(entry) = it.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => {
                continue;
            }
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                log::debug!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        let Some(vcs) = Vcs::detect(entry.path()) else {
            continue;
        };
        let rel_path = entry
            .path()
            .strip_prefix(root)
            .map(slash_join)
            .unwrap_or_default();
        out.push(Found {
            vcs,
            full_path: entry.path().to_path_buf(),
            rel_path,
        });
        it.skip_current_dir();
    }
    Ok(out)
}

/// Scan every root in order; a checkout reachable from two nested roots is
/// reported once, under the first root that found it.
pub fn scan_roots(roots: &Roots) -> io::Result<Vec<Found>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for root in roots.iter() {
        for found in scan_root(root)? {
            if seen.insert(found.full_path.clone()) {
                out.push(found);
            }
        }
    }
    Ok(out)
}
