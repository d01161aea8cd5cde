use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Set of local repository paths already claimed by some `get` call.
///
/// Constructed once per process and shared by reference. Entries are never
/// removed: a path is admitted at most once for the lifetime of the registry,
/// and a later caller is turned away immediately even if the first caller's
/// clone or update is still running.
#[derive(Debug, Default)]
pub struct RepoLocks {
    seen: Mutex<HashSet<PathBuf>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path`. Returns `true` for the first caller only.
    pub fn admit(&self, path: &Path) -> bool {
        // A poisoned set is still a valid set; keep admitting.
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(path.to_path_buf())
    }
}
