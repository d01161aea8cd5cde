//! Mapping between canonical URLs and directories under the local roots.
//!
//! Every repository lives at `<root>/<host>/<path>`. The forward direction
//! ([`LocalRepository::from_url`]) always uses the primary root; the reverse
//! direction ([`Roots::relative_suffix`]) accepts any root so a directory
//! under a secondary root can still be turned back into a URL.

use std::path::{Component, Path, PathBuf};
use url::Url;

use crate::vcs::Vcs;

/// Ordered, non-empty list of local root directories. The first is primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    dirs: Vec<PathBuf>,
}

impl Roots {
    /// Returns `None` when `dirs` is empty.
    pub fn new(dirs: Vec<PathBuf>) -> Option<Self> {
        if dirs.is_empty() {
            None
        } else {
            Some(Self { dirs })
        }
    }

    pub fn primary(&self) -> &Path {
        &self.dirs[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    /// Strip the nearest matching root from an absolute `path`.
    ///
    /// Among all roots that are a prefix of `path`, the one leaving the
    /// shortest remainder wins. The remainder is joined with `/` so it can be
    /// used as `host/path` directly. Returns `None` when no root matches or
    /// the path is a root itself.
    pub fn relative_suffix(&self, path: &Path) -> Option<String> {
        self.iter()
            .filter_map(|root| path.strip_prefix(root).ok())
            .map(slash_join)
            .filter(|s| !s.is_empty())
            .min_by_key(|s| s.len())
    }
}

pub(crate) fn slash_join(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// A repository location on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    pub full_path: PathBuf,
    pub root_path: PathBuf,
}

impl LocalRepository {
    /// Map `url` to `<primary root>/<host>/<path>`.
    pub fn from_url(url: &Url, roots: &Roots) -> Self {
        Self::under_root(url, roots.primary())
    }

    /// Map `url` beneath an explicit `root`.
    pub fn under_root(url: &Url, root: &Path) -> Self {
        let mut full_path = root.join(host_dir(url));
        let path = url.path().trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        for seg in path.split('/').filter(|s| !s.is_empty()) {
            full_path.push(seg);
        }
        Self {
            full_path,
            root_path: root.to_path_buf(),
        }
    }

    /// Detect the VCS from on-disk metadata.
    ///
    /// Walks from `full_path` upwards, stopping before `root_path`, and
    /// returns the backend together with the directory that holds the
    /// metadata. That directory may be an ancestor of `full_path`.
    pub fn vcs(&self) -> Option<(Vcs, PathBuf)> {
        let mut dir = self.full_path.as_path();
        while dir.starts_with(&self.root_path) && dir != self.root_path {
            if let Some(vcs) = Vcs::detect(dir) {
                return Some((vcs, dir.to_path_buf()));
            }
            dir = dir.parent()?;
        }
        None
    }
}

/// Directory name for the URL authority. A non-default port is kept, with
/// `:` swapped out on Windows where it is not a legal path character.
fn host_dir(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) if cfg!(windows) => format!("{host}_{port}"),
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
