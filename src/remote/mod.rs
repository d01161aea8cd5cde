//! Remote repositories and how to find their backend.
//!
//! [`RemoteRepository`] is chosen from the URL's host. Well-known hosts
//! answer `vcs()` without touching the network; anything else is asked
//! through its go-import metadata and, failing that, probed with each
//! backend in turn.

mod go_import;
pub mod reference;

use url::Url;

use crate::vcs::Vcs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRepository {
    GitHub(Url),
    GitHubGist(Url),
    Other(Url),
}

impl RemoteRepository {
    pub fn new(url: Url) -> Self {
        match url.host_str() {
            Some("github.com") => RemoteRepository::GitHub(url),
            Some("gist.github.com") => RemoteRepository::GitHubGist(url),
            _ => RemoteRepository::Other(url),
        }
    }

    pub fn url(&self) -> &Url {
        match self {
            RemoteRepository::GitHub(u)
            | RemoteRepository::GitHubGist(u)
            | RemoteRepository::Other(u) => u,
        }
    }

    /// Cheap well-formedness check; never touches the network.
    pub fn is_valid(&self) -> bool {
        match self {
            RemoteRepository::GitHub(u) => {
                !u.path().starts_with("/blog/") && path_segments(u).len() >= 2
            }
            RemoteRepository::GitHubGist(u) => !path_segments(u).is_empty(),
            RemoteRepository::Other(u) => u.host_str().is_some_and(|h| !h.is_empty()),
        }
    }

    /// The backend serving this repository and the URL to fetch it from.
    ///
    /// The fetch URL can differ from [`url`](Self::url): a GitHub URL that
    /// points inside a repository is cut back to `owner/repo`, and a
    /// go-import tag can name a different host altogether.
    pub fn vcs(&self) -> Option<(Vcs, Url)> {
        self.vcs_with(|vcs, url| vcs.probe(url))
    }

    /// Like [`vcs`](Self::vcs), with `probe` deciding whether a backend
    /// answers at a URL when nothing else identifies it.
    pub fn vcs_with(&self, probe: impl Fn(Vcs, &Url) -> bool) -> Option<(Vcs, Url)> {
        match self {
            RemoteRepository::GitHub(u) => Some((Vcs::Git, github_repo_url(u))),
            RemoteRepository::GitHubGist(u) => Some((Vcs::Git, u.clone())),
            RemoteRepository::Other(u) => other_vcs(u, probe),
        }
    }
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path().split('/').filter(|s| !s.is_empty()).collect()
}

fn github_repo_url(url: &Url) -> Url {
    let had_suffix = url.path().trim_end_matches('/').ends_with(".git");
    let path = url.path().trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).take(2).collect();

    let mut repo = url.clone();
    let mut new_path = format!("/{}", segs.join("/"));
    if had_suffix {
        new_path.push_str(".git");
    }
    repo.set_path(&new_path);
    repo.set_query(None);
    repo.set_fragment(None);
    repo
}

fn other_vcs(url: &Url, probe: impl Fn(Vcs, &Url) -> bool) -> Option<(Vcs, Url)> {
    match url.scheme() {
        "svn" | "svn+ssh" => return Some((Vcs::Subversion, url.clone())),
        "git" => return Some((Vcs::Git, url.clone())),
        _ => {}
    }
    if url.path().trim_end_matches('/').ends_with(".git") {
        return Some((Vcs::Git, url.clone()));
    }

    if matches!(url.scheme(), "http" | "https") {
        let found = go_import::http_client().and_then(|c| go_import::lookup(&c, url));
        match found {
            Ok(Some(hit)) => return Some(hit),
            Ok(None) => log::debug!("no go-import entry for {}", url),
            Err(e) => log::debug!("go-import lookup for {} failed: {:#}", url, e),
        }
    }

    Vcs::PROBE_ORDER
        .into_iter()
        .find(|&vcs| probe(vcs, url))
        .map(|vcs| (vcs, url.clone()))
}
