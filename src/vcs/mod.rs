//! Version control backends.
//!
//! [`Vcs`] is a closed set of backends. Git goes through `git2`
//! (`git2_backend`); the others shell out to their command-line tools
//! (`command`). Callers only see `clone_repo`, `update`, `probe` and the
//! on-disk detection in [`Vcs::detect`].

mod command;
mod git2_backend;

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use url::Url;

use command::Tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vcs {
    Git,
    GitSvn,
    Mercurial,
    Subversion,
}

/// Knobs for a fresh checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneOptions {
    pub shallow: bool,
    pub silent: bool,
    pub recursive: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub silent: bool,
    pub recursive: bool,
}

impl Vcs {
    /// Probe order used when a remote gives no hint.
    pub const PROBE_ORDER: [Vcs; 3] = [Vcs::Git, Vcs::Mercurial, Vcs::Subversion];

    /// Parse a backend name as accepted by `--vcs` and the config file.
    pub fn from_name(name: &str) -> Option<Vcs> {
        match name.trim().to_ascii_lowercase().as_str() {
            "git" | "github" => Some(Vcs::Git),
            "git-svn" => Some(Vcs::GitSvn),
            "hg" | "mercurial" => Some(Vcs::Mercurial),
            "svn" | "subversion" => Some(Vcs::Subversion),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Vcs::Git => "git",
            Vcs::GitSvn => "git-svn",
            Vcs::Mercurial => "hg",
            Vcs::Subversion => "svn",
        }
    }

    /// Identify the backend whose metadata lives directly inside `dir`.
    pub fn detect(dir: &Path) -> Option<Vcs> {
        let git = dir.join(".git");
        if git.exists() {
            // git-svn keeps its state under .git/svn
            if git.join("svn").is_dir() {
                return Some(Vcs::GitSvn);
            }
            return Some(Vcs::Git);
        }
        if dir.join(".hg").is_dir() {
            return Some(Vcs::Mercurial);
        }
        if dir.join(".svn").is_dir() {
            return Some(Vcs::Subversion);
        }
        None
    }

    /// Check out `url` into `dest`. The parent of `dest` is created first.
    pub fn clone_repo(self, url: &Url, dest: &Path, opts: CloneOptions) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let dest_str: &str = &dest.to_string_lossy();
        match self {
            Vcs::Git => git2_backend::clone_repo(url.as_str(), dest, opts),
            Vcs::GitSvn => {
                let mut args = vec!["svn", "clone"];
                if opts.shallow {
                    args.extend(["-r", "HEAD"]);
                }
                args.extend([url.as_str(), dest_str]);
                Tool::Git.run(&args, None, opts.silent)
            }
            Vcs::Mercurial => {
                Tool::Hg.run(&["clone", url.as_str(), dest_str], None, opts.silent)
            }
            Vcs::Subversion => Tool::Svn.run(
                &["checkout", url.as_str(), dest_str],
                None,
                opts.silent,
            ),
        }
    }

    /// Bring the checkout at `dir` up to date with its remote.
    ///
    /// `recursive` only matters for git, whose submodules are refreshed
    /// after the fast-forward.
    pub fn update(self, dir: &Path, opts: UpdateOptions) -> Result<()> {
        let silent = opts.silent;
        match self {
            Vcs::Git => git2_backend::update(dir, opts.recursive),
            Vcs::GitSvn => Tool::Git.run(&["svn", "rebase"], Some(dir), silent),
            Vcs::Mercurial => Tool::Hg.run(&["pull", "--update"], Some(dir), silent),
            Vcs::Subversion => Tool::Svn.run(&["update"], Some(dir), silent),
        }
    }

    /// Ask the remote whether it speaks this protocol. Any failure is a no.
    pub fn probe(self, url: &Url) -> bool {
        let res = match self {
            Vcs::Git | Vcs::GitSvn => git2_backend::ls_remote(url.as_str()),
            Vcs::Mercurial => Tool::Hg.run(&["identify", url.as_str()], None, true),
            Vcs::Subversion => Tool::Svn.run(&["info", url.as_str()], None, true),
        };
        match res {
            Ok(()) => true,
            Err(e) => {
                log::debug!("{} probe of {} failed: {:#}", self, url, e);
                false
            }
        }
    }
}

impl fmt::Display for Vcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
