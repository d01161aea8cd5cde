use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{GetError, Operation};
use crate::get::resolve::Resolver;
use crate::local::{LocalRepository, Roots};
use crate::lock::RepoLocks;
use crate::remote::RemoteRepository;
use crate::vcs::{CloneOptions, UpdateOptions, Vcs};

/// Everything the orchestrator asks of a backend: probing an unknown
/// remote, cloning and updating.
///
/// [`Native`] hands the work to the backend; tests substitute a recorder.
pub trait Fetcher: Sync {
    fn probe(&self, vcs: Vcs, url: &Url) -> bool;
    fn clone_repo(&self, vcs: Vcs, url: &Url, dest: &Path, opts: CloneOptions)
    -> anyhow::Result<()>;
    fn update(&self, vcs: Vcs, dir: &Path, opts: UpdateOptions) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Native;

impl Fetcher for Native {
    fn probe(&self, vcs: Vcs, url: &Url) -> bool {
        vcs.probe(url)
    }

    fn clone_repo(
        &self,
        vcs: Vcs,
        url: &Url,
        dest: &Path,
        opts: CloneOptions,
    ) -> anyhow::Result<()> {
        vcs.clone_repo(url, dest, opts)
    }

    fn update(&self, vcs: Vcs, dir: &Path, opts: UpdateOptions) -> anyhow::Result<()> {
        vcs.update(dir, opts)
    }
}

/// Settings shared by every `get` in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOptions {
    pub update: bool,
    pub shallow: bool,
    pub ssh: bool,
    pub silent: bool,
    pub recursive: bool,
    /// Backend forced by the user instead of asking the remote.
    pub vcs: Option<Vcs>,
    /// Owner assumed for a bare `repo` reference.
    pub user: Option<String>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            update: false,
            shallow: false,
            ssh: false,
            silent: false,
            recursive: true,
            vcs: None,
            user: None,
        }
    }
}

/// What a successful `get` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Cloned(PathBuf),
    Updated(PathBuf),
    /// Already on disk and no update was asked for.
    Exists(PathBuf),
    /// Another call in this process claimed the path first.
    Duplicate(PathBuf),
}

impl Outcome {
    pub fn path(&self) -> &Path {
        match self {
            Outcome::Cloned(p)
            | Outcome::Updated(p)
            | Outcome::Exists(p)
            | Outcome::Duplicate(p) => p,
        }
    }
}

fn event(verb: &str, detail: impl std::fmt::Display) {
    log::info!("{:>8} {}", verb, detail);
}

/// Clones or updates repositories, claiming each local path at most once.
pub struct Getter<'a, F = Native> {
    opts: &'a GetOptions,
    roots: &'a Roots,
    locks: &'a RepoLocks,
    fetcher: F,
}

impl<'a> Getter<'a, Native> {
    pub fn new(opts: &'a GetOptions, roots: &'a Roots, locks: &'a RepoLocks) -> Self {
        Self::with_fetcher(opts, roots, locks, Native)
    }
}

impl<'a, F: Fetcher> Getter<'a, F> {
    pub fn with_fetcher(
        opts: &'a GetOptions,
        roots: &'a Roots,
        locks: &'a RepoLocks,
        fetcher: F,
    ) -> Self {
        Self {
            opts,
            roots,
            locks,
            fetcher,
        }
    }

    /// Resolve `arg` and clone or update it.
    pub fn get(&self, arg: &str) -> Result<Outcome, GetError> {
        let remote = Resolver::new(self.roots, self.opts.user.as_deref(), self.opts.ssh)
            .resolve(arg)?;
        self.get_remote(&remote)
    }

    /// Clone `remote` if it is not on disk yet, otherwise update it when
    /// asked to. A path already claimed in this process is skipped.
    pub fn get_remote(&self, remote: &RemoteRepository) -> Result<Outcome, GetError> {
        let remote_url = remote.url();
        let local = LocalRepository::from_url(remote_url, self.roots);
        let path = &local.full_path;

        match fs::metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return self.clone_fresh(remote, &local);
            }
            Err(source) => {
                return Err(GetError::Stat {
                    path: path.clone(),
                    source,
                });
            }
        }

        if !self.opts.update {
            event("exists", path.display());
            return Ok(Outcome::Exists(path.clone()));
        }

        let (vcs, repo_path) = local
            .vcs()
            .ok_or_else(|| GetError::VcsDetection { path: path.clone() })?;
        if !self.locks.admit(&repo_path) {
            event("skip", repo_path.display());
            return Ok(Outcome::Duplicate(repo_path));
        }
        event("update", repo_path.display());
        let opts = UpdateOptions {
            silent: self.opts.silent,
            recursive: self.opts.recursive,
        };
        self.fetcher
            .update(vcs, &repo_path, opts)
            .map_err(|source| GetError::Backend {
                op: Operation::Update,
                target: repo_path.display().to_string(),
                source,
            })?;
        Ok(Outcome::Updated(repo_path))
    }

    fn clone_fresh(
        &self,
        remote: &RemoteRepository,
        local: &LocalRepository,
    ) -> Result<Outcome, GetError> {
        let remote_url = remote.url();
        let (vcs, repo_url, repo_path) = match self.opts.vcs {
            Some(vcs) => (vcs, remote_url.clone(), local.full_path.clone()),
            None => {
                let (vcs, repo_url) = remote
                    .vcs_with(|vcs, url| self.fetcher.probe(vcs, url))
                    .ok_or_else(|| GetError::VcsNotFound {
                        url: remote_url.to_string(),
                    })?;
                // The repository may be served from a prefix of the URL we were
                // given (github.com/owner/repo/sub); keep it at that prefix.
                let fetch = repo_url.as_str();
                let fetch = fetch.strip_suffix(".git").unwrap_or(fetch);
                let repo_path = if remote_url.as_str().starts_with(fetch) {
                    LocalRepository::under_root(&repo_url, &local.root_path).full_path
                } else {
                    local.full_path.clone()
                };
                (vcs, repo_url, repo_path)
            }
        };

        if !self.locks.admit(&repo_path) {
            event("skip", repo_path.display());
            return Ok(Outcome::Duplicate(repo_path));
        }
        event("clone", format!("{} -> {}", repo_url, repo_path.display()));
        let opts = CloneOptions {
            shallow: self.opts.shallow,
            silent: self.opts.silent,
            recursive: self.opts.recursive,
        };
        self.fetcher
            .clone_repo(vcs, &repo_url, &repo_path, opts)
            .map_err(|source| GetError::Backend {
                op: Operation::Clone,
                target: repo_url.to_string(),
                source,
            })?;
        Ok(Outcome::Cloned(repo_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use httpmock::prelude::*;
    use rayon::prelude::*;
    use std::sync::Mutex;
    use tempfile::{TempDir, tempdir};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Clone {
            vcs: Vcs,
            url: String,
            dest: PathBuf,
            shallow: bool,
            silent: bool,
        },
        Update {
            vcs: Vcs,
            dir: PathBuf,
            silent: bool,
            recursive: bool,
        },
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        probed: Mutex<Vec<Vcs>>,
        /// Backend that answers a probe; `None` means every probe fails.
        answers: Option<Vcs>,
        fail: bool,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Fetcher for &Recorder {
        fn probe(&self, vcs: Vcs, _url: &Url) -> bool {
            self.probed.lock().unwrap().push(vcs);
            self.answers == Some(vcs)
        }

        fn clone_repo(
            &self,
            vcs: Vcs,
            url: &Url,
            dest: &Path,
            opts: CloneOptions,
        ) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(Call::Clone {
                vcs,
                url: url.to_string(),
                dest: dest.to_path_buf(),
                shallow: opts.shallow,
                silent: opts.silent,
            });
            if self.fail {
                anyhow::bail!("remote hung up");
            }
            Ok(())
        }

        fn update(&self, vcs: Vcs, dir: &Path, opts: UpdateOptions) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(Call::Update {
                vcs,
                dir: dir.to_path_buf(),
                silent: opts.silent,
                recursive: opts.recursive,
            });
            Ok(())
        }
    }

    fn setup() -> (TempDir, Roots) {
        let td = tempdir().unwrap();
        let roots = Roots::new(vec![td.path().to_path_buf()]).unwrap();
        (td, roots)
    }

    #[test]
    fn clones_fresh_github_repository() {
        let (td, roots) = setup();
        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let out = getter.get("github.com/example/repo").unwrap();

        let dest = td.path().join("github.com/example/repo");
        assert_eq!(out, Outcome::Cloned(dest.clone()));
        assert_eq!(
            rec.calls(),
            vec![Call::Clone {
                vcs: Vcs::Git,
                url: "https://github.com/example/repo".into(),
                dest,
                shallow: false,
                silent: false,
            }]
        );
    }

    #[test]
    fn second_request_for_same_path_is_skipped() {
        let (td, roots) = setup();
        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        getter.get("https://github.com/example/repo").unwrap();
        let out = getter.get("git@github.com:example/repo.git").unwrap();

        assert_eq!(
            out,
            Outcome::Duplicate(td.path().join("github.com/example/repo"))
        );
        assert_eq!(rec.calls().len(), 1);
    }

    #[test]
    fn concurrent_requests_clone_once() {
        let (_td, roots) = setup();
        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let refs = [
            "github.com/example/repo",
            "https://github.com/example/repo",
            "example/repo",
            "https://github.com/example/repo.git",
            "https://github.com/example/repo/tree/main",
        ];
        let outcomes: Vec<Outcome> = refs
            .par_iter()
            .map(|r| getter.get(r).unwrap())
            .collect();

        let cloned = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Cloned(_)))
            .count();
        assert_eq!(cloned, 1);
        assert_eq!(rec.calls().len(), 1);
    }

    #[test]
    fn subpath_reference_clones_repository_root() {
        let (td, roots) = setup();
        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let out = getter.get("github.com/example/repo/sub/pkg").unwrap();

        let dest = td.path().join("github.com/example/repo");
        assert_eq!(out, Outcome::Cloned(dest.clone()));
        assert_eq!(
            rec.calls(),
            vec![Call::Clone {
                vcs: Vcs::Git,
                url: "https://github.com/example/repo".into(),
                dest,
                shallow: false,
                silent: false,
            }]
        );
    }

    #[test]
    fn forced_vcs_keeps_mapped_path_and_url() {
        let (td, roots) = setup();
        let opts = GetOptions {
            vcs: Some(Vcs::Mercurial),
            shallow: true,
            silent: true,
            ..GetOptions::default()
        };
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        getter.get("https://hg.example.org/team/app").unwrap();

        assert_eq!(
            rec.calls(),
            vec![Call::Clone {
                vcs: Vcs::Mercurial,
                url: "https://hg.example.org/team/app".into(),
                dest: td.path().join("hg.example.org/team/app"),
                shallow: true,
                silent: true,
            }]
        );
    }

    #[test]
    fn existing_path_without_update_is_a_no_op() {
        let (td, roots) = setup();
        let dest = td.path().join("github.com/example/repo");
        fs::create_dir_all(dest.join(".git")).unwrap();

        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let out = getter.get("github.com/example/repo").unwrap();
        assert_eq!(out, Outcome::Exists(dest));
        assert!(rec.calls().is_empty());
    }

    #[test]
    fn update_runs_once_for_existing_clone() {
        let (td, roots) = setup();
        let dest = td.path().join("github.com/example/repo");
        fs::create_dir_all(dest.join(".git")).unwrap();

        let opts = GetOptions {
            update: true,
            silent: true,
            ..GetOptions::default()
        };
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        assert_eq!(
            getter.get("github.com/example/repo").unwrap(),
            Outcome::Updated(dest.clone())
        );
        assert_eq!(
            getter.get("example/repo").unwrap(),
            Outcome::Duplicate(dest.clone())
        );
        assert_eq!(
            rec.calls(),
            vec![Call::Update {
                vcs: Vcs::Git,
                dir: dest,
                silent: true,
                recursive: true,
            }]
        );
    }

    #[test]
    fn update_targets_detected_repository_root() {
        let (td, roots) = setup();
        let repo = td.path().join("github.com/example/repo");
        fs::create_dir_all(repo.join(".hg")).unwrap();
        fs::create_dir_all(repo.join("sub")).unwrap();

        let opts = GetOptions {
            update: true,
            ..GetOptions::default()
        };
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let out = getter.get("github.com/example/repo/sub").unwrap();
        assert_eq!(out, Outcome::Updated(repo.clone()));
        assert_eq!(
            rec.calls(),
            vec![Call::Update {
                vcs: Vcs::Mercurial,
                dir: repo,
                silent: false,
                recursive: true,
            }]
        );
    }

    #[test]
    fn update_without_metadata_fails_detection() {
        let (td, roots) = setup();
        fs::create_dir_all(td.path().join("github.com/example/repo")).unwrap();

        let opts = GetOptions {
            update: true,
            ..GetOptions::default()
        };
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let err = getter.get("github.com/example/repo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VcsDetection);
        assert!(rec.calls().is_empty());
    }

    #[test]
    fn backend_failure_is_reported_with_url() {
        let (_td, roots) = setup();
        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let err = getter.get("github.com/example/repo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(
            err.to_string(),
            "clone failed for https://github.com/example/repo"
        );
    }

    #[cfg(unix)]
    #[test]
    fn stat_errors_other_than_not_found_propagate() {
        let (td, roots) = setup();
        // A file where a directory is expected makes the lookup fail with
        // NotADirectory rather than NotFound.
        fs::create_dir_all(td.path().join("github.com")).unwrap();
        fs::write(td.path().join("github.com/example"), "").unwrap();

        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let err = getter.get("github.com/example/repo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Stat);
        assert!(rec.calls().is_empty());
    }

    #[test]
    fn go_import_on_same_host_clones_at_repository_root() {
        let server = MockServer::start();
        let addr = server.address().to_string();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/x/tools/cmd")
                .query_param("go-get", "1");
            then.status(200).body(format!(
                r#"<meta name="go-import" content="{addr}/x/tools git http://{addr}/x/tools">"#
            ));
        });

        let (td, roots) = setup();
        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let out = getter.get(&server.url("/x/tools/cmd")).unwrap();

        mock.assert();
        let fetch = Url::parse(&server.url("/x/tools")).unwrap();
        let dest = LocalRepository::under_root(&fetch, td.path()).full_path;
        assert!(dest.ends_with("x/tools"));
        assert_eq!(out, Outcome::Cloned(dest.clone()));
        assert_eq!(
            rec.calls(),
            vec![Call::Clone {
                vcs: Vcs::Git,
                url: fetch.to_string(),
                dest,
                shallow: false,
                silent: false,
            }]
        );
        assert!(rec.probed.lock().unwrap().is_empty());
    }

    #[test]
    fn go_import_on_other_host_keeps_mapped_path() {
        let server = MockServer::start();
        let addr = server.address().to_string();
        server.mock(|when, then| {
            when.method(GET)
                .path("/x/tools/cmd")
                .query_param("go-get", "1");
            then.status(200).body(format!(
                r#"<meta name="go-import" content="{addr}/x/tools hg https://hg.example.org/tools">"#
            ));
        });

        let (_td, roots) = setup();
        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let canonical = Url::parse(&server.url("/x/tools/cmd")).unwrap();
        let out = getter.get(canonical.as_str()).unwrap();

        let dest = LocalRepository::from_url(&canonical, &roots).full_path;
        assert!(dest.ends_with("x/tools/cmd"));
        assert_eq!(out, Outcome::Cloned(dest.clone()));
        assert_eq!(
            rec.calls(),
            vec![Call::Clone {
                vcs: Vcs::Mercurial,
                url: "https://hg.example.org/tools".into(),
                dest,
                shallow: false,
                silent: false,
            }]
        );
    }

    #[test]
    fn unknown_backend_falls_back_to_probes() {
        // No go-import page: the lookup gets a 404.
        let server = MockServer::start();

        let (td, roots) = setup();
        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder {
            answers: Some(Vcs::Mercurial),
            ..Recorder::default()
        };
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let canonical = Url::parse(&server.url("/team/app")).unwrap();
        let out = getter.get(canonical.as_str()).unwrap();

        let dest = LocalRepository::under_root(&canonical, td.path()).full_path;
        assert_eq!(out, Outcome::Cloned(dest));
        assert_eq!(
            *rec.probed.lock().unwrap(),
            vec![Vcs::Git, Vcs::Mercurial]
        );
    }

    #[test]
    fn no_backend_answering_is_vcs_not_found() {
        let server = MockServer::start();

        let (_td, roots) = setup();
        let opts = GetOptions::default();
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        let canonical = Url::parse(&server.url("/team/app")).unwrap();
        let err = getter.get(canonical.as_str()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::VcsNotFound);
        assert_eq!(
            err.to_string(),
            format!("could not find version control system: {}", canonical)
        );
        assert_eq!(*rec.probed.lock().unwrap(), Vcs::PROBE_ORDER.to_vec());
        assert!(rec.calls().is_empty());
    }

    #[test]
    fn update_passes_submodule_preference() {
        let (td, roots) = setup();
        let dest = td.path().join("github.com/example/repo");
        fs::create_dir_all(dest.join(".git")).unwrap();

        let opts = GetOptions {
            update: true,
            recursive: false,
            ..GetOptions::default()
        };
        let locks = RepoLocks::new();
        let rec = Recorder::default();
        let getter = Getter::with_fetcher(&opts, &roots, &locks, &rec);

        getter.get("github.com/example/repo").unwrap();
        assert_eq!(
            rec.calls(),
            vec![Call::Update {
                vcs: Vcs::Git,
                dir: dest,
                silent: false,
                recursive: false,
            }]
        );
    }
}
