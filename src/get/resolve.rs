use std::env;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

use crate::error::GetError;
use crate::local::Roots;
use crate::remote::RemoteRepository;
use crate::remote::reference::{parse_reference, to_ssh};

/// Turns command-line references into validated remotes.
pub struct Resolver<'a> {
    roots: &'a Roots,
    user: Option<&'a str>,
    ssh: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(roots: &'a Roots, user: Option<&'a str>, ssh: bool) -> Self {
        Self { roots, user, ssh }
    }

    /// Resolve `arg` relative to the process working directory.
    pub fn resolve(&self, arg: &str) -> Result<RemoteRepository, GetError> {
        let cwd = env::current_dir().ok();
        self.resolve_from(arg, cwd.as_deref())
    }

    /// Resolve `arg`, treating `./x` and `../x` as paths below `cwd`.
    pub fn resolve_from(
        &self,
        arg: &str,
        cwd: Option<&Path>,
    ) -> Result<RemoteRepository, GetError> {
        let guessed = cwd.and_then(|wd| guess_relative(arg, wd, self.roots));
        if let Some(g) = &guessed {
            log::info!("{:>8} relative {:?} to {:?}", "resolved", arg, g);
        }
        let reference = guessed.as_deref().unwrap_or(arg);

        let mut url = parse_reference(reference, self.user)?;
        if self.ssh {
            url = to_ssh(&url)?;
        }

        let remote = RemoteRepository::new(url);
        if !remote.is_valid() {
            return Err(GetError::InvalidRemote {
                url: remote.url().to_string(),
            });
        }
        Ok(remote)
    }
}

/// Guess a URL for a `./x` or `../x` argument from the root it lies under.
///
/// The path is resolved lexically against `cwd`; the nearest root (the one
/// leaving the shortest suffix) supplies `host/path`, and `https` is assumed.
pub fn guess_relative(arg: &str, cwd: &Path, roots: &Roots) -> Option<String> {
    let first = arg.split(['/', MAIN_SEPARATOR]).next()?;
    if first != "." && first != ".." {
        return None;
    }
    let abs = clean(&cwd.join(arg));
    roots.relative_suffix(&abs).map(|s| format!("https://{}", s))
}

/// Lexically normalize `path`: drop `.` and fold `..` into its parent.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(c);
                }
            }
            other => out.push(other),
        }
    }
    out
}
