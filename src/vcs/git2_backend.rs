use anyhow::{Context, Result, anyhow, bail};
use git2::{
    Cred, Direction, FetchOptions, Remote, RemoteCallbacks, Repository, SubmoduleUpdateOptions,
    build::{CheckoutBuilder, RepoBuilder},
};
use std::path::Path;

use super::CloneOptions;

/// Callbacks that authenticate through the user's SSH agent, falling back to
/// default credentials when no key is found.
fn callbacks_with_creds() -> RemoteCallbacks<'static> {
    let mut cb = RemoteCallbacks::new();
    cb.credentials(|_url, username_from_url, _allowed| {
        Cred::ssh_key_from_agent(username_from_url.unwrap_or("git")).or_else(|_| Cred::default())
    });
    cb
}

fn fetch_opts_with_creds() -> FetchOptions<'static> {
    let mut fo = FetchOptions::new();
    fo.remote_callbacks(callbacks_with_creds());
    fo
}

/// Initialize and update all submodules for the given repository.
///
/// # Errors
/// Returns an error if any submodule fails to initialize or update.
fn update_submodules(repo: &Repository) -> Result<()> {
    let mut subs = repo.submodules().unwrap_or_default();
    for sm in subs.iter_mut() {
        sm.init(true)?;
        let mut opt = SubmoduleUpdateOptions::new();
        opt.fetch(fetch_opts_with_creds());
        sm.update(true, Some(&mut opt))
            .with_context(|| format!("submodule {}", sm.path().display()))?;
    }
    Ok(())
}

/// Clone `url` into `dest`.
///
/// - `shallow` limits history to the tip commit.
/// - `recursive` initializes and updates submodules afterwards.
///
/// `silent` has no effect; libgit2 never writes to the terminal.
pub fn clone_repo(url: &str, dest: &Path, opts: CloneOptions) -> Result<()> {
    let mut fo = fetch_opts_with_creds();
    if opts.shallow {
        fo.depth(1);
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fo);
    let repo = builder
        .clone(url, dest)
        .with_context(|| format!("git clone {}", url))?;

    if opts.recursive {
        update_submodules(&repo)?;
    }
    Ok(())
}

/// Fetch the upstream of the current branch and fast-forward to it.
///
/// A detached HEAD only gets `origin` fetched. A branch that has diverged
/// from its upstream is left alone and reported as an error, as is a
/// working tree whose local changes would be overwritten. With `recursive`
/// submodules are initialized and updated afterwards, as after a clone.
pub fn update(dir: &Path, recursive: bool) -> Result<()> {
    let repo =
        Repository::open(dir).with_context(|| format!("not a git repository: {}", dir.display()))?;
    fast_forward(&repo)?;
    if recursive {
        update_submodules(&repo)?;
    }
    Ok(())
}

fn fast_forward(repo: &Repository) -> Result<()> {
    let head = repo.head().context("failed to read HEAD")?;
    if !head.is_branch() {
        return fetch_remote(repo, "origin");
    }
    let head_name = head
        .name()
        .ok_or_else(|| anyhow!("invalid reference name"))?
        .to_string();

    let remote_buf = repo
        .branch_upstream_remote(&head_name)
        .with_context(|| format!("{} has no upstream", head_name))?;
    let remote_name = remote_buf
        .as_str()
        .ok_or_else(|| anyhow!("invalid remote name"))?;
    fetch_remote(repo, remote_name)?;

    let upstream_buf = repo.branch_upstream_name(&head_name)?;
    let upstream_name = upstream_buf
        .as_str()
        .ok_or_else(|| anyhow!("invalid upstream name"))?;
    let target = repo.find_reference(upstream_name)?.peel_to_commit()?;

    let annotated = repo.find_annotated_commit(target.id())?;
    let (analysis, _) = repo.merge_analysis(&[&annotated])?;
    if analysis.is_up_to_date() {
        return Ok(());
    }
    if !analysis.is_fast_forward() {
        bail!(
            "{} has diverged from {}; not fast-forwarding",
            head_name,
            upstream_name
        );
    }

    repo.checkout_tree(target.as_object(), Some(CheckoutBuilder::new().safe()))
        .context("local changes would be overwritten")?;
    repo.find_reference(&head_name)?
        .set_target(target.id(), "grab: fast-forward")?;
    Ok(())
}

/// Fetch `remote_name` using its configured refspecs.
fn fetch_remote(repo: &Repository, remote_name: &str) -> Result<()> {
    let mut fo = fetch_opts_with_creds();
    let mut remote = repo.find_remote(remote_name)?;
    remote
        .fetch::<&str>(&[], Some(&mut fo), None)
        .with_context(|| format!("git fetch {}", remote_name))?;
    Ok(())
}

/// Equivalent of `git ls-remote <url>`: succeeds when the remote answers the
/// git protocol with at least one ref.
pub fn ls_remote(url: &str) -> Result<()> {
    let mut remote = Remote::create_detached(url)?;
    let conn = remote
        .connect_auth(Direction::Fetch, Some(callbacks_with_creds()), None)
        .with_context(|| format!("git ls-remote {}", url))?;
    if conn.list()?.is_empty() {
        bail!("no refs advertised by {}", url);
    }
    Ok(())
}
