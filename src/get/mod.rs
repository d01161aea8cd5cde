mod getter;
mod progress;
mod resolve;

use anyhow::{Context, Result, bail};
use indicatif::{MultiProgress, ProgressBar};
use rayon::prelude::*;
use std::io::{self, BufRead, IsTerminal};
use std::time::Duration;

use crate::config::{github_user, load_config};
use crate::lock::RepoLocks;
use crate::paths::local_roots;
use crate::vcs::Vcs;

pub use getter::{Fetcher, GetOptions, Getter, Native, Outcome};
pub use resolve::{Resolver, guess_relative};

use progress::Mark;

/// Command-line switches for `grab get`. Each boolean is OR'd with the
/// matching config key.
#[derive(Debug, Clone, Default)]
pub struct GetFlags {
    pub update: bool,
    pub ssh: bool,
    pub shallow: bool,
    pub silent: bool,
    pub no_recursive: bool,
    pub parallel: bool,
    pub vcs: Option<String>,
    pub jobs: Option<usize>,
}

/// Clone or update every reference in `refs`.
///
/// With no references, one reference per line is read from stdin. Every
/// reference is attempted; the command fails afterwards if any of them did.
///
/// In parallel mode each reference gets its own spinner and backend output
/// is suppressed; the spinner line carries the result or the error.
pub fn cmd_get(refs: Vec<String>, flags: GetFlags) -> Result<()> {
    let cfg = load_config()?;
    let roots = local_roots(&cfg)?;

    let vcs = match flags.vcs.as_deref().or(cfg.vcs.as_deref()) {
        Some(name) => {
            Some(Vcs::from_name(name).with_context(|| format!("unknown vcs {:?}", name))?)
        }
        None => None,
    };
    let opts = GetOptions {
        update: flags.update,
        shallow: flags.shallow || cfg.shallow,
        ssh: flags.ssh || cfg.ssh,
        silent: flags.silent || flags.parallel,
        recursive: cfg.recursive && !flags.no_recursive,
        vcs,
        user: github_user(&cfg),
    };

    let refs = if refs.is_empty() { read_refs()? } else { refs };
    if refs.is_empty() {
        bail!("no repositories given");
    }

    let locks = RepoLocks::new();
    let getter = Getter::new(&opts, &roots, &locks);

    let failed = if flags.parallel {
        let threads = flags.jobs.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("failed to start worker pool")?;
        pool.install(|| get_parallel(&getter, &refs))
    } else {
        get_sequential(&getter, &refs)
    };

    if failed > 0 {
        bail!("{} of {} repositories failed", failed, refs.len());
    }
    Ok(())
}

fn read_refs() -> Result<Vec<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(Vec::new());
    }
    let mut refs = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            refs.push(line.to_string());
        }
    }
    Ok(refs)
}

fn get_sequential<F: Fetcher>(getter: &Getter<'_, F>, refs: &[String]) -> usize {
    let mut failed = 0;
    for r in refs {
        if let Err(e) = getter.get(r) {
            log::error!("{}: {:#}", r, anyhow::Error::new(e));
            failed += 1;
        }
    }
    failed
}

fn get_parallel<F: Fetcher>(getter: &Getter<'_, F>, refs: &[String]) -> usize {
    let mp = MultiProgress::new();
    let run_style = Mark::Running.style();

    let bars: Vec<ProgressBar> = refs
        .iter()
        .map(|r| {
            let pb = mp.add(ProgressBar::new_spinner());
            pb.set_style(run_style.clone());
            pb.set_message(format!("getting {}", r));
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        })
        .collect();

    refs.par_iter()
        .enumerate()
        .map(|(idx, r)| {
            let pb = &bars[idx];
            match getter.get(r) {
                Ok(outcome) => {
                    let (mark, verb) = Mark::finished(&outcome);
                    pb.set_style(mark.style());
                    pb.finish_with_message(format!("{} {}", verb, outcome.path().display()));
                    true
                }
                Err(e) => {
                    pb.set_style(Mark::Failed.style());
                    pb.finish_with_message(format!(
                        "{} (error: {:#})",
                        r,
                        anyhow::Error::new(e)
                    ));
                    false
                }
            }
        })
        .filter(|ok| !ok)
        .count()
}
