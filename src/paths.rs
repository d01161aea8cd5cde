use anyhow::{Context, Result};
use std::{
    env, fs,
    path::{self, PathBuf},
};

use crate::config::Config;
use crate::local::Roots;

/// Environment variable overriding the configured roots (a path list).
pub const ROOT_ENV: &str = "GRAB_ROOT";

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

/// `$XDG_CONFIG_HOME/grab/config.toml`, or `~/.config/grab/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    let base = match env::var_os("XDG_CONFIG_HOME").filter(|x| !x.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => home_dir().context("HOME is not set")?.join(".config"),
    };
    Ok(base.join("grab").join("config.toml"))
}

fn expand_tilde(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(raw),
    };
    match home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(raw),
    }
}

/// Resolve the local roots.
///
/// Precedence: `$GRAB_ROOT` (split like `PATH`), then `roots` from the
/// config, then `~/grab`. Existing roots are canonicalized so they compare
/// equal to the working directory; duplicates are dropped, order is kept.
pub fn local_roots(cfg: &Config) -> Result<Roots> {
    let raw: Vec<PathBuf> = match env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
        Some(v) => env::split_paths(&v)
            .filter(|p| !p.as_os_str().is_empty())
            .collect(),
        None if !cfg.roots.is_empty() => cfg.roots.iter().map(|r| expand_tilde(r)).collect(),
        None => vec![
            home_dir()
                .context("HOME is not set; configure roots in config.toml")?
                .join("grab"),
        ],
    };

    let mut dirs: Vec<PathBuf> = Vec::with_capacity(raw.len());
    for r in raw {
        let r = path::absolute(&r).unwrap_or(r);
        let r = fs::canonicalize(&r).unwrap_or(r);
        if !dirs.contains(&r) {
            dirs.push(r);
        }
    }
    Roots::new(dirs).context("no local roots configured")
}
