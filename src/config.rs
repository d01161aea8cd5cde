use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::Path;

use crate::paths::config_path;

/// Settings loaded from `config.toml`.
///
/// Every key is optional; a missing file is the same as an empty one.
///
/// Example TOML:
/// ```toml
/// roots     = ["~/src", "~/work"]
/// user      = "octocat"
/// ssh       = true
/// shallow   = false
/// vcs       = "git"
/// recursive = true
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Local roots, primary first. `~/` is expanded.
    pub roots: Vec<String>,
    /// Owner assumed for a bare `repo` reference.
    pub user: Option<String>,
    pub ssh: bool,
    pub shallow: bool,
    /// Backend to use instead of asking the remote.
    pub vcs: Option<String>,
    /// Initialize submodules after cloning.
    pub recursive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            user: None,
            ssh: false,
            shallow: false,
            vcs: None,
            recursive: true,
        }
    }
}

/// Load `config.toml` from its default location (see [`config_path`]).
pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    load_config_from(&p)
}

/// Load and parse the config file at `path`.
///
/// # Errors
/// - the file exists but cannot be read
/// - the file is not valid TOML or has keys of the wrong type
pub fn load_config_from(path: &Path) -> Result<Config> {
    let txt = match fs::read_to_string(path) {
        Ok(txt) => txt,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let cfg: Config =
        toml::from_str(&txt).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(cfg)
}

/// Owner for bare `repo` references: config `user`, then `GITHUB_USER`,
/// then `USER`.
pub fn github_user(cfg: &Config) -> Option<String> {
    cfg.user
        .clone()
        .filter(|u| !u.is_empty())
        .or_else(|| env::var("GITHUB_USER").ok().filter(|u| !u.is_empty()))
        .or_else(|| env::var("USER").ok().filter(|u| !u.is_empty()))
}
