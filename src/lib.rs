//! Crate entry point for **grab**.
//!
//! This library provides the implementation behind the `grab` CLI: turning
//! loose repository references into canonical URLs, mapping them onto a
//! `<root>/<host>/<path>` tree, and cloning or updating them with the right
//! version control backend.
//! The `pub use` re-exports make the commands and the main types available
//! from the crate root.

mod config;
mod error;
mod get;
mod list;
mod local;
mod lock;
mod paths;
mod remote;
mod root;
mod vcs;

pub use config::{Config, github_user, load_config, load_config_from};
pub use error::{ErrorKind, GetError, Operation};
pub use get::{
    Fetcher, GetFlags, GetOptions, Getter, Native, Outcome, Resolver, cmd_get, guess_relative,
};
pub use list::{Found, cmd_list, scan_roots};
pub use local::{LocalRepository, Roots};
pub use lock::RepoLocks;
pub use paths::{ROOT_ENV, config_path, local_roots};
pub use remote::RemoteRepository;
pub use remote::reference::{parse_reference, to_ssh};
pub use root::cmd_root;
pub use vcs::{CloneOptions, UpdateOptions, Vcs};
