//! Errors returned by a single `get` call.
//!
//! Every variant carries the argument, URL or path it is about, so the
//! message printed at the CLI boundary is self-contained. None of these are
//! retried; a skipped duplicate is not an error.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`GetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    SchemeConversion,
    InvalidRemote,
    VcsNotFound,
    VcsDetection,
    Stat,
    Backend,
}

/// Backend operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Clone,
    Update,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Clone => f.write_str("clone"),
            Operation::Update => f.write_str("update"),
        }
    }
}

#[derive(Error, Debug)]
pub enum GetError {
    #[error("could not parse URL {arg:?}: {reason}")]
    Parse { arg: String, reason: String },

    #[error("could not convert URL {url} to ssh: {reason}")]
    SchemeConversion { url: String, reason: String },

    #[error("not a valid repository: {url}")]
    InvalidRemote { url: String },

    #[error("could not find version control system: {url}")]
    VcsNotFound { url: String },

    #[error("failed to detect VCS for {}", path.display())]
    VcsDetection { path: PathBuf },

    #[error("could not stat {}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{op} failed for {target}")]
    Backend {
        op: Operation,
        target: String,
        #[source]
        source: anyhow::Error,
    },
}

impl GetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GetError::Parse { .. } => ErrorKind::Parse,
            GetError::SchemeConversion { .. } => ErrorKind::SchemeConversion,
            GetError::InvalidRemote { .. } => ErrorKind::InvalidRemote,
            GetError::VcsNotFound { .. } => ErrorKind::VcsNotFound,
            GetError::VcsDetection { .. } => ErrorKind::VcsDetection,
            GetError::Stat { .. } => ErrorKind::Stat,
            GetError::Backend { .. } => ErrorKind::Backend,
        }
    }

    pub(crate) fn parse(arg: &str, reason: impl Into<String>) -> Self {
        GetError::Parse {
            arg: arg.to_string(),
            reason: reason.into(),
        }
    }
}
