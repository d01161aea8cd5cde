//! # grab
//!
//! **grab** clones remote repositories into a directory tree laid out as
//! `<root>/<host>/<path>`.
//!
//! Features:
//! - `grab get` clones (or with `-u` updates) repositories given as URLs,
//!   scp-style addresses, `host/path`, `owner/repo` or `./relative` paths
//! - `grab list` shows the checkouts under the local roots
//! - `grab root` prints the local roots
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Builder;
use grab::{GetFlags, cmd_get, cmd_list, cmd_root};
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "grab",
    version,
    about = "grab - clone remote repositories into a host/path tree",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Clone or update repositories (reads stdin when no argument is given)
    Get {
        /// Repository references
        refs: Vec<String>,
        /// Update repositories that are already cloned
        #[arg(short, long)]
        update: bool,
        /// Use ssh instead of https
        #[arg(short = 'p', long)]
        ssh: bool,
        /// Fetch only the latest revision
        #[arg(long)]
        shallow: bool,
        /// Backend to use instead of asking the remote (git, git-svn, hg, svn)
        #[arg(long, value_name = "VCS")]
        vcs: Option<String>,
        /// Suppress backend output
        #[arg(short, long)]
        silent: bool,
        /// Do not initialize submodules
        #[arg(long)]
        no_recursive: bool,
        /// Fetch repositories in parallel
        #[arg(short = 'P', long)]
        parallel: bool,
        /// Worker threads for --parallel (defaults to the CPU count)
        #[arg(short, long, value_name = "N")]
        jobs: Option<usize>,
    },
    /// List local repositories
    List {
        /// Only show repositories whose path contains QUERY
        query: Option<String>,
        /// Print full paths
        #[arg(short = 'p', long)]
        full_path: bool,
    },
    /// Print the primary local root
    Root {
        /// Print every root
        #[arg(long)]
        all: bool,
    },
}

fn init_logging(quiet: bool) {
    let mut builder = Builder::new();

    let level = if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    builder.filter(None, level);

    if let Ok(filter) = env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    }

    builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    builder.init();
}

/// CLI entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let Some(cmd) = cli.cmd else {
        return Ok(());
    };

    match cmd {
        Cmd::Get {
            refs,
            update,
            ssh,
            shallow,
            vcs,
            silent,
            no_recursive,
            parallel,
            jobs,
        } => {
            init_logging(silent || parallel);
            cmd_get(
                refs,
                GetFlags {
                    update,
                    ssh,
                    shallow,
                    silent,
                    no_recursive,
                    parallel,
                    vcs,
                    jobs,
                },
            )
        }
        Cmd::List { query, full_path } => {
            init_logging(true);
            cmd_list(query.as_deref(), full_path)
        }
        Cmd::Root { all } => {
            init_logging(true);
            cmd_root(all)
        }
    }
}
