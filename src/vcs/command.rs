use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Stdio};

/// External programs used by the non-libgit2 backends.
#[derive(Debug, Clone, Copy)]
pub enum Tool {
    Git,
    Hg,
    Svn,
}

impl Tool {
    fn program(self) -> &'static str {
        match self {
            Tool::Git => "git",
            Tool::Hg => "hg",
            Tool::Svn => "svn",
        }
    }

    /// Run the tool with `args`, optionally inside `cwd`.
    ///
    /// When `silent` is false stdout/stderr are inherited so the user sees
    /// the tool's own progress. Otherwise both are captured and stderr is
    /// folded into the error on failure.
    pub fn run(self, args: &[&str], cwd: Option<&Path>, silent: bool) -> Result<()> {
        let program = self.program();
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let cmdline = format!("{} {}", program, args.join(" "));
        log::debug!("running {}", cmdline);

        if silent {
            let out = cmd
                .output()
                .with_context(|| format!("failed to spawn {}", program))?;
            if !out.status.success() {
                let stderr = String::from_utf8_lossy(&out.stderr);
                bail!("{} exited with {}: {}", cmdline, out.status, stderr.trim());
            }
        } else {
            let status = cmd
                .status()
                .with_context(|| format!("failed to spawn {}", program))?;
            if !status.success() {
                bail!("{} exited with {}", cmdline, status);
            }
        }
        Ok(())
    }
}
