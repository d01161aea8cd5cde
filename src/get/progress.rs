use indicatif::ProgressStyle;

use super::Outcome;

const TICKS: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// State of one reference's line in a parallel `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Running,
    Done,
    /// Nothing fetched: already on disk, or another line claimed the path.
    Idle,
    Failed,
}

impl Mark {
    /// Mark and verb for a finished line.
    pub fn finished(outcome: &Outcome) -> (Mark, &'static str) {
        match outcome {
            Outcome::Cloned(_) => (Mark::Done, "cloned"),
            Outcome::Updated(_) => (Mark::Done, "updated"),
            Outcome::Exists(_) => (Mark::Idle, "exists"),
            Outcome::Duplicate(_) => (Mark::Idle, "skipped"),
        }
    }

    pub fn style(self) -> ProgressStyle {
        let template = match self {
            Mark::Running => "\x1b[33m{spinner}\x1b[0m {wide_msg}",
            Mark::Done => "\x1b[32m✔\x1b[0m {wide_msg}",
            Mark::Idle => "\x1b[90m-\x1b[0m {wide_msg}",
            Mark::Failed => "\x1b[31m✘\x1b[0m {wide_msg}",
        };
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        match self {
            Mark::Running => style.tick_strings(TICKS),
            _ => style,
        }
    }
}
