use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::agent::transcript::DEFAULT_TAIL_BYTES;
use crate::format::DEFAULT_BAR_WIDTH;
use crate::system::git::DEFAULT_GIT_TIMEOUT;
use crate::theme::Theme;

/// Flags controlling how the status line is produced.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RenderArgs {
    /// Disable ANSI colors (also respects NO_COLOR)
    #[arg(long)]
    pub no_color: bool,

    /// Number of cells in each progress bar
    #[arg(long, default_value_t = DEFAULT_BAR_WIDTH)]
    pub bar_width: usize,

    /// Maximum bytes read from the end of the transcript
    #[arg(long, default_value_t = DEFAULT_TAIL_BYTES)]
    pub tail_bytes: u64,

    /// Hard cutoff for each git invocation, in milliseconds
    #[arg(long, default_value_t = DEFAULT_GIT_TIMEOUT.as_millis() as u64)]
    pub git_timeout_ms: u64,

    /// Read the session snapshot from a file instead of stdin
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,
}

/// Settings resolved once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub theme: Theme,
    pub bar_width: usize,
    pub tail_bytes: u64,
    pub git_timeout: Duration,
    pub input: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::ansi(),
            bar_width: DEFAULT_BAR_WIDTH,
            tail_bytes: DEFAULT_TAIL_BYTES,
            git_timeout: DEFAULT_GIT_TIMEOUT,
            input: None,
        }
    }
}

impl Config {
    /// Combine CLI flags with the environment. `no_color_env` is whether
    /// `NO_COLOR` is set.
    pub fn resolve(args: &RenderArgs, no_color_env: bool) -> Self {
        let theme = if args.no_color || no_color_env {
            Theme::plain()
        } else {
            Theme::ansi()
        };
        Self {
            theme,
            bar_width: args.bar_width,
            tail_bytes: args.tail_bytes,
            git_timeout: Duration::from_millis(args.git_timeout_ms),
            input: args.input.clone(),
        }
    }

    pub fn from_env(args: &RenderArgs) -> Self {
        let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::resolve(args, no_color_env)
    }
}
