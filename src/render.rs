//! Turns a [`Snapshot`] into the status-line text.
//!
//! Layout:
//!
//! ```text
//! Opus 4.5 [====      ] 42% | 85k/200k | ↓120k ↑9k | cost $1.25
//!
//! lines +12/-3 | cache 94% | time 2m | app on main*
//!
//! ◉ Explore [          ] 0% | 0/128k | ↓0 ↑0
//! ```
//!
//! The blank separators are a single space so hosts that drop empty lines keep them.

use std::path::Path;

use crate::agent::{AgentDetector, SubAgent, ASSUMED_AGENT_CONTEXT};
use crate::format::{
    format_cost, format_duration, format_tokens, model_display_name, progress_bar,
};
use crate::snapshot::{CurrentUsage, Snapshot, DEFAULT_CONTEXT_WINDOW};
use crate::system::git::{RepoProbe, RepoStatus};
use crate::theme::Theme;

/// Text printed instead of the status line when stdin isn't JSON.
pub const DIAGNOSTIC_TEXT: &str = "statusline error";

const SEPARATOR_LINE: &str = " ";

/// Numbers derived from a snapshot, with every absent field defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetrics {
    pub model: String,
    pub percent_used: u32,
    pub context_size: u64,
    pub total_tokens: u64,
    pub total_input: u64,
    pub total_output: u64,
    pub cache_percent: u32,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
}

impl SessionMetrics {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let model = snapshot.model.clone().unwrap_or_default();
        let window = snapshot.context_window.clone().unwrap_or_default();
        let usage = window.current_usage.clone().unwrap_or_default();
        let cost = snapshot.cost.clone().unwrap_or_default();

        let total_input = window.total_input_tokens.unwrap_or(0);
        let total_tokens = total_tokens(&usage, total_input);
        let cache_read = usage.cache_read_input_tokens.unwrap_or(0);

        Self {
            model: model_display_name(model.id.as_deref(), model.display_name.as_deref()),
            percent_used: window
                .used_percentage
                .map_or(0, |p| p.floor().clamp(0.0, 100.0) as u32),
            context_size: window
                .context_window_size
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_CONTEXT_WINDOW),
            total_tokens,
            total_input,
            total_output: window.total_output_tokens.unwrap_or(0),
            cache_percent: cache_percent(cache_read, total_tokens),
            cost_usd: cost.total_cost_usd.unwrap_or(0.0),
            duration_ms: cost.total_duration_ms.unwrap_or(0),
            lines_added: cost.total_lines_added.unwrap_or(0),
            lines_removed: cost.total_lines_removed.unwrap_or(0),
        }
    }
}

/// Current input + cache reads + cache writes, or the cumulative input count
/// when the current turn reports nothing.
pub fn total_tokens(usage: &CurrentUsage, cumulative_input: u64) -> u64 {
    let current = usage
        .input_tokens
        .unwrap_or(0)
        .saturating_add(usage.cache_read_input_tokens.unwrap_or(0))
        .saturating_add(usage.cache_creation_input_tokens.unwrap_or(0));
    if current == 0 {
        cumulative_input
    } else {
        current
    }
}

pub fn cache_percent(cache_read: u64, total: u64) -> u32 {
    if total == 0 || cache_read == 0 {
        return 0;
    }
    (cache_read.saturating_mul(100) / total) as u32
}

/// Basename of `current_dir`, collapsed to the project's basename anywhere
/// inside the project tree.
pub fn directory_label(current_dir: &str, project_dir: &str) -> String {
    let inside_project = !project_dir.is_empty()
        && (current_dir == project_dir
            || current_dir
                .strip_prefix(project_dir)
                .is_some_and(|rest| rest.starts_with('/')));
    let shown = if inside_project {
        project_dir
    } else {
        current_dir
    };
    basename(shown)
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Composes the probe, the detector and the formatters into output lines.
pub struct StatusLine<'a> {
    theme: &'a Theme,
    bar_width: usize,
    probe: &'a dyn RepoProbe,
    detector: &'a dyn AgentDetector,
}

impl<'a> StatusLine<'a> {
    pub fn new(
        theme: &'a Theme,
        bar_width: usize,
        probe: &'a dyn RepoProbe,
        detector: &'a dyn AgentDetector,
    ) -> Self {
        Self {
            theme,
            bar_width,
            probe,
            detector,
        }
    }

    pub async fn render(&self, snapshot: &Snapshot) -> Vec<String> {
        let metrics = SessionMetrics::from_snapshot(snapshot);
        let workspace = snapshot.workspace.clone().unwrap_or_default();
        let current_dir = workspace.current_dir.unwrap_or_default();
        let project_dir = workspace.project_dir.unwrap_or_default();

        let repo = self.probe.probe(Path::new(&current_dir)).await;
        let directory = directory_label(&current_dir, &project_dir);

        let mut lines = vec![
            self.usage_line(&metrics),
            SEPARATOR_LINE.to_string(),
            self.session_line(&metrics, &directory, &repo),
        ];

        let agents = self.running_agents(snapshot);
        if !agents.is_empty() {
            lines.push(SEPARATOR_LINE.to_string());
            let label_width = agents
                .iter()
                .map(|a| a.label().chars().count())
                .max()
                .unwrap_or(0);
            lines.extend(agents.iter().map(|a| self.agent_line(a, label_width)));
        }
        lines
    }

    /// A non-empty injected `sub_agents` list wins outright; the transcript is
    /// consulted when the list is missing or empty. Either way only running
    /// agents are kept.
    pub fn running_agents(&self, snapshot: &Snapshot) -> Vec<SubAgent> {
        let injected = snapshot.sub_agents.as_deref().unwrap_or_default();
        let agents = match snapshot.transcript_path.as_deref() {
            _ if !injected.is_empty() => injected.to_vec(),
            Some(path) if !path.is_empty() => self.detector.detect(Path::new(path)),
            _ => Vec::new(),
        };
        agents.into_iter().filter(SubAgent::is_running).collect()
    }

    pub fn diagnostic_line(&self) -> String {
        self.theme.paint(self.theme.dim, DIAGNOSTIC_TEXT)
    }

    fn bar(&self, percent: u32) -> String {
        progress_bar(
            percent,
            self.bar_width,
            self.theme.bar_fill,
            self.theme.bar_empty,
        )
    }

    fn token_flow(&self, input: u64, output: u64) -> String {
        let t = self.theme;
        format!(
            "{}{} {}{}",
            t.paint(t.dim, "↓"),
            t.paint(t.cyan, format_tokens(input)),
            t.paint(t.dim, "↑"),
            t.paint(t.magenta, format_tokens(output)),
        )
    }

    fn usage_line(&self, m: &SessionMetrics) -> String {
        let t = self.theme;
        let sep = t.separator();
        let mut line = String::new();
        line.push_str(&format!("{} ", t.paint(t.magenta, &m.model)));
        line.push_str(&format!("{} ", t.paint(t.dim, self.bar(m.percent_used))));
        line.push_str(&t.paint(t.yellow, format!("{}%", m.percent_used)));
        line.push_str(&sep);
        line.push_str(&t.paint(
            t.white,
            format!(
                "{}/{}",
                format_tokens(m.total_tokens),
                format_tokens(m.context_size)
            ),
        ));
        line.push_str(&sep);
        line.push_str(&self.token_flow(m.total_input, m.total_output));
        line.push_str(&sep);
        line.push_str(&format!(
            "{} {}",
            t.paint(t.dim, "cost"),
            t.paint(t.yellow, format_cost(m.cost_usd))
        ));
        line
    }

    fn session_line(&self, m: &SessionMetrics, directory: &str, repo: &RepoStatus) -> String {
        let t = self.theme;
        let sep = t.separator();
        let mut line = format!(
            "{} {}{}{}",
            t.paint(t.dim, "lines"),
            t.paint(t.green, format!("+{}", m.lines_added)),
            t.paint(t.dim, "/"),
            t.paint(t.red, format!("-{}", m.lines_removed)),
        );

        if m.cache_percent > 0 {
            line.push_str(&sep);
            line.push_str(&format!(
                "{} {}",
                t.paint(t.dim, "cache"),
                t.paint(t.cyan, format!("{}%", m.cache_percent))
            ));
        }

        line.push_str(&sep);
        line.push_str(&format!(
            "{} {}",
            t.paint(t.dim, "time"),
            t.paint(t.blue, format_duration(m.duration_ms))
        ));
        line.push_str(&sep);
        line.push_str(&t.paint(t.green, directory));

        if let Some(branch) = repo.branch.as_deref().filter(|b| !b.is_empty()) {
            line.push_str(&format!(" {} ", t.paint(t.dim, "on")));
            line.push_str(&t.paint(t.cyan, branch));
            if repo.dirty {
                line.push_str(&t.paint(t.red, "*"));
            }
        }
        line
    }

    fn agent_line(&self, agent: &SubAgent, label_width: usize) -> String {
        let t = self.theme;
        let sep = t.separator();
        let usage = agent.context_usage;
        let percent = usage.percent_of_assumed_context();

        let mut line = format!(
            "{} {} ",
            t.paint(t.cyan, t.agent_marker),
            t.paint(t.white, format!("{:<label_width$}", agent.label())),
        );
        line.push_str(&format!("{} ", t.paint(t.dim, self.bar(percent))));
        line.push_str(&t.paint(t.yellow, format!("{percent}%")));
        line.push_str(&sep);
        line.push_str(&t.paint(
            t.white,
            format!(
                "{}/{}",
                format_tokens(usage.total()),
                format_tokens(ASSUMED_AGENT_CONTEXT)
            ),
        ));
        line.push_str(&sep);
        line.push_str(&self.token_flow(usage.input_tokens, usage.output_tokens));
        line
    }
}
