use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::snapshot::{lenient, lenient_count_or_zero, lenient_or_default};

pub mod transcript;

pub use transcript::TranscriptDetector;

/// Context window assumed for every sub-agent; agents report no size of their own.
pub const ASSUMED_AGENT_CONTEXT: u64 = 128_000;

/// Label used when an agent carries no `subagent_type`.
pub const DEFAULT_AGENT_LABEL: &str = "agent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Running,
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextUsage {
    #[serde(deserialize_with = "lenient_count_or_zero")]
    pub input_tokens: u64,
    #[serde(deserialize_with = "lenient_count_or_zero")]
    pub output_tokens: u64,
}

impl ContextUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Share of [`ASSUMED_AGENT_CONTEXT`] in use, floored and capped at 100.
    pub fn percent_of_assumed_context(&self) -> u32 {
        let percent = self.total().saturating_mul(100) / ASSUMED_AGENT_CONTEXT;
        percent.min(100) as u32
    }
}

/// One background agent, either injected by the host or recovered from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubAgent {
    #[serde(deserialize_with = "lenient_or_default")]
    pub id: String,
    #[serde(deserialize_with = "lenient")]
    pub subagent_type: Option<String>,
    #[serde(deserialize_with = "lenient_or_default")]
    pub status: AgentStatus,
    #[serde(deserialize_with = "lenient_or_default")]
    pub context_usage: ContextUsage,
}

impl SubAgent {
    /// A transcript-detected agent: running, with usage unknown and reported as zero.
    pub fn running(id: impl Into<String>, subagent_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subagent_type: Some(subagent_type.into()),
            status: AgentStatus::Running,
            context_usage: ContextUsage::default(),
        }
    }

    pub fn label(&self) -> &str {
        match self.subagent_type.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => DEFAULT_AGENT_LABEL,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == AgentStatus::Running
    }
}

/// Source of running agents when the host didn't inject a list.
pub trait AgentDetector: Send + Sync {
    /// Best effort: failures yield an empty list, never an error.
    fn detect(&self, transcript: &Path) -> Vec<SubAgent>;
}
