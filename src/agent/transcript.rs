//! Running-agent detection from the tail of a session transcript.
//!
//! The transcript is append-only JSONL that can grow to gigabytes, so only a
//! fixed-size suffix is read. Within that window, `tool_use` blocks for the
//! agent-spawning tool open an agent and any `tool_result` carrying the same id
//! closes it, in either order. A completion whose spawn fell before the window
//! matches nothing and is ignored. The result is a best-effort view, not an
//! exact one.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::agent::{AgentDetector, SubAgent, DEFAULT_AGENT_LABEL};
use crate::error::DetectError;

/// Upper bound on bytes read from the end of a transcript.
pub const DEFAULT_TAIL_BYTES: u64 = 100 * 1024;

/// Tool names whose `tool_use` blocks spawn a sub-agent.
pub const SPAWN_TOOL_NAMES: &[&str] = &["Task", "Agent"];

/// The raw suffix of a transcript plus where it came from.
#[derive(Debug)]
pub struct TailWindow {
    pub file_len: u64,
    pub start: u64,
    pub bytes: Vec<u8>,
}

impl TailWindow {
    /// True when the window begins mid-file, so its first line may be a fragment.
    pub fn is_truncated(&self) -> bool {
        self.start > 0
    }
}

/// Read `[len - min(len, bound), len)` of the file at `path`.
///
/// The length is sampled once; bytes appended while reading are not picked up.
pub fn read_tail(path: &Path, bound: u64) -> Result<TailWindow, DetectError> {
    let mut file = File::open(path).map_err(|e| DetectError::io(path, e))?;
    let file_len = file.metadata().map_err(|e| DetectError::io(path, e))?.len();

    let read_size = file_len.min(bound);
    let start = file_len - read_size;
    file.seek(SeekFrom::Start(start))
        .map_err(|e| DetectError::io(path, e))?;

    let mut bytes = Vec::with_capacity(read_size as usize);
    file.take(read_size)
        .read_to_end(&mut bytes)
        .map_err(|e| DetectError::io(path, e))?;

    Ok(TailWindow {
        file_len,
        start,
        bytes,
    })
}

// ── Transcript record shape ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TranscriptRecord {
    #[serde(default)]
    message: Option<RecordMessage>,
}

#[derive(Debug, Deserialize)]
struct RecordMessage {
    #[serde(default, deserialize_with = "content_blocks")]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        input: Option<serde_json::Value>,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// `content` is a block array on tool traffic but a bare string on plain user
/// turns. Blocks that don't decode are skipped individually so one odd block
/// can't hide a spawn elsewhere in the same message.
fn content_blocks<'de, D>(deserializer: D) -> Result<Vec<ContentBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

// ── Scan state ──────────────────────────────────────────────────────

/// Correlation state for a single scan: spawned agents in first-seen order,
/// and every id some `tool_result` has closed.
#[derive(Debug, Default)]
pub struct AgentScan {
    spawned: Vec<(String, String)>,
    index: HashMap<String, usize>,
    completed: HashSet<String>,
}

impl AgentScan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a spawn. A repeated id keeps its first position and takes the newest label.
    fn spawn(&mut self, id: String, subagent_type: String) {
        match self.index.get(&id) {
            Some(&slot) => self.spawned[slot].1 = subagent_type,
            None => {
                self.index.insert(id.clone(), self.spawned.len());
                self.spawned.push((id, subagent_type));
            }
        }
    }

    fn complete(&mut self, id: String) {
        self.completed.insert(id);
    }

    /// Feed one transcript line. Blank and unparseable lines are skipped.
    pub fn observe_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        // Partial first line after a mid-file seek, or plain garbage.
        let Ok(record) = serde_json::from_str::<TranscriptRecord>(line) else {
            return;
        };
        let Some(message) = record.message else {
            return;
        };

        for block in message.content {
            match block {
                ContentBlock::ToolUse {
                    id: Some(id),
                    name: Some(name),
                    input,
                } if !id.is_empty() && SPAWN_TOOL_NAMES.contains(&name.as_str()) => {
                    self.spawn(id, subagent_type_of(input.as_ref()));
                }
                ContentBlock::ToolResult {
                    tool_use_id: Some(id),
                } if !id.is_empty() => self.complete(id),
                _ => {}
            }
        }
    }

    pub fn observe_text(&mut self, text: &str) {
        for line in text.lines() {
            self.observe_line(line);
        }
    }

    /// Spawned agents with no completion, in first-seen order.
    pub fn into_running(self) -> Vec<SubAgent> {
        let completed = self.completed;
        self.spawned
            .into_iter()
            .filter(|(id, _)| !completed.contains(id))
            .map(|(id, subagent_type)| SubAgent::running(id, subagent_type))
            .collect()
    }
}

fn subagent_type_of(input: Option<&serde_json::Value>) -> String {
    input
        .and_then(|i| i.get("subagent_type"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_AGENT_LABEL)
        .to_string()
}

/// Running agents described by a block of transcript text.
pub fn scan_text(text: &str) -> Vec<SubAgent> {
    let mut scan = AgentScan::new();
    scan.observe_text(text);
    scan.into_running()
}

/// Running agents in the last `bound` bytes of the transcript at `path`.
pub fn scan_tail(path: &Path, bound: u64) -> Result<Vec<SubAgent>, DetectError> {
    let window = read_tail(path, bound)?;
    debug!(
        path = %path.display(),
        file_len = window.file_len,
        start = window.start,
        truncated = window.is_truncated(),
        "scanning transcript tail"
    );
    // A multi-byte character split at the window start decodes lossily; that
    // line is a fragment anyway.
    Ok(scan_text(&String::from_utf8_lossy(&window.bytes)))
}

// ── Detector ────────────────────────────────────────────────────────

/// [`AgentDetector`] backed by a bounded tail read of the transcript.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptDetector {
    tail_bytes: u64,
}

impl TranscriptDetector {
    pub fn new(tail_bytes: u64) -> Self {
        Self { tail_bytes }
    }

    pub fn tail_bytes(&self) -> u64 {
        self.tail_bytes
    }
}

impl Default for TranscriptDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TAIL_BYTES)
    }
}

impl AgentDetector for TranscriptDetector {
    fn detect(&self, transcript: &Path) -> Vec<SubAgent> {
        match scan_tail(transcript, self.tail_bytes) {
            Ok(agents) => agents,
            Err(e) if e.is_expected() => {
                debug!(error = %e, "no transcript to scan");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "transcript scan failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentStatus;
    use std::io::Write;

    fn spawn_line(id: &str, subagent_type: &str) -> String {
        format!(
            r#"{{"type":"assistant","message":{{"role":"assistant","content":[{{"type":"tool_use","id":"{id}","name":"Task","input":{{"description":"look around","subagent_type":"{subagent_type}"}}}}]}}}}"#
        )
    }

    fn result_line(id: &str) -> String {
        format!(
            r#"{{"type":"user","message":{{"role":"user","content":[{{"type":"tool_result","tool_use_id":"{id}","content":"done"}}]}}}}"#
        )
    }

    fn write_transcript(lines: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn ids(agents: &[SubAgent]) -> Vec<&str> {
        agents.iter().map(|a| a.id.as_str()).collect()
    }

    // ── scan_text ───────────────────────────────────────────────────

    #[test]
    fn spawn_without_result_is_running() {
        let agents = scan_text(&spawn_line("toolu_a", "Explore"));
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].id, "toolu_a");
        assert_eq!(agents[0].label(), "Explore");
        assert_eq!(agents[0].status, AgentStatus::Running);
        assert_eq!(agents[0].context_usage.total(), 0);
    }

    #[test]
    fn spawn_then_result_is_not_running() {
        let text = [spawn_line("toolu_a", "Explore"), result_line("toolu_a")].join("\n");
        assert!(scan_text(&text).is_empty());
    }

    #[test]
    fn result_before_spawn_still_completes() {
        let text = [result_line("toolu_a"), spawn_line("toolu_a", "Explore")].join("\n");
        assert!(scan_text(&text).is_empty());
    }

    #[test]
    fn orphan_result_is_a_no_op() {
        let text = [
            result_line("toolu_gone"),
            spawn_line("toolu_b", "Plan"),
            result_line("toolu_other"),
        ]
        .join("\n");
        assert_eq!(ids(&scan_text(&text)), vec!["toolu_b"]);
    }

    #[test]
    fn malformed_lines_do_not_abort_scan() {
        let text = [
            r#"ol":"assistant","message":{"content":[{"type":"tool_use""#.to_string(),
            spawn_line("toolu_a", "Explore"),
            "{not json at all".to_string(),
            String::new(),
            "   ".to_string(),
            spawn_line("toolu_b", "Plan"),
        ]
        .join("\n");
        assert_eq!(ids(&scan_text(&text)), vec!["toolu_a", "toolu_b"]);
    }

    #[test]
    fn non_spawn_tools_are_ignored() {
        let text = r#"{"message":{"content":[{"type":"tool_use","id":"toolu_r","name":"Read","input":{"file_path":"a.rs"}}]}}"#;
        assert!(scan_text(text).is_empty());
    }

    #[test]
    fn agent_tool_name_also_spawns() {
        let text = r#"{"message":{"content":[{"type":"tool_use","id":"toolu_x","name":"Agent","input":{"subagent_type":"general-purpose"}}]}}"#;
        let agents = scan_text(text);
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].label(), "general-purpose");
    }

    #[test]
    fn missing_subagent_type_defaults() {
        let text = r#"{"message":{"content":[{"type":"tool_use","id":"toolu_a","name":"Task","input":{"prompt":"hi"}}]}}"#;
        assert_eq!(scan_text(text)[0].label(), "agent");

        let text = r#"{"message":{"content":[{"type":"tool_use","id":"toolu_b","name":"Task"}]}}"#;
        assert_eq!(scan_text(text)[0].label(), "agent");
    }

    #[test]
    fn spawn_without_id_is_ignored() {
        let text = r#"{"message":{"content":[{"type":"tool_use","name":"Task","input":{"subagent_type":"x"}},{"type":"tool_use","id":"","name":"Task"}]}}"#;
        assert!(scan_text(text).is_empty());
    }

    #[test]
    fn duplicate_spawn_last_label_wins() {
        let text = [
            spawn_line("toolu_a", "Explore"),
            spawn_line("toolu_b", "Plan"),
            spawn_line("toolu_a", "Review"),
        ]
        .join("\n");
        let agents = scan_text(&text);
        assert_eq!(ids(&agents), vec!["toolu_a", "toolu_b"]);
        assert_eq!(agents[0].label(), "Review");
    }

    #[test]
    fn string_content_and_missing_message_are_skipped() {
        let text = [
            r#"{"type":"user","message":{"role":"user","content":"plain prompt"}}"#.to_string(),
            r#"{"type":"summary","summary":"x"}"#.to_string(),
            r#"{"type":"assistant","message":null}"#.to_string(),
            spawn_line("toolu_a", "Explore"),
        ]
        .join("\n");
        assert_eq!(ids(&scan_text(&text)), vec!["toolu_a"]);
    }

    #[test]
    fn odd_block_does_not_hide_sibling_spawn() {
        let text = r#"{"message":{"content":[{"type":"tool_use","id":42,"name":"Task"},"stray",{"type":"text","text":"spawning"},{"type":"tool_use","id":"toolu_a","name":"Task","input":{"subagent_type":"Explore"}}]}}"#;
        assert_eq!(ids(&scan_text(text)), vec!["toolu_a"]);
    }

    #[test]
    fn mixed_spawn_and_result_in_one_message() {
        let text = r#"{"message":{"content":[{"type":"tool_result","tool_use_id":"toolu_a"},{"type":"tool_use","id":"toolu_b","name":"Task","input":{"subagent_type":"Plan"}}]}}"#;
        let text = format!("{}\n{text}", spawn_line("toolu_a", "Explore"));
        assert_eq!(ids(&scan_text(&text)), vec!["toolu_b"]);
    }

    #[test]
    fn crlf_lines_parse() {
        let text = format!("{}\r\n{}\r\n", spawn_line("toolu_a", "x"), spawn_line("toolu_b", "y"));
        assert_eq!(ids(&scan_text(&text)), vec!["toolu_a", "toolu_b"]);
    }

    // ── read_tail / detect ──────────────────────────────────────────

    #[test]
    fn detect_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let detector = TranscriptDetector::default();
        assert!(detector.detect(&dir.path().join("nope.jsonl")).is_empty());
    }

    #[test]
    fn scan_tail_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_tail(&dir.path().join("nope.jsonl"), DEFAULT_TAIL_BYTES).unwrap_err();
        assert!(matches!(err, DetectError::NotFound { .. }));
    }

    #[test]
    fn detect_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TranscriptDetector::default().detect(dir.path()).is_empty());
    }

    #[test]
    fn detect_empty_file_is_empty() {
        let file = write_transcript(&[]);
        assert!(TranscriptDetector::default().detect(file.path()).is_empty());
    }

    #[test]
    fn detect_reads_running_agents_from_file() {
        let file = write_transcript(&[
            spawn_line("toolu_a", "Explore"),
            spawn_line("toolu_b", "Plan"),
            result_line("toolu_a"),
        ]);
        let agents = TranscriptDetector::default().detect(file.path());
        assert_eq!(ids(&agents), vec!["toolu_b"]);
        assert_eq!(agents[0].label(), "Plan");
    }

    #[test]
    fn small_file_is_read_whole() {
        let file = write_transcript(&[spawn_line("toolu_a", "Explore")]);
        let window = read_tail(file.path(), DEFAULT_TAIL_BYTES).unwrap();
        assert_eq!(window.start, 0);
        assert!(!window.is_truncated());
        assert_eq!(window.bytes.len() as u64, window.file_len);
    }

    #[test]
    fn large_file_reads_only_the_tail() {
        let bound = 4 * 1024;
        let filler = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"padding padding padding padding"}]}}"#;

        let mut lines = vec![spawn_line("toolu_old", "Ancient")];
        while lines.iter().map(|l| l.len() + 1).sum::<usize>() < bound as usize * 4 {
            lines.push(filler.to_string());
        }
        lines.push(spawn_line("toolu_dup", "Explore"));
        lines.push(result_line("toolu_dup"));
        lines.push(spawn_line("toolu_new", "Plan"));
        let file = write_transcript(&lines);

        let window = read_tail(file.path(), bound).unwrap();
        assert_eq!(window.bytes.len() as u64, bound);
        assert!(window.is_truncated());
        assert_eq!(window.start, window.file_len - bound);

        let agents = TranscriptDetector::new(bound).detect(file.path());
        assert_eq!(ids(&agents), vec!["toolu_new"]);
    }

    #[test]
    fn truncated_first_line_is_tolerated() {
        let first = spawn_line("toolu_cut", "Explore");
        let second = spawn_line("toolu_whole", "Plan");
        let file = write_transcript(&[first.clone(), second.clone()]);

        // Window starts ten bytes into the first record.
        let bound = (first.len() + 1 + second.len() + 1 - 10) as u64;
        let agents = TranscriptDetector::new(bound).detect(file.path());
        assert_eq!(ids(&agents), vec!["toolu_whole"]);
    }

    #[test]
    fn zero_bound_reads_nothing() {
        let file = write_transcript(&[spawn_line("toolu_a", "Explore")]);
        let window = read_tail(file.path(), 0).unwrap();
        assert!(window.bytes.is_empty());
        assert!(TranscriptDetector::new(0).detect(file.path()).is_empty());
    }
}
