use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use agentline::agent::transcript::{scan_tail, DEFAULT_TAIL_BYTES};
use agentline::agent::TranscriptDetector;
use agentline::config::{Config, RenderArgs};
use agentline::logging;
use agentline::render::StatusLine;
use agentline::snapshot::Snapshot;
use agentline::system::git::GitProbe;

#[derive(Parser)]
#[command(
    name = "agentline",
    version,
    about = "Status line for coding-agent sessions: model, context, cost and running sub-agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the sub-agents still running in a transcript, as JSON
    Agents {
        /// Path to the session transcript (.jsonl)
        transcript: PathBuf,
        /// Maximum bytes read from the end of the transcript
        #[arg(long, default_value_t = DEFAULT_TAIL_BYTES)]
        tail_bytes: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging();

    match cli.command {
        Some(Commands::Agents {
            transcript,
            tail_bytes,
        }) => cmd_agents(&transcript, tail_bytes),
        None => cmd_render(&Config::from_env(&cli.render)).await,
    }
}

fn cmd_agents(transcript: &Path, tail_bytes: u64) -> Result<()> {
    let agents = scan_tail(transcript, tail_bytes)
        .with_context(|| format!("Failed to scan transcript {}", transcript.display()))?;
    println!("{}", serde_json::to_string_pretty(&agents)?);
    Ok(())
}

async fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot from {}", path.display())),
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("Failed to read snapshot from stdin")?;
            Ok(raw)
        }
    }
}

/// Render one snapshot. Always succeeds unless stdout itself is gone: bad input
/// becomes the diagnostic line.
async fn cmd_render(config: &Config) -> Result<()> {
    let probe = GitProbe::new(config.git_timeout);
    let detector = TranscriptDetector::new(config.tail_bytes);
    let status = StatusLine::new(&config.theme, config.bar_width, &probe, &detector);

    let lines = match read_input(config.input.as_deref()).await {
        Ok(raw) => match Snapshot::parse(&raw) {
            Ok(snapshot) => status.render(&snapshot).await,
            Err(e) => {
                debug!(error = %e, "snapshot is not valid JSON");
                vec![status.diagnostic_line()]
            }
        },
        Err(e) => {
            warn!(error = %format!("{e:#}"), "no snapshot to render");
            vec![status.diagnostic_line()]
        }
    };

    let mut stdout = std::io::stdout().lock();
    for line in &lines {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod cli_parsing_tests {
    use super::*;

    #[test]
    fn test_cli_parsing_no_command_renders() {
        let cli = Cli::parse_from(["agentline"]);
        assert!(cli.command.is_none());
        assert!(!cli.render.no_color);
        assert_eq!(cli.render.bar_width, 10);
    }

    #[test]
    fn test_cli_parsing_render_flags() {
        let cli = Cli::parse_from(["agentline", "--no-color", "--bar-width", "16"]);
        assert!(cli.render.no_color);
        assert_eq!(cli.render.bar_width, 16);
    }

    #[test]
    fn test_cli_parsing_agents_command() {
        let cli = Cli::parse_from(["agentline", "agents", "/tmp/s.jsonl", "--tail-bytes", "512"]);
        match cli.command {
            Some(Commands::Agents {
                transcript,
                tail_bytes,
            }) => {
                assert_eq!(transcript, PathBuf::from("/tmp/s.jsonl"));
                assert_eq!(tail_bytes, 512);
            }
            other => panic!("expected Agents, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parsing_agents_default_tail() {
        let cli = Cli::parse_from(["agentline", "agents", "/tmp/s.jsonl"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Agents {
                tail_bytes: DEFAULT_TAIL_BYTES,
                ..
            })
        ));
    }
}
