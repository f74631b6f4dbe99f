use std::time::Duration;

use anyhow::{Context, Result as AnyhowResult};
use tokio::process::Command;
use tokio::time::error::Elapsed;

/// Run a command with a timeout, returning its output.
///
/// The child is killed if the timeout elapses.
pub async fn run_cmd_timeout(
    cmd: &mut Command,
    timeout: Duration,
) -> AnyhowResult<std::process::Output> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => result.context("subprocess failed to execute"),
        Err(elapsed) => Err(anyhow::Error::new(elapsed)
            .context(format!("subprocess timed out after {}ms", timeout.as_millis()))),
    }
}

/// Whether an error from [`run_cmd_timeout`] was the timeout firing.
pub fn is_timeout(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Elapsed>().is_some()
}
