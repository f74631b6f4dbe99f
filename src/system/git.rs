use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ProbeError;
use crate::system::process::{is_timeout, run_cmd_timeout};

/// Default hard cutoff for each git invocation.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Branch and dirty state of a working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStatus {
    /// `None` when the directory isn't a repository or git couldn't run.
    pub branch: Option<String>,
    pub dirty: bool,
}

impl RepoStatus {
    pub fn unknown() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait RepoProbe: Send + Sync {
    /// Never fails; anything that goes wrong yields [`RepoStatus::unknown`].
    async fn probe(&self, dir: &Path) -> RepoStatus;
}

/// [`RepoProbe`] that shells out to the `git` CLI.
#[derive(Debug, Clone, Copy)]
pub struct GitProbe {
    timeout: Duration,
}

impl GitProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<std::process::Output, ProbeError> {
        run_cmd_timeout(
            Command::new("git").args(args).current_dir(dir),
            self.timeout,
        )
        .await
        .map_err(|e| {
            if is_timeout(&e) {
                ProbeError::TimedOut {
                    dir: dir.to_path_buf(),
                    millis: self.timeout.as_millis(),
                }
            } else {
                ProbeError::Spawn {
                    dir: dir.to_path_buf(),
                    message: format!("{e:#}"),
                }
            }
        })
    }

    /// `git rev-parse --abbrev-ref HEAD`; a non-zero exit means no repository.
    pub async fn branch(&self, dir: &Path) -> Result<String, ProbeError> {
        let output = self.git(dir, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if !output.status.success() {
            return Err(ProbeError::NotARepository {
                dir: dir.to_path_buf(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Unstaged changes OR staged changes, via `diff --quiet` exit codes.
    /// A diff that can't run counts as clean.
    pub async fn is_dirty(&self, dir: &Path) -> bool {
        for args in [&["diff", "--quiet"][..], &["diff", "--cached", "--quiet"][..]] {
            match self.git(dir, args).await {
                Ok(output) if !output.status.success() => return true,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "git diff failed");
                    return false;
                }
            }
        }
        false
    }

    pub async fn try_probe(&self, dir: &Path) -> Result<RepoStatus, ProbeError> {
        let branch = self.branch(dir).await?;
        let dirty = self.is_dirty(dir).await;
        Ok(RepoStatus {
            branch: Some(branch),
            dirty,
        })
    }
}

impl Default for GitProbe {
    fn default() -> Self {
        Self::new(DEFAULT_GIT_TIMEOUT)
    }
}

#[async_trait]
impl RepoProbe for GitProbe {
    async fn probe(&self, dir: &Path) -> RepoStatus {
        if dir.as_os_str().is_empty() {
            return RepoStatus::unknown();
        }
        match self.try_probe(dir).await {
            Ok(status) => status,
            Err(e) if e.is_expected() => {
                debug!(error = %e, "no repository status");
                RepoStatus::unknown()
            }
            Err(e) => {
                warn!(error = %e, "repository probe failed");
                RepoStatus::unknown()
            }
        }
    }
}
