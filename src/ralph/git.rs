//! Version-control collaborator.
//!
//! Thin wrapper over the `git` (and optionally `gh`) CLIs. The commit
//! history is Ralph's only durable cross-iteration memory, so the driver
//! commits the state store alongside the agent's edits at every boundary.
//!
//! Push and PR operations are soft: a missing remote or an absent `gh`
//! binary is logged and ignored. Commit is tolerant of "nothing to commit"
//! but surfaces spawn failures, because a git binary that cannot run at all
//! means state persistence is broken.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::ralph::error::RalphError;

#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
}

impl GitRepo {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Whether the directory is inside a git repository.
    pub async fn is_repo(&self) -> bool {
        match self.git().args(["rev-parse", "--git-dir"]).output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    /// Whether the working tree has staged or unstaged changes.
    pub async fn has_uncommitted_changes(&self) -> bool {
        match self.git().args(["status", "--porcelain"]).output().await {
            Ok(output) => !String::from_utf8_lossy(&output.stdout).trim().is_empty(),
            Err(_) => false,
        }
    }

    /// Stage everything and commit. "Nothing to commit" is not an error.
    pub async fn commit_all(&self, message: &str) -> Result<(), RalphError> {
        let add = self
            .git()
            .args(["add", "-A"])
            .output()
            .await
            .map_err(|e| RalphError::Git(format!("git add: {}", e)))?;
        if !add.status.success() {
            return Err(RalphError::Git(format!(
                "git add failed: {}",
                String::from_utf8_lossy(&add.stderr).trim()
            )));
        }

        let commit = self
            .git()
            .args(["commit", "-m", message])
            .output()
            .await
            .map_err(|e| RalphError::Git(format!("git commit: {}", e)))?;
        if !commit.status.success() {
            // Empty tree, hook rejection, etc. — log and move on.
            log::debug!(
                "git commit skipped: {}",
                String::from_utf8_lossy(&commit.stderr).trim()
            );
        }
        Ok(())
    }

    /// Create and check out a branch; falls back to a plain checkout when
    /// the branch already exists.
    pub async fn create_branch(&self, name: &str) -> Result<(), RalphError> {
        let create = self
            .git()
            .args(["checkout", "-b", name])
            .output()
            .await
            .map_err(|e| RalphError::Git(format!("git checkout -b: {}", e)))?;
        if create.status.success() {
            return Ok(());
        }

        let checkout = self
            .git()
            .args(["checkout", name])
            .output()
            .await
            .map_err(|e| RalphError::Git(format!("git checkout: {}", e)))?;
        if checkout.status.success() {
            Ok(())
        } else {
            Err(RalphError::Git(format!(
                "could not check out branch '{}': {}",
                name,
                String::from_utf8_lossy(&checkout.stderr).trim()
            )))
        }
    }

    /// Push the current branch, setting upstream when a name is given.
    /// Failure (no remote, no credentials) is logged and ignored.
    pub async fn push(&self, branch: Option<&str>) {
        let mut cmd = self.git();
        match branch {
            Some(name) => {
                cmd.args(["push", "-u", "origin", name]);
            }
            None => {
                cmd.arg("push");
            }
        }
        match cmd.output().await {
            Ok(output) if output.status.success() => {}
            Ok(output) => log::warn!(
                "git push failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => log::warn!("git push failed: {}", e),
        }
    }

    /// Open a pull request with `gh pr create --fill`. Absence of the `gh`
    /// CLI or a failure is logged and ignored.
    pub async fn open_pr(&self) {
        let result = Command::new("gh")
            .args(["pr", "create", "--fill"])
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;
        match result {
            Ok(output) if output.status.success() => {}
            Ok(output) => log::warn!(
                "gh pr create failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => log::warn!("gh pr create failed: {}", e),
        }
    }
}
