//! Persisted state under the workspace's `.ralph/` directory.
//!
//! The directory holds a progress log (human-readable, bracketing each
//! session), an activity log (per-event lines written by the supervisor), an
//! error log, the guardrails document (cross-task learnings that survive
//! every completion), the ephemeral question/answer exchange files, and a
//! `completed/` archive.
//!
//! `init` is idempotent: it creates the directory and seeds any missing file
//! with its canonical header, and changes nothing that already exists. On
//! task completion the progress/activity/error files are archived under a
//! shared timestamp and reset to those same headers; the guardrails document
//! is never touched.
//!
//! The version-control history is the only durable cross-iteration memory —
//! this store is working state, and the driver commits it alongside the
//! agent's edits.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::ralph::error::RalphError;
use crate::ralph::task::TASK_FILE_NAME;

/// Name of the state directory under the workspace root.
pub const STATE_DIR_NAME: &str = ".ralph";

/// Canonical header of `progress.md`.
pub const PROGRESS_HEADER: &str = "# Progress Log\n\n\
     > Updated by the agent after significant work.\n\n\
     ---\n\n\
     ## Session History\n\n";

/// Canonical header of `activity.log`.
pub const ACTIVITY_HEADER: &str =
    "# Activity Log\n\n> Real-time tool call logging from the supervisor.\n\n";

/// Canonical header of `errors.log`.
pub const ERRORS_HEADER: &str =
    "# Error Log\n\n> Failures detected by the supervisor. Use to update guardrails.\n\n";

/// Seed content of `guardrails.md`. Written once; never reset.
pub const GUARDRAILS_HEADER: &str = "# Ralph Guardrails (Signs)\n\n\
     > Lessons learned from past failures. READ THESE BEFORE ACTING.\n\n\
     ## Core Signs\n\n\
     ### Sign: Read Before Writing\n\
     - **Trigger**: Before modifying any file\n\
     - **Instruction**: Always read the existing file first\n\
     - **Added after**: Core principle\n\n\
     ### Sign: Test After Changes\n\
     - **Trigger**: After any code change\n\
     - **Instruction**: Run tests to verify nothing broke\n\
     - **Added after**: Core principle\n\n\
     ### Sign: Commit Checkpoints\n\
     - **Trigger**: Before risky changes\n\
     - **Instruction**: Commit current working state first\n\
     - **Added after**: Core principle\n\n\
     ---\n\n\
     ## Learned Signs\n\n";

/// Compress the progress log once it exceeds this many lines…
const PROGRESS_MAX_LINES: usize = 2_000;
/// …or this estimated token footprint.
const PROGRESS_MAX_TOKENS: usize = 20_000;
/// Lines retained from the tail when compressing.
const PROGRESS_KEEP_TAIL: usize = 500;

/// Handle to the `.ralph/` state directory of one workspace.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
    workspace: PathBuf,
}

impl StateStore {
    pub fn new(workspace: &Path) -> Self {
        Self {
            dir: workspace.join(STATE_DIR_NAME),
            workspace: workspace.to_path_buf(),
        }
    }

    /// Create the state directory and seed missing files with canonical
    /// headers. Calling this on an initialized directory changes nothing.
    pub fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.seed(&self.progress_path(), PROGRESS_HEADER)?;
        self.seed(&self.guardrails_path(), GUARDRAILS_HEADER)?;
        self.seed(&self.errors_path(), ERRORS_HEADER)?;
        self.seed(&self.activity_path(), ACTIVITY_HEADER)?;
        Ok(())
    }

    fn seed(&self, path: &Path, header: &str) -> std::io::Result<()> {
        if !path.exists() {
            fs::write(path, header)?;
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the task specification this store's workspace uses.
    pub fn task_file(&self) -> PathBuf {
        self.workspace.join(TASK_FILE_NAME)
    }

    pub fn progress_path(&self) -> PathBuf {
        self.dir.join("progress.md")
    }

    pub fn activity_path(&self) -> PathBuf {
        self.dir.join("activity.log")
    }

    pub fn errors_path(&self) -> PathBuf {
        self.dir.join("errors.log")
    }

    pub fn guardrails_path(&self) -> PathBuf {
        self.dir.join("guardrails.md")
    }

    pub fn question_path(&self) -> PathBuf {
        self.dir.join("question.md")
    }

    pub fn answer_path(&self) -> PathBuf {
        self.dir.join("answer.md")
    }

    pub fn completed_dir(&self) -> PathBuf {
        self.dir.join("completed")
    }

    /// Append a dated entry to the progress log.
    pub fn log_progress(&self, message: &str) -> std::io::Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.progress_path())?;
        write!(file, "\n### {}\n{}\n", timestamp, message)
    }

    /// Append a timestamped line to the activity log.
    pub fn log_activity(&self, message: &str) -> std::io::Result<()> {
        self.append_timestamped(&self.activity_path(), message)
    }

    /// Append a timestamped line to the error log.
    pub fn log_error(&self, message: &str) -> std::io::Result<()> {
        self.append_timestamped(&self.errors_path(), message)
    }

    fn append_timestamped(&self, path: &Path, message: &str) -> std::io::Result<()> {
        let timestamp = Local::now().format("%H:%M:%S");
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "[{}] {}", timestamp, message)
    }

    /// Read the agent's pending question, if any.
    pub fn read_question(&self) -> std::io::Result<Option<String>> {
        match fs::read_to_string(self.question_path()) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write the operator's answer. An empty answer still produces the file,
    /// so the agent can distinguish "no reply" from "not answered yet".
    pub fn write_answer(&self, text: &str) -> std::io::Result<()> {
        fs::write(self.answer_path(), text)
    }

    /// Remove the question file after the exchange.
    pub fn clear_question(&self) -> std::io::Result<()> {
        match fs::remove_file(self.question_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Archive the completed task and reset working logs.
    ///
    /// Moves the task file to `completed/RALPH_TASK_<ts>.md`, copies
    /// progress/activity/errors to `completed/<base>_<ts>.<ext>`, then
    /// truncates each to its canonical header. Guardrails are untouched.
    /// Returns the archived task path, or `None` when no task file exists.
    ///
    /// The rename must succeed — losing the task file mid-archive would
    /// corrupt the store, so that failure aborts the driver.
    pub fn archive_completed(&self, timestamp: &str) -> Result<Option<PathBuf>, RalphError> {
        let task_file = self.task_file();
        if !task_file.exists() {
            return Ok(None);
        }

        let completed = self.completed_dir();
        fs::create_dir_all(&completed)?;

        let archive_path = completed.join(format!("RALPH_TASK_{}.md", timestamp));
        fs::rename(&task_file, &archive_path)?;

        self.archive_and_reset("progress", "md", PROGRESS_HEADER, timestamp)?;
        self.archive_and_reset("activity", "log", ACTIVITY_HEADER, timestamp)?;
        self.archive_and_reset("errors", "log", ERRORS_HEADER, timestamp)?;

        Ok(Some(archive_path))
    }

    fn archive_and_reset(
        &self,
        base: &str,
        ext: &str,
        header: &str,
        timestamp: &str,
    ) -> std::io::Result<()> {
        let source = self.dir.join(format!("{}.{}", base, ext));
        if !source.exists() {
            return Ok(());
        }
        let target = self
            .completed_dir()
            .join(format!("{}_{}.{}", base, timestamp, ext));
        fs::copy(&source, &target)?;
        fs::write(&source, header)
    }

    /// Compress the progress log when it grows past its line or token
    /// budget: keep the header and the last 500 lines, with a marker noting
    /// how much was dropped. Returns whether a rewrite happened.
    pub fn compress_progress(&self) -> std::io::Result<bool> {
        let path = self.progress_path();
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        let lines: Vec<&str> = content.lines().collect();
        let est_tokens = content.len() / 4;
        if lines.len() <= PROGRESS_MAX_LINES && est_tokens <= PROGRESS_MAX_TOKENS {
            return Ok(false);
        }

        // Header runs up to the Session History marker, or the first
        // timestamped entry when the marker is missing.
        let header_end = lines
            .iter()
            .position(|l| l.trim() == "## Session History")
            .map(|i| i + 1)
            .or_else(|| lines.iter().position(|l| l.starts_with("### ")))
            .unwrap_or(0);

        let tail_start = lines.len().saturating_sub(PROGRESS_KEEP_TAIL).max(header_end);
        let dropped = tail_start - header_end;
        if dropped == 0 {
            return Ok(false);
        }

        let mut out = String::new();
        for line in &lines[..header_end] {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!(
            "\n> [earlier entries compressed: {} lines removed]\n\n",
            dropped
        ));
        for line in &lines[tail_start..] {
            out.push_str(line);
            out.push('\n');
        }
        fs::write(&path, out)?;
        Ok(true)
    }
}
