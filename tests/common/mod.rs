#![allow(dead_code)]

//! Shared test fixtures: a scripted provider adapter and workspace setup.

use std::path::{Path, PathBuf};
use std::process::Command;

use ralph::event::AgentEvent;
use ralph::providers::cursor::CursorAdapter;
use ralph::providers::ProviderAdapter;
use tempfile::TempDir;

/// A provider whose "CLI" is a shell script emitting cursor-agent-style
/// stream-json lines. Always reports itself available.
pub struct ScriptedAdapter {
    pub name: &'static str,
    pub script: String,
}

impl ScriptedAdapter {
    pub fn new(name: &'static str, script: &str) -> Self {
        Self {
            name,
            script: script.to_string(),
        }
    }
}

impl ProviderAdapter for ScriptedAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn display_name(&self) -> &'static str {
        self.name
    }

    fn available(&self) -> bool {
        true
    }

    fn spawn_args(&self, _workspace: &Path) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), self.script.clone()]
    }

    fn normalize(&self, raw_line: &str) -> Option<AgentEvent> {
        CursorAdapter.normalize(raw_line)
    }
}

/// Shell fragment that prints one assistant-text line carrying `text`.
/// `text` must not contain single quotes.
pub fn say(text: &str) -> String {
    format!(
        r#"printf '%s\n' '{{"type":"assistant","message":{{"content":[{{"text":"{}"}}]}}}}'"#,
        text
    )
}

/// Create a git workspace with an initial commit and the given task file.
pub fn git_workspace(task_content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().to_path_buf();

    run_git(&path, &["init", "-q"]);
    run_git(&path, &["config", "user.email", "ralph@test"]);
    run_git(&path, &["config", "user.name", "Ralph Test"]);

    std::fs::write(path.join("RALPH_TASK.md"), task_content).expect("write task");
    run_git(&path, &["add", "-A"]);
    run_git(&path, &["commit", "-q", "-m", "initial"]);

    (dir, path)
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .status()
        .expect("git invocation");
    assert!(status.success(), "git {:?} failed", args);
}
