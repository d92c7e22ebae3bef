//! Task specification parsing.
//!
//! The task file (`RALPH_TASK.md` at the workspace root) has a YAML
//! frontmatter block and a freeform markdown body. The body's bullet
//! checklist is the single source of truth for completion: a criterion is a
//! list bullet (`-`, `*`, or `1.`-style) followed by `[ ]` or `[x]`, and the
//! check mark decides whether it is done. The supervisor only ever reads
//! this file — the agent is the one who edits it.
//!
//! Indentation is not significant: a nested checkbox under a checked parent
//! is still counted independently.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ralph::error::RalphError;

/// File name of the task specification, relative to the workspace root.
pub const TASK_FILE_NAME: &str = "RALPH_TASK.md";

/// Test command used when the frontmatter does not declare one.
pub const DEFAULT_TEST_COMMAND: &str = "make test";

/// Default iteration budget when neither the CLI nor the frontmatter sets one.
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

/// Recognized keys of the task file's frontmatter block.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskHeader {
    /// Freeform task statement.
    #[serde(default)]
    pub task: Option<String>,
    /// Declared completion criteria. Informational; the body checklist is
    /// authoritative.
    #[serde(default)]
    pub completion_criteria: Vec<String>,
    /// Iteration budget declared by the task author.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Shell command the verifier must run.
    #[serde(default)]
    pub test_command: Option<String>,
}

impl Default for TaskHeader {
    fn default() -> Self {
        Self {
            task: None,
            completion_criteria: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            test_command: None,
        }
    }
}

impl TaskHeader {
    /// The test command the verifier should run, falling back to the default.
    pub fn test_command_or_default(&self) -> &str {
        self.test_command.as_deref().unwrap_or(DEFAULT_TEST_COMMAND)
    }
}

/// A parsed task specification.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub header: TaskHeader,
    pub body: String,
    pub path: PathBuf,
}

/// Criteria tally for a task body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriteriaCount {
    pub done: usize,
    pub total: usize,
}

impl CriteriaCount {
    pub fn remaining(&self) -> usize {
        self.total - self.done
    }
}

/// Completion verdict derived from the checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every criterion is checked (and at least one exists).
    Complete,
    /// This many criteria remain unchecked.
    Incomplete(usize),
    /// The body contains no checkbox lines at all.
    NoCriteria,
}

/// Split a document into its frontmatter block and body.
///
/// Returns `(None, content)` when the document does not open with `---`.
fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content.strip_prefix("---\n") else {
        return (None, content);
    };
    if let Some(end) = rest.find("\n---\n") {
        (Some(&rest[..end]), rest[end + 5..].trim_start_matches('\n'))
    } else if let Some(header) = rest.strip_suffix("\n---") {
        (Some(header), "")
    } else {
        (None, content)
    }
}

/// Parse the task file at `path`.
///
/// A missing frontmatter block yields a default header; a present but
/// malformed block is a fatal configuration error.
pub fn parse(path: &Path) -> Result<TaskSpec, RalphError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RalphError::TaskFile(format!("{}: {}", path.display(), e)))?;

    let (frontmatter, body) = split_frontmatter(&content);
    let header = match frontmatter {
        Some(block) => serde_yaml::from_str(block)
            .map_err(|e| RalphError::TaskFile(format!("malformed frontmatter: {}", e)))?,
        None => TaskHeader::default(),
    };

    Ok(TaskSpec {
        header,
        body: body.to_string(),
        path: path.to_path_buf(),
    })
}

/// Checkbox state of a single line: `Some(true)` for `[x]`, `Some(false)`
/// for `[ ]`, `None` for anything that is not a criterion line.
fn checkbox_state(line: &str) -> Option<bool> {
    let s = line.trim_start();

    // Bullet token: "-", "*", or one-or-more digits followed by ".".
    let after_bullet = if let Some(r) = s.strip_prefix('-').or_else(|| s.strip_prefix('*')) {
        r
    } else {
        let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        s[digits..].strip_prefix('.')?
    };

    // At least one whitespace character between bullet and bracket.
    let rest = after_bullet.strip_prefix(|c: char| c.is_whitespace())?;
    let rest = rest.trim_start();

    if rest.starts_with("[x]") {
        Some(true)
    } else if rest.starts_with("[ ]") {
        Some(false)
    } else {
        None
    }
}

/// Count checked and total criteria in a task document.
pub fn count_criteria(content: &str) -> CriteriaCount {
    let mut done = 0;
    let mut total = 0;
    for line in content.lines() {
        if let Some(checked) = checkbox_state(line) {
            total += 1;
            if checked {
                done += 1;
            }
        }
    }
    CriteriaCount { done, total }
}

/// Read the task file and derive the completion verdict.
pub fn check_completion(path: &Path) -> Result<Completion, RalphError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RalphError::TaskFile(format!("{}: {}", path.display(), e)))?;
    let count = count_criteria(&content);
    if count.total == 0 {
        Ok(Completion::NoCriteria)
    } else if count.done == count.total {
        Ok(Completion::Complete)
    } else {
        Ok(Completion::Incomplete(count.remaining()))
    }
}

/// Write a minimal task file synthesized from a single operator instruction.
///
/// Used when `RALPH_TASK.md` is absent and the operator passed
/// `--instruction`; the interactive interview of a full task authoring flow
/// is out of scope for the supervisor.
pub fn synthesize(path: &Path, instruction: &str) -> Result<(), RalphError> {
    let content = format!(
        "---\n\
         task: {instruction}\n\
         completion_criteria:\n\
         \x20 - {instruction}\n\
         max_iterations: {max}\n\
         ---\n\
         \n\
         # Task\n\
         \n\
         {instruction}\n\
         \n\
         ## Criteria\n\
         \n\
         - [ ] {instruction}\n",
        instruction = instruction,
        max = DEFAULT_MAX_ITERATIONS,
    );
    std::fs::write(path, content)?;
    Ok(())
}
