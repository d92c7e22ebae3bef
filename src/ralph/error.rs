//! Error types for the Ralph supervisor.
//!
//! A single [`RalphError`] enum covers every fatal condition the driver can
//! surface: configuration problems (not a git repository, malformed task
//! file, conflicting flags), provider availability, provider runtime
//! failures, and exhaustion of the iteration or verification budgets.
//!
//! Recoverable conditions (a provider crashing mid-iteration, a stream line
//! that fails to parse) are handled locally and never reach this type; only
//! what should terminate the process with a non-zero exit code does.

use std::path::PathBuf;

/// Errors that terminate a Ralph run.
#[derive(Debug)]
pub enum RalphError {
    /// The workspace is not a git repository.
    NotAGitRepo(PathBuf),
    /// The task specification file is missing or could not be parsed.
    TaskFile(String),
    /// Mutually incompatible or out-of-range command-line options.
    InvalidOptions(String),
    /// No provider CLI was found on PATH.
    NoProviders,
    /// A provider subprocess could not be spawned or its stream failed.
    Provider(String),
    /// A git operation that must succeed (e.g. the archive commit) failed.
    Git(String),
    /// IO error touching the state directory or task file.
    Io(std::io::Error),
    /// The maximum iteration count was reached without completion.
    IterationsExhausted(u32),
    /// Verification failed the maximum allowed number of times.
    VerificationExhausted(u32),
    /// The operator interrupted the run.
    Interrupted,
}

impl std::fmt::Display for RalphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RalphError::NotAGitRepo(path) => {
                write!(f, "{} is not a git repository", path.display())
            }
            RalphError::TaskFile(msg) => write!(f, "task file error: {}", msg),
            RalphError::InvalidOptions(msg) => write!(f, "invalid options: {}", msg),
            RalphError::NoProviders => write!(f, "no LLM providers available"),
            RalphError::Provider(msg) => write!(f, "provider error: {}", msg),
            RalphError::Git(msg) => write!(f, "git error: {}", msg),
            RalphError::Io(e) => write!(f, "IO error: {}", e),
            RalphError::IterationsExhausted(n) => {
                write!(f, "max iterations ({}) reached without completion", n)
            }
            RalphError::VerificationExhausted(n) => {
                write!(f, "verification failed {} times, giving up", n)
            }
            RalphError::Interrupted => write!(f, "interrupted by operator"),
        }
    }
}

impl std::error::Error for RalphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RalphError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RalphError {
    fn from(e: std::io::Error) -> Self {
        RalphError::Io(e)
    }
}

impl RalphError {
    /// A remediation hint suitable for printing under the error message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            RalphError::NotAGitRepo(_) => {
                Some("Ralph requires git for state persistence. Run 'git init' first.")
            }
            RalphError::TaskFile(_) => {
                Some("Create RALPH_TASK.md or pass --instruction to synthesize one.")
            }
            RalphError::NoProviders => {
                Some("Install one of: cursor-agent, claude, gemini, or codex.")
            }
            RalphError::InvalidOptions(_) => None,
            RalphError::IterationsExhausted(_) => {
                Some("Task may not be complete. Check .ralph/progress.md manually.")
            }
            RalphError::VerificationExhausted(_) => {
                Some("The task was archived; see .ralph/completed/ for the final state.")
            }
            _ => None,
        }
    }
}
