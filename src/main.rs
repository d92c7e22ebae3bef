//! `ralph` CLI entry point.
//!
//! One operational command: `ralph run <workspace>`. Exit code 0 means the
//! task completed and verification passed (or there was nothing to do);
//! exit code 1 covers every fatal condition — not a repository, no
//! providers, a malformed task file, exhausted budgets, or an operator
//! interrupt.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};

use ralph::budget::{DEFAULT_ROTATE_THRESHOLD, DEFAULT_WARN_THRESHOLD};
use ralph::driver::{Driver, DriverConfig, DEFAULT_MAX_VERIFICATION_FAILURES};
use ralph::error::RalphError;
use ralph::git::GitRepo;
use ralph::providers::ring::ProviderRing;
use ralph::task::{self, TASK_FILE_NAME};

#[derive(Parser)]
#[command(name = "ralph", version, about = "Autonomous development loop supervisor")]
struct Cli {
    /// Enable verbose debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the development loop on a workspace.
    ///
    /// The workspace must be a git repository containing RALPH_TASK.md
    /// (or pass --instruction to synthesize a minimal one). Providers are
    /// detected on PATH and rotated automatically on failure or gutter.
    Run {
        /// Workspace directory (must be a git repository).
        workspace: PathBuf,

        /// Maximum number of iterations. Defaults to the task file's
        /// max_iterations, or 20.
        #[arg(long)]
        iterations: Option<u32>,

        /// Create and work on this branch.
        #[arg(long)]
        branch: Option<String>,

        /// Open a PR when complete (requires --branch).
        #[arg(long)]
        pr: bool,

        /// Run a single iteration only.
        #[arg(long)]
        once: bool,

        /// Token count at which to warn about context size.
        #[arg(long, default_value_t = DEFAULT_WARN_THRESHOLD)]
        warn_threshold: u64,

        /// Token count at which to trigger context rotation.
        #[arg(long, default_value_t = DEFAULT_ROTATE_THRESHOLD)]
        rotate_threshold: u64,

        /// Timeout in seconds for provider operations.
        #[arg(long, default_value_t = 300)]
        timeout: u64,

        /// Instruction used to synthesize RALPH_TASK.md when it is missing.
        #[arg(long)]
        instruction: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let code = match cli.command {
        Command::Run {
            workspace,
            iterations,
            branch,
            pr,
            once,
            warn_threshold,
            rotate_threshold,
            timeout,
            instruction,
        } => {
            run_command(
                &workspace,
                iterations,
                branch,
                pr,
                once,
                warn_threshold,
                rotate_threshold,
                timeout,
                instruction,
            )
            .await
        }
    };
    std::process::exit(code);
}

#[allow(clippy::too_many_arguments)]
async fn run_command(
    workspace: &Path,
    iterations: Option<u32>,
    branch: Option<String>,
    pr: bool,
    once: bool,
    warn_threshold: u64,
    rotate_threshold: u64,
    timeout: u64,
    instruction: Option<String>,
) -> i32 {
    if pr && branch.is_none() {
        return fail(&RalphError::InvalidOptions(
            "--pr requires --branch".to_string(),
        ));
    }
    if warn_threshold == 0 || rotate_threshold == 0 || warn_threshold > rotate_threshold {
        return fail(&RalphError::InvalidOptions(
            "thresholds must be positive with --warn-threshold <= --rotate-threshold".to_string(),
        ));
    }

    let workspace = match workspace.canonicalize() {
        Ok(path) => path,
        Err(e) => {
            return fail(&RalphError::InvalidOptions(format!(
                "workspace {}: {}",
                workspace.display(),
                e
            )))
        }
    };

    let task_path = workspace.join(TASK_FILE_NAME);
    if !task_path.exists() {
        match &instruction {
            Some(text) => {
                log::info!("synthesizing {} from --instruction", TASK_FILE_NAME);
                if let Err(e) = task::synthesize(&task_path, text) {
                    return fail(&e);
                }
            }
            None => {
                return fail(&RalphError::TaskFile(format!(
                    "{} not found",
                    task_path.display()
                )))
            }
        }
    }

    let spec = match task::parse(&task_path) {
        Ok(spec) => spec,
        Err(e) => return fail(&e),
    };
    let max_iterations = iterations.unwrap_or(spec.header.max_iterations);

    let ring = match ProviderRing::detect() {
        Ok(ring) => ring,
        Err(e) => return fail(&e),
    };

    log::info!("workspace: {}", workspace.display());
    log::info!("providers: {}", ring.display_names().join(", "));
    log::info!("max iterations: {}", max_iterations);
    if let Some(name) = &branch {
        log::info!("branch: {}", name);
    }

    let config = DriverConfig {
        max_iterations,
        warn_threshold,
        rotate_threshold,
        timeout_secs: timeout,
        max_verification_failures: DEFAULT_MAX_VERIFICATION_FAILURES,
        branch,
        open_pr: pr,
    };
    let mut driver = Driver::new(&workspace, ring, config);

    if once {
        return match driver.run_once().await {
            Ok(()) => 0,
            Err(e) => fail(&e),
        };
    }

    tokio::select! {
        result = driver.run() => match result {
            Ok(outcome) => {
                log::info!("done: {:?}", outcome);
                0
            }
            Err(e) => fail(&e),
        },
        _ = tokio::signal::ctrl_c() => {
            log::warn!("interrupted by operator");
            drain_on_interrupt(&workspace).await;
            fail(&RalphError::Interrupted)
        }
    }
}

/// Commit any working-tree changes before exiting on interrupt, so the
/// next run picks up from a clean checkpoint.
async fn drain_on_interrupt(workspace: &Path) {
    let git = GitRepo::new(workspace);
    if git.has_uncommitted_changes().await {
        log::info!("committing current progress...");
        if let Err(e) = git.commit_all("ralph: interrupted - saving progress").await {
            log::warn!("could not save progress: {}", e);
        } else {
            log::info!("progress saved");
        }
    }
    // Give the child's kill-on-drop a moment to land.
    tokio::time::sleep(Duration::from_millis(100)).await;
}

fn fail(error: &RalphError) -> i32 {
    log::error!("{}", error);
    if let Some(hint) = error.hint() {
        log::error!("hint: {}", hint);
    }
    1
}
