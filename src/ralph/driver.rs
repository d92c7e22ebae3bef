//! Driver loop — the top-level state machine.
//!
//! One driver runs per workspace, single-threaded with respect to its own
//! state: iterate, interpret the returned signal, then either re-enter the
//! loop, promote to verification, pause to ask the operator, or terminate.
//! The driver owns the context every component needs (state store, git
//! collaborator, provider ring, thresholds) and threads it through — no
//! module-level globals.
//!
//! The driver never destroys task or state files itself: everything goes
//! through the state store's archive operations and the git collaborator.
//!
//! Verification exists because self-reported completion is unreliable: a
//! fresh agent — a different provider whenever the ring permits — re-runs
//! the declared tests and re-reads every criterion before the task is
//! archived.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::sleep;

use crate::ralph::error::RalphError;
use crate::ralph::git::GitRepo;
use crate::ralph::prompt;
use crate::ralph::providers::ring::ProviderRing;
use crate::ralph::runner::{self, RunnerConfig};
use crate::ralph::signal::{Signal, ITERATION_STOPS};
use crate::ralph::state::StateStore;
use crate::ralph::supervisor::{LoopHooks, NoHooks};
use crate::ralph::task::{self, Completion, DEFAULT_TEST_COMMAND};

/// How long the ASK state waits for the operator before writing an empty
/// answer and resuming.
const QUESTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause between iterations. Rate-limits the provider back-ends.
const ITERATION_PAUSE: Duration = Duration::from_secs(2);

/// Default verification-failure budget.
pub const DEFAULT_MAX_VERIFICATION_FAILURES: u32 = 3;

/// Operator-tunable parameters of one driver run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub max_iterations: u32,
    pub warn_threshold: u64,
    pub rotate_threshold: u64,
    pub timeout_secs: u64,
    pub max_verification_failures: u32,
    pub branch: Option<String>,
    pub open_pr: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_iterations: task::DEFAULT_MAX_ITERATIONS,
            warn_threshold: crate::ralph::budget::DEFAULT_WARN_THRESHOLD,
            rotate_threshold: crate::ralph::budget::DEFAULT_ROTATE_THRESHOLD,
            timeout_secs: 300,
            max_verification_failures: DEFAULT_MAX_VERIFICATION_FAILURES,
            branch: None,
            open_pr: false,
        }
    }
}

/// Successful driver outcomes. Fatal conditions are [`RalphError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The verifier approved completion; the task was archived.
    Verified { iterations: u32 },
    /// Every criterion was already checked before the first iteration.
    AlreadyComplete,
}

/// Source of operator answers for the ASK state.
///
/// Abstracted so the driver can be exercised in tests without a terminal.
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    /// Display the question and wait up to `timeout` for an answer.
    /// `None` means timeout, end of input, or an explicitly empty reply.
    async fn ask(&self, question: &str, timeout: Duration) -> Option<String>;
}

/// Reads answers from the process's stdin.
pub struct StdinPrompt;

#[async_trait]
impl OperatorPrompt for StdinPrompt {
    async fn ask(&self, question: &str, timeout: Duration) -> Option<String> {
        println!();
        println!("── Agent question ──────────────────────────────");
        println!("{}", question.trim());
        println!("────────────────────────────────────────────────");
        println!("Answer (enter to skip, {}s timeout):", timeout.as_secs());

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match tokio::time::timeout(timeout, reader.read_line(&mut line)).await {
            Ok(Ok(n)) if n > 0 => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            _ => None,
        }
    }
}

pub struct Driver {
    workspace: PathBuf,
    store: StateStore,
    git: GitRepo,
    ring: ProviderRing,
    config: DriverConfig,
    hooks: Arc<dyn LoopHooks>,
    operator: Arc<dyn OperatorPrompt>,
}

impl Driver {
    pub fn new(workspace: &Path, ring: ProviderRing, config: DriverConfig) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
            store: StateStore::new(workspace),
            git: GitRepo::new(workspace),
            ring,
            config,
            hooks: Arc::new(NoHooks),
            operator: Arc::new(StdinPrompt),
        }
    }

    /// Attach dashboard callbacks.
    pub fn with_hooks(mut self, hooks: Arc<dyn LoopHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the operator-answer source (used by tests).
    pub fn with_operator(mut self, operator: Arc<dyn OperatorPrompt>) -> Self {
        self.operator = operator;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run the full loop: iterate until completion is claimed, verify with
    /// an independently chosen provider, archive on a passing verdict.
    pub async fn run(&mut self) -> Result<Outcome, RalphError> {
        self.preflight().await?;
        let task_path = self.store.task_file();

        if matches!(task::check_completion(&task_path)?, Completion::Complete) {
            log::info!("task already complete; all criteria are checked");
            return Ok(Outcome::AlreadyComplete);
        }

        if self.git.has_uncommitted_changes().await {
            self.git
                .commit_all("ralph: initial commit before loop")
                .await?;
        }
        if let Some(branch) = self.config.branch.clone() {
            self.git.create_branch(&branch).await?;
        }

        let runner_config = self.runner_config();
        let mut iteration: u32 = 1;
        let mut vfails: u32 = 0;

        while iteration <= self.config.max_iterations {
            if let Err(e) = self.store.compress_progress() {
                log::warn!("progress compression failed: {}", e);
            }

            let provider = self.ring.current();
            log::info!(
                "iteration {}/{} (provider: {})",
                iteration,
                self.config.max_iterations,
                provider.display_name()
            );
            self.progress(&format!(
                "**Session {} started** (provider: {})",
                iteration,
                provider.display_name()
            ));

            let iteration_prompt = prompt::iteration_prompt(iteration);
            let result = runner::run_iteration(
                &self.workspace,
                &self.store,
                provider.as_ref(),
                &iteration_prompt,
                ITERATION_STOPS,
                Signal::Rotate,
                &runner_config,
                self.hooks.as_ref(),
            )
            .await;

            let signal = match result {
                Ok(signal) => signal,
                Err(e) => {
                    // Provider-runtime failure: rotate and retry the same
                    // iteration number when an alternate exists.
                    log::warn!("provider {} failed: {}", provider.display_name(), e);
                    self.progress(&format!(
                        "**Session {} failed** - provider error: {}",
                        iteration, e
                    ));
                    if self.ring.has_alternates() {
                        let next = self.ring.advance();
                        log::info!("rotating to provider {}", next.display_name());
                    } else {
                        iteration += 1;
                    }
                    sleep(ITERATION_PAUSE).await;
                    continue;
                }
            };

            let complete = matches!(task::check_completion(&task_path)?, Completion::Complete);

            match signal {
                Some(Signal::Complete) | None if complete => {
                    self.progress(&format!(
                        "**Session {} ended** - completion claimed, all criteria checked",
                        iteration
                    ));
                    if let Some(outcome) =
                        self.verify(iteration, &mut vfails, &runner_config).await?
                    {
                        return Ok(outcome);
                    }
                    iteration += 1;
                }
                Some(Signal::Complete) => {
                    self.progress(&format!(
                        "**Session {} ended** - agent claimed complete but criteria remain",
                        iteration
                    ));
                    iteration += 1;
                }
                None => {
                    if let Completion::Incomplete(n) = task::check_completion(&task_path)? {
                        self.progress(&format!(
                            "**Session {} ended** - agent finished naturally ({} criteria remaining)",
                            iteration, n
                        ));
                    }
                    iteration += 1;
                }
                Some(Signal::Rotate) => {
                    self.progress(&format!(
                        "**Session {} ended** - context rotation",
                        iteration
                    ));
                    iteration += 1;
                }
                Some(Signal::Gutter) => {
                    self.progress(&format!(
                        "**Session {} ended** - GUTTER ({})",
                        iteration,
                        provider.display_name()
                    ));
                    if self.ring.has_alternates() {
                        let next = self.ring.advance();
                        log::info!("gutter: rotating to provider {}", next.display_name());
                        self.progress(&format!(
                            "**Provider rotation** - {} -> {} (gutter)",
                            provider.display_name(),
                            next.display_name()
                        ));
                        // Retry the same iteration number with the new provider.
                    } else {
                        iteration += 1;
                    }
                }
                Some(Signal::Question) => {
                    self.handle_question().await?;
                    iteration += 1;
                }
                Some(other) => {
                    log::warn!("unexpected signal {} during iteration", other);
                    self.progress(&format!(
                        "**Session {} ended** - unexpected signal {}",
                        iteration, other
                    ));
                    iteration += 1;
                }
            }

            sleep(ITERATION_PAUSE).await;
        }

        self.progress(&format!(
            "**Loop ended** - max iterations ({}) reached",
            self.config.max_iterations
        ));
        Err(RalphError::IterationsExhausted(self.config.max_iterations))
    }

    /// Run a single iteration and report the resulting criteria state.
    pub async fn run_once(&mut self) -> Result<(), RalphError> {
        self.preflight().await?;
        let provider = self.ring.current();
        let runner_config = self.runner_config();
        let iteration_prompt = prompt::iteration_prompt(1);

        self.progress(&format!(
            "**Session 1 started** (provider: {}, single-iteration mode)",
            provider.display_name()
        ));
        runner::run_iteration(
            &self.workspace,
            &self.store,
            provider.as_ref(),
            &iteration_prompt,
            ITERATION_STOPS,
            Signal::Rotate,
            &runner_config,
            self.hooks.as_ref(),
        )
        .await?;

        match task::check_completion(&self.store.task_file())? {
            Completion::Complete => log::info!("task completed in a single iteration"),
            Completion::Incomplete(n) => {
                log::info!("single iteration done; {} criteria remaining", n)
            }
            Completion::NoCriteria => log::info!("single iteration done; task has no criteria"),
        }
        Ok(())
    }

    /// Verification phase. Returns `Some(outcome)` when the run is over,
    /// `None` when the driver should re-enter the iteration loop.
    async fn verify(
        &mut self,
        iteration: u32,
        vfails: &mut u32,
        runner_config: &RunnerConfig,
    ) -> Result<Option<Outcome>, RalphError> {
        // Advance the ring so the verifier differs from the implementer
        // whenever more than one provider exists.
        if self.ring.has_alternates() {
            self.ring.advance();
        }
        let verifier = self.ring.current();
        log::info!("verifying completion (provider: {})", verifier.display_name());

        let test_command = task::parse(&self.store.task_file())
            .map(|spec| spec.header.test_command_or_default().to_string())
            .unwrap_or_else(|_| DEFAULT_TEST_COMMAND.to_string());
        let verification_prompt = prompt::verification_prompt(iteration, &test_command);

        let verdict = runner::run_verification(
            &self.workspace,
            &self.store,
            verifier.as_ref(),
            &verification_prompt,
            runner_config,
            self.hooks.as_ref(),
        )
        .await;

        if verdict == Signal::VerifyPass {
            self.progress("**Verification passed** - archiving task");
            self.archive().await?;
            if let Some(branch) = self.config.branch.clone() {
                self.git.push(Some(&branch)).await;
                if self.config.open_pr {
                    self.git.open_pr().await;
                }
            }
            log::info!("task complete and verified in {} iteration(s)", iteration);
            return Ok(Some(Outcome::Verified {
                iterations: iteration,
            }));
        }

        // Any non-pass verdict (fail, gutter, rotate, timeout, error)
        // counts against the verification budget.
        *vfails += 1;
        log::warn!(
            "verification did not pass (verdict: {}, failures: {}/{})",
            verdict,
            vfails,
            self.config.max_verification_failures
        );
        self.progress(&format!(
            "**Verification failed** ({}/{})",
            vfails, self.config.max_verification_failures
        ));

        if *vfails >= self.config.max_verification_failures {
            // Archive anyway so the operator gets the final state.
            self.archive().await?;
            return Err(RalphError::VerificationExhausted(*vfails));
        }
        Ok(None)
    }

    /// ASK state: show the agent's question, collect an answer (empty on
    /// timeout), and clean up the exchange files.
    async fn handle_question(&self) -> Result<(), RalphError> {
        let question = self
            .store
            .read_question()?
            .unwrap_or_else(|| "(the agent signaled a question but wrote no question file)".into());
        self.progress("**Agent asked a question** - pausing for operator");

        let answer = self
            .operator
            .ask(&question, QUESTION_TIMEOUT)
            .await
            .unwrap_or_default();
        // The answer file is written even when empty so the agent can tell
        // "no reply" apart from "not answered yet".
        self.store.write_answer(&answer)?;
        self.store.clear_question()?;
        self.progress(if answer.is_empty() {
            "**Question timed out** - empty answer recorded"
        } else {
            "**Question answered** - resuming"
        });
        Ok(())
    }

    async fn preflight(&self) -> Result<(), RalphError> {
        if !self.git.is_repo().await {
            return Err(RalphError::NotAGitRepo(self.workspace.clone()));
        }
        self.store.init()?;

        let task_path = self.store.task_file();
        if !task_path.exists() {
            return Err(RalphError::TaskFile(format!(
                "{} not found",
                task_path.display()
            )));
        }
        task::parse(&task_path)?;
        Ok(())
    }

    async fn archive(&self) -> Result<(), RalphError> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        if let Some(path) = self.store.archive_completed(&timestamp)? {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("archive")
                .to_string();
            self.git
                .commit_all(&format!("ralph: archive completed task to {}", name))
                .await?;
        }
        Ok(())
    }

    fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            warn_threshold: self.config.warn_threshold,
            rotate_threshold: self.config.rotate_threshold,
            timeout: Duration::from_secs(self.config.timeout_secs),
        }
    }

    fn progress(&self, message: &str) {
        if let Err(e) = self.store.log_progress(message) {
            log::warn!("progress log append failed: {}", e);
        }
    }
}
