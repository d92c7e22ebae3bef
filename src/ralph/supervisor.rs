//! Stream supervision for a running agent.
//!
//! The supervisor consumes normalized events one at a time, drives the
//! budget estimator, thrash detector, and signal decoder, and hands back the
//! signals each event produced. It is the single emitter of activity-log
//! lines while an iteration runs, which keeps the log ordering deterministic
//! even though wall-clock snapshots and stream events interleave.
//!
//! Per-event ordering is fixed: budget and detector mutations happen first,
//! dashboard callbacks next, signal production last. Between events the
//! supervisor is strictly single-threaded — the iteration runner pulls one
//! event, processes it fully, then pulls the next.
//!
//! State-store append failures are deliberately non-fatal here: a log line
//! that cannot be written must not kill a healthy agent run, so they are
//! logged through the crate logger and swallowed.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;

use crate::ralph::budget::BudgetEstimator;
use crate::ralph::event::AgentEvent;
use crate::ralph::signal::{decode, Signal};
use crate::ralph::state::StateStore;
use crate::ralph::thrash::ThrashDetector;

/// Seconds between periodic budget snapshots in the activity log.
const SNAPSHOT_INTERVAL_SECS: u64 = 30;

/// Callbacks for an attached dashboard or other observer.
///
/// Both methods default to no-ops, so observers override only what they
/// care about. Handlers must not assume they are called from any particular
/// thread beyond the supervisor's single-threaded event loop.
#[async_trait]
pub trait LoopHooks: Send + Sync {
    /// The agent wrote to the task specification file; criteria may have
    /// changed. Invoked after the budget has been updated for the write.
    async fn on_task_file_update(&self) {}

    /// Periodic budget snapshot (roughly every 30 s of wall time).
    async fn on_budget_snapshot(&self, _estimate: u64, _rotate_threshold: u64) {}
}

/// Hook implementation that observes nothing.
pub struct NoHooks;

#[async_trait]
impl LoopHooks for NoHooks {}

/// Per-iteration supervisor over the agent's event stream.
pub struct StreamSupervisor<'a> {
    store: &'a StateStore,
    budget: &'a mut BudgetEstimator,
    thrash: &'a mut ThrashDetector,
    hooks: &'a dyn LoopHooks,
    task_file: PathBuf,
    last_snapshot: Instant,
}

impl<'a> StreamSupervisor<'a> {
    pub fn new(
        store: &'a StateStore,
        budget: &'a mut BudgetEstimator,
        thrash: &'a mut ThrashDetector,
        hooks: &'a dyn LoopHooks,
    ) -> Self {
        let task_file = store.task_file();
        Self {
            store,
            budget,
            thrash,
            hooks,
            task_file,
            last_snapshot: Instant::now(),
        }
    }

    /// Write the session-start banner to the activity log.
    pub fn begin_session(&self, provider_name: &str) {
        self.activity("═══════════════════════════════════════════════════");
        self.activity(&format!("Ralph session started (provider: {})", provider_name));
    }

    /// Final snapshot and session-end line, once the stream has closed.
    pub async fn finish(&mut self) {
        self.snapshot().await;
        self.activity(&format!("SESSION END: ~{} tokens used", self.budget.current()));
    }

    /// Process one event; returns the signals it produced, in order.
    pub async fn process(&mut self, event: &AgentEvent) -> Vec<Signal> {
        let mut signals = Vec::new();

        match event {
            AgentEvent::SystemInit { model } => {
                self.activity(&format!("SESSION START: model={}", model));
            }
            AgentEvent::AssistantText { text } => {
                self.budget.add_assistant(text.len() as u64);
                if let Some(signal) = decode(text) {
                    self.activity(&format!("Agent signaled {}", signal));
                    signals.push(signal);
                }
            }
            AgentEvent::ToolRead { path, bytes } => {
                self.budget.add_read(*bytes);
                let marker = self.budget.health().marker();
                self.activity(&format!("[{}] READ {} ({}B)", marker, path, bytes));
            }
            AgentEvent::ToolWrite { path, bytes } => {
                self.budget.add_write(*bytes);
                let marker = self.budget.health().marker();
                self.activity(&format!("[{}] WRITE {} ({}B)", marker, path, bytes));

                // The agent may report the path relative to the workspace
                // or absolute; either way it resolves to the task file.
                let written = std::path::Path::new(path);
                if written == self.task_file
                    || (written.is_relative() && self.task_file.ends_with(written))
                {
                    self.hooks.on_task_file_update().await;
                }

                if self.thrash.record_write(path) {
                    self.error(&format!("THRASHING: {} written 5x in 10 min", path));
                    signals.push(Signal::Gutter);
                }
            }
            AgentEvent::ToolShell {
                command,
                exit_code,
                stdout_bytes,
                stderr_bytes,
            } => {
                self.budget.add_shell(stdout_bytes + stderr_bytes);
                let marker = self.budget.health().marker();
                self.activity(&format!(
                    "[{}] SHELL {} -> exit {}",
                    marker, command, exit_code
                ));

                if *exit_code != 0 {
                    self.error(&format!("SHELL FAIL: {} -> exit {}", command, exit_code));
                    if self.thrash.record_failure(command, *exit_code) {
                        self.error("GUTTER: same command failed 3x");
                        signals.push(Signal::Gutter);
                    }
                }
            }
            AgentEvent::Result | AgentEvent::Unknown => {}
        }

        // Threshold checks run after every event, on the post-mutation
        // estimate. Rotation subsumes the warning.
        if self.budget.should_rotate() {
            self.activity(&format!(
                "ROTATE: token threshold reached ({} >= {})",
                self.budget.current(),
                self.budget.rotate_threshold()
            ));
            signals.push(Signal::Rotate);
        } else if self.budget.should_warn() {
            self.activity(&format!(
                "WARN: approaching token limit ({} / {})",
                self.budget.current(),
                self.budget.rotate_threshold()
            ));
            signals.push(Signal::Warn);
        }

        if self.last_snapshot.elapsed().as_secs() >= SNAPSHOT_INTERVAL_SECS {
            self.snapshot().await;
            self.last_snapshot = Instant::now();
        }

        signals
    }

    /// Log a `TOKENS:` status line and notify the dashboard.
    async fn snapshot(&self) {
        let estimate = self.budget.current();
        let limit = self.budget.rotate_threshold();
        let pct = estimate * 100 / limit;
        self.activity(&format!(
            "[{}] TOKENS: {} / {} ({}%) {}",
            self.budget.health().marker(),
            estimate,
            limit,
            pct,
            self.budget.breakdown()
        ));
        self.hooks.on_budget_snapshot(estimate, limit).await;
    }

    fn activity(&self, message: &str) {
        if let Err(e) = self.store.log_activity(message) {
            log::warn!("activity log append failed: {}", e);
        }
    }

    fn error(&self, message: &str) {
        if let Err(e) = self.store.log_error(message) {
            log::warn!("error log append failed: {}", e);
        }
    }
}
