//! Iteration runner — one supervised agent run.
//!
//! Spawns the provider CLI against the workspace, feeds the prompt on stdin,
//! and drives the stream supervisor over the normalized stdout events while
//! a wall-clock timeout watches the whole run. stderr is captured separately
//! for post-mortem logging.
//!
//! The runner owns the iteration context: a fresh budget estimator and
//! thrash detector are created per run and die with it. Termination is
//! two-phase — request the kill, wait a grace period for the process to be
//! reaped, then force-kill — so a child blocked on output can never leak.
//!
//! Failure semantics differ by mode. In a normal iteration, spawn and
//! stream errors propagate so the driver can rotate providers. In
//! verification mode ([`run_verification`]) every error collapses to
//! `VERIFY_FAIL`, which the driver counts against its verification-failure
//! budget.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::{sleep_until, Instant};

use crate::ralph::budget::BudgetEstimator;
use crate::ralph::error::RalphError;
use crate::ralph::providers::ProviderAdapter;
use crate::ralph::signal::{Signal, VERIFICATION_STOPS};
use crate::ralph::state::StateStore;
use crate::ralph::supervisor::{LoopHooks, StreamSupervisor};
use crate::ralph::thrash::ThrashDetector;

/// How long to wait for a terminated child before force-killing it.
const REAP_GRACE: Duration = Duration::from_secs(10);

/// Upper bound on captured stderr, enough for any useful post-mortem.
const STDERR_CAPTURE_LIMIT: usize = 256 * 1024;

/// Parameters for one agent run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub warn_threshold: u64,
    pub rotate_threshold: u64,
    pub timeout: Duration,
}

/// Run one supervised agent iteration.
///
/// Returns the first supervisor signal found in `stop_set`, or
/// `timeout_signal` when the wall clock fired or the child exited non-zero
/// without signalling, or `None` when the agent finished naturally with no
/// verdict.
pub async fn run_iteration(
    workspace: &Path,
    store: &StateStore,
    provider: &dyn ProviderAdapter,
    prompt: &str,
    stop_set: &[Signal],
    timeout_signal: Signal,
    config: &RunnerConfig,
    hooks: &dyn LoopHooks,
) -> Result<Option<Signal>, RalphError> {
    let mut budget = BudgetEstimator::new(config.warn_threshold, config.rotate_threshold);
    let mut thrash = ThrashDetector::new();

    let argv = provider.spawn_args(workspace);
    let mut child = Command::new(&argv[0])
        .args(&argv[1..])
        .current_dir(workspace)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RalphError::Provider(format!("spawning {}: {}", provider.name(), e)))?;

    // Deliver the prompt and close stdin so the agent starts its turn.
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(prompt.as_bytes())
            .await
            .map_err(|e| RalphError::Provider(format!("writing prompt: {}", e)))?;
        stdin
            .shutdown()
            .await
            .map_err(|e| RalphError::Provider(format!("closing stdin: {}", e)))?;
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RalphError::Provider("child stdout was not piped".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| RalphError::Provider("child stderr was not piped".to_string()))?;
    let stderr_task = tokio::spawn(read_capped(stderr, STDERR_CAPTURE_LIMIT));

    let mut supervisor = StreamSupervisor::new(store, &mut budget, &mut thrash, hooks);
    supervisor.begin_session(provider.display_name());

    let deadline = Instant::now() + config.timeout;
    let mut lines = BufReader::new(stdout).lines();
    let mut emitted: Option<Signal> = None;
    let mut timed_out = false;
    let mut stream_err: Option<std::io::Error> = None;

    'stream: loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(raw)) => {
                    let Some(event) = provider.normalize(&raw) else { continue };
                    for signal in supervisor.process(&event).await {
                        if stop_set.contains(&signal) {
                            emitted = Some(signal);
                            break 'stream;
                        }
                    }
                }
                Ok(None) => break 'stream,
                Err(e) => {
                    stream_err = Some(e);
                    break 'stream;
                }
            },
            _ = sleep_until(deadline) => {
                timed_out = true;
                break 'stream;
            }
        }
    }

    supervisor.finish().await;

    // A stop signal, timeout, or stream error means the child is still
    // running and must be terminated; a closed stream means it is exiting
    // on its own and only needs reaping.
    let terminate = emitted.is_some() || timed_out || stream_err.is_some();
    let status = reap(&mut child, terminate).await;

    // Post-mortem: surface stderr when the run ended badly. Orphaned
    // grandchildren can hold the pipe open, so don't wait on them forever.
    let stderr_text =
        match tokio::time::timeout(Duration::from_secs(2), stderr_task).await {
            Ok(Ok(text)) => text,
            _ => String::new(),
        };
    let natural_failure = !terminate && !status.map(|s| s.success()).unwrap_or(false);
    if (timed_out || stream_err.is_some() || natural_failure) && !stderr_text.is_empty() {
        let mut tail_start = stderr_text.len().saturating_sub(2_000);
        while !stderr_text.is_char_boundary(tail_start) {
            tail_start += 1;
        }
        let _ = store.log_error(&format!(
            "{} stderr: {}",
            provider.name(),
            &stderr_text[tail_start..]
        ));
    }

    if let Some(signal) = emitted {
        return Ok(Some(signal));
    }
    if let Some(e) = stream_err {
        return Err(RalphError::Provider(format!("reading agent stream: {}", e)));
    }
    if timed_out {
        log::warn!(
            "{} timed out after {}s",
            provider.display_name(),
            config.timeout.as_secs()
        );
        return Ok(Some(timeout_signal));
    }
    if natural_failure {
        // Exited non-zero without a verdict: could not make progress.
        return Ok(Some(timeout_signal));
    }
    Ok(None)
}

/// Run a verification iteration. Never errors: any failure to spawn, read,
/// or conclude is a failed verification.
pub async fn run_verification(
    workspace: &Path,
    store: &StateStore,
    provider: &dyn ProviderAdapter,
    prompt: &str,
    config: &RunnerConfig,
    hooks: &dyn LoopHooks,
) -> Signal {
    match run_iteration(
        workspace,
        store,
        provider,
        prompt,
        VERIFICATION_STOPS,
        Signal::VerifyFail,
        config,
        hooks,
    )
    .await
    {
        Ok(Some(signal)) => signal,
        Ok(None) => Signal::VerifyFail,
        Err(e) => {
            log::warn!("verification run failed: {}", e);
            let _ = store.log_error(&format!("VERIFY ERROR: {}", e));
            Signal::VerifyFail
        }
    }
}

/// Terminate (when asked) and reap the child, force-killing after the grace
/// period. Returns the exit status when one could be collected.
async fn reap(child: &mut Child, terminate: bool) -> Option<std::process::ExitStatus> {
    if terminate {
        let _ = child.start_kill();
    }
    match tokio::time::timeout(REAP_GRACE, child.wait()).await {
        Ok(result) => result.ok(),
        Err(_) => {
            let _ = child.kill().await;
            child.wait().await.ok()
        }
    }
}

/// Read a stream to its end, retaining at most `cap` bytes.
async fn read_capped<R: AsyncReadExt + Unpin>(mut reader: R, cap: usize) -> String {
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if buf.len() < cap {
                    let take = n.min(cap - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                }
                // Keep draining past the cap so the child never blocks on a
                // full pipe.
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}
