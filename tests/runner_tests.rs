//! Tests for the iteration runner against scripted providers: signal
//! arbitration, timeout enforcement, exit-status handling, and the
//! verification-mode failure mapping.

mod common;

use std::time::{Duration, Instant};

use common::{say, ScriptedAdapter};
use ralph::runner::{run_iteration, run_verification, RunnerConfig};
use ralph::signal::{Signal, ITERATION_STOPS};
use ralph::state::StateStore;
use ralph::supervisor::NoHooks;
use tempfile::TempDir;

fn config(timeout: Duration) -> RunnerConfig {
    RunnerConfig {
        warn_threshold: 72_000,
        rotate_threshold: 80_000,
        timeout,
    }
}

fn workspace() -> (TempDir, StateStore) {
    let dir = TempDir::new().unwrap();
    let store = StateStore::new(dir.path());
    store.init().unwrap();
    (dir, store)
}

#[tokio::test]
async fn test_stop_signal_is_returned() {
    let (dir, store) = workspace();
    let provider = ScriptedAdapter::new("scripted", &say("done <ralph>COMPLETE</ralph>"));

    let signal = run_iteration(
        dir.path(),
        &store,
        &provider,
        "prompt",
        ITERATION_STOPS,
        Signal::Rotate,
        &config(Duration::from_secs(30)),
        &NoHooks,
    )
    .await
    .unwrap();
    assert_eq!(signal, Some(Signal::Complete));
}

#[tokio::test]
async fn test_first_stop_signal_wins_and_terminates() {
    let (dir, store) = workspace();
    let script = format!(
        "{}\n{}",
        say("first <ralph>COMPLETE</ralph>"),
        say("late <ralph>GUTTER</ralph>")
    );
    let provider = ScriptedAdapter::new("scripted", &script);

    let signal = run_iteration(
        dir.path(),
        &store,
        &provider,
        "prompt",
        ITERATION_STOPS,
        Signal::Rotate,
        &config(Duration::from_secs(30)),
        &NoHooks,
    )
    .await
    .unwrap();
    assert_eq!(signal, Some(Signal::Complete));
}

#[tokio::test]
async fn test_natural_clean_exit_returns_no_signal() {
    let (dir, store) = workspace();
    let script = format!(
        "{}\nprintf '%s\\n' '{{\"type\":\"result\",\"subtype\":\"success\"}}'",
        say("no verdict here")
    );
    let provider = ScriptedAdapter::new("scripted", &script);

    let signal = run_iteration(
        dir.path(),
        &store,
        &provider,
        "prompt",
        ITERATION_STOPS,
        Signal::Rotate,
        &config(Duration::from_secs(30)),
        &NoHooks,
    )
    .await
    .unwrap();
    assert_eq!(signal, None);
}

#[tokio::test]
async fn test_timeout_returns_timeout_signal() {
    let (dir, store) = workspace();
    let provider = ScriptedAdapter::new("scripted", "sleep 30");

    let started = Instant::now();
    let signal = run_iteration(
        dir.path(),
        &store,
        &provider,
        "prompt",
        ITERATION_STOPS,
        Signal::Rotate,
        &config(Duration::from_secs(1)),
        &NoHooks,
    )
    .await
    .unwrap();
    assert_eq!(signal, Some(Signal::Rotate));
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "child must be terminated promptly, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_nonzero_exit_without_signal_is_no_progress() {
    let (dir, store) = workspace();
    let provider = ScriptedAdapter::new("scripted", "echo oops >&2; exit 3");

    let signal = run_iteration(
        dir.path(),
        &store,
        &provider,
        "prompt",
        ITERATION_STOPS,
        Signal::Rotate,
        &config(Duration::from_secs(30)),
        &NoHooks,
    )
    .await
    .unwrap();
    assert_eq!(signal, Some(Signal::Rotate));

    // stderr was captured for the post-mortem log.
    let errors = std::fs::read_to_string(store.errors_path()).unwrap();
    assert!(errors.contains("oops"), "errors.log: {}", errors);
}

#[tokio::test]
async fn test_budget_rotation_mid_stream() {
    let (dir, store) = workspace();
    // One enormous completed read blows straight past 80k tokens.
    let read = r#"printf '%s\n' '{"type":"tool_call","subtype":"completed","tool_call":{"readToolCall":{"args":{"path":"big.bin"},"result":{"success":{"totalLines":1,"contentSize":400000}}}}}'"#;
    let script = format!("{}\nsleep 30", read);
    let provider = ScriptedAdapter::new("scripted", &script);

    let signal = run_iteration(
        dir.path(),
        &store,
        &provider,
        "prompt",
        ITERATION_STOPS,
        Signal::Rotate,
        &config(Duration::from_secs(30)),
        &NoHooks,
    )
    .await
    .unwrap();
    assert_eq!(signal, Some(Signal::Rotate));
}

#[tokio::test]
async fn test_repeated_shell_failures_gutter_mid_stream() {
    let (dir, store) = workspace();
    let fail = r#"printf '%s\n' '{"type":"tool_call","subtype":"completed","tool_call":{"shellToolCall":{"args":{"command":"npm test"},"result":{"exitCode":1,"stdout":"","stderr":"fail"}}}}'"#;
    let script = format!("{f}\n{f}\n{f}\nsleep 30", f = fail);
    let provider = ScriptedAdapter::new("scripted", &script);

    let signal = run_iteration(
        dir.path(),
        &store,
        &provider,
        "prompt",
        ITERATION_STOPS,
        Signal::Rotate,
        &config(Duration::from_secs(30)),
        &NoHooks,
    )
    .await
    .unwrap();
    assert_eq!(signal, Some(Signal::Gutter));
}

#[tokio::test]
async fn test_warn_is_not_a_stop_signal() {
    let (dir, store) = workspace();
    // A read big enough to warn but not rotate: 72k tokens = 288kB.
    let read = r#"printf '%s\n' '{"type":"tool_call","subtype":"completed","tool_call":{"readToolCall":{"args":{"path":"mid.bin"},"result":{"success":{"totalLines":1,"contentSize":290000}}}}}'"#;
    let script = format!("{}\n{}", read, say("kept going <ralph>COMPLETE</ralph>"));
    let provider = ScriptedAdapter::new("scripted", &script);

    let signal = run_iteration(
        dir.path(),
        &store,
        &provider,
        "prompt",
        ITERATION_STOPS,
        Signal::Rotate,
        &config(Duration::from_secs(30)),
        &NoHooks,
    )
    .await
    .unwrap();
    // The warning was internal; the run continued to the agent's verdict.
    assert_eq!(signal, Some(Signal::Complete));

    let activity = std::fs::read_to_string(store.activity_path()).unwrap();
    assert!(activity.contains("WARN"), "activity: {}", activity);
}

/// An adapter whose argv[0] does not exist on any PATH.
struct MissingBinary;

impl ralph::providers::ProviderAdapter for MissingBinary {
    fn name(&self) -> &'static str {
        "ralph-test-no-such-binary"
    }
    fn display_name(&self) -> &'static str {
        "Missing"
    }
    fn available(&self) -> bool {
        true
    }
    fn spawn_args(&self, _workspace: &std::path::Path) -> Vec<String> {
        vec!["ralph-test-no-such-binary-xyz".to_string()]
    }
    fn normalize(&self, _raw_line: &str) -> Option<ralph::event::AgentEvent> {
        None
    }
}

#[tokio::test]
async fn test_spawn_failure_propagates_in_normal_mode() {
    let (dir, store) = workspace();

    let result = run_iteration(
        dir.path(),
        &store,
        &MissingBinary,
        "prompt",
        ITERATION_STOPS,
        Signal::Rotate,
        &config(Duration::from_secs(5)),
        &NoHooks,
    )
    .await;
    assert!(result.is_err(), "spawn failure must propagate");
}

#[tokio::test]
async fn test_verification_mode_maps_everything_to_verify_fail() {
    let (dir, store) = workspace();

    // Spawn failure -> VERIFY_FAIL, not an error.
    let verdict = run_verification(
        dir.path(),
        &store,
        &MissingBinary,
        "prompt",
        &config(Duration::from_secs(5)),
        &NoHooks,
    )
    .await;
    assert_eq!(verdict, Signal::VerifyFail);

    // A run that closes without a verdict -> VERIFY_FAIL.
    let silent = ScriptedAdapter::new("silent", &say("looked around, no verdict"));
    let verdict = run_verification(
        dir.path(),
        &store,
        &silent,
        "prompt",
        &config(Duration::from_secs(30)),
        &NoHooks,
    )
    .await;
    assert_eq!(verdict, Signal::VerifyFail);

    // An explicit pass comes through.
    let passer = ScriptedAdapter::new("passer", &say("lgtm <ralph>VERIFY_PASS</ralph>"));
    let verdict = run_verification(
        dir.path(),
        &store,
        &passer,
        "prompt",
        &config(Duration::from_secs(30)),
        &NoHooks,
    )
    .await;
    assert_eq!(verdict, Signal::VerifyPass);
}

#[tokio::test]
async fn test_prompt_is_delivered_on_stdin() {
    let (dir, store) = workspace();
    // The script echoes a signal only if the prompt mentions iteration 7.
    let script = r#"PROMPT=$(cat)
case "$PROMPT" in
  *"Iteration 7"*) printf '%s\n' '{"type":"assistant","message":{"content":[{"text":"<ralph>COMPLETE</ralph>"}]}}' ;;
  *) printf '%s\n' '{"type":"assistant","message":{"content":[{"text":"wrong prompt"}]}}' ;;
esac"#;
    let provider = ScriptedAdapter::new("scripted", script);

    let signal = run_iteration(
        dir.path(),
        &store,
        &provider,
        &ralph::prompt::iteration_prompt(7),
        ITERATION_STOPS,
        Signal::Rotate,
        &config(Duration::from_secs(30)),
        &NoHooks,
    )
    .await
    .unwrap();
    assert_eq!(signal, Some(Signal::Complete));
}
