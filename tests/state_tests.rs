//! Tests for the state store: idempotent init, append formats, the
//! archive-and-reset cycle, and progress-log compression.

use ralph::state::{
    StateStore, ACTIVITY_HEADER, ERRORS_HEADER, GUARDRAILS_HEADER, PROGRESS_HEADER,
};
use tempfile::TempDir;

fn store() -> (TempDir, StateStore) {
    let dir = TempDir::new().unwrap();
    let store = StateStore::new(dir.path());
    store.init().unwrap();
    (dir, store)
}

fn read(path: &std::path::Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

// ─── init ─────────────────────────────────────────────────────────────────────

#[test]
fn test_init_seeds_canonical_headers() {
    let (_dir, store) = store();
    assert_eq!(read(&store.progress_path()), PROGRESS_HEADER);
    assert_eq!(read(&store.activity_path()), ACTIVITY_HEADER);
    assert_eq!(read(&store.errors_path()), ERRORS_HEADER);
    assert_eq!(read(&store.guardrails_path()), GUARDRAILS_HEADER);
}

#[test]
fn test_init_is_idempotent() {
    let (_dir, store) = store();
    store.log_progress("did a thing").unwrap();
    store.log_activity("READ foo").unwrap();
    let progress_before = read(&store.progress_path());
    let activity_before = read(&store.activity_path());

    store.init().unwrap();

    assert_eq!(read(&store.progress_path()), progress_before);
    assert_eq!(read(&store.activity_path()), activity_before);
}

// ─── appends ──────────────────────────────────────────────────────────────────

#[test]
fn test_progress_entries_are_dated_headings() {
    let (_dir, store) = store();
    store.log_progress("**Session 1 started**").unwrap();
    let content = read(&store.progress_path());
    assert!(content.starts_with(PROGRESS_HEADER));
    assert!(content.contains("\n### "));
    assert!(content.contains("**Session 1 started**"));
}

#[test]
fn test_activity_and_error_lines_are_timestamped() {
    let (_dir, store) = store();
    store.log_activity("SHELL ls -> exit 0").unwrap();
    store.log_error("SHELL FAIL: make -> exit 2").unwrap();

    let activity = read(&store.activity_path());
    let last = activity.lines().last().unwrap();
    assert!(last.starts_with('['), "timestamped line, got: {}", last);
    assert!(last.contains("SHELL ls -> exit 0"));

    let errors = read(&store.errors_path());
    assert!(errors.lines().last().unwrap().contains("SHELL FAIL"));
}

// ─── question / answer ────────────────────────────────────────────────────────

#[test]
fn test_question_answer_exchange() {
    let (_dir, store) = store();
    assert!(store.read_question().unwrap().is_none());

    std::fs::write(store.question_path(), "Which DB?").unwrap();
    assert_eq!(store.read_question().unwrap().as_deref(), Some("Which DB?"));

    store.write_answer("postgres").unwrap();
    assert_eq!(read(&store.answer_path()), "postgres");

    store.clear_question().unwrap();
    assert!(!store.question_path().exists());
    // Clearing twice is fine.
    store.clear_question().unwrap();
}

#[test]
fn test_empty_answer_still_creates_the_file() {
    let (_dir, store) = store();
    store.write_answer("").unwrap();
    assert!(store.answer_path().exists());
    assert_eq!(read(&store.answer_path()), "");
}

// ─── archive ──────────────────────────────────────────────────────────────────

#[test]
fn test_archive_moves_task_and_resets_logs() {
    let (dir, store) = store();
    std::fs::write(dir.path().join("RALPH_TASK.md"), "- [x] done\n").unwrap();
    store.log_progress("work happened").unwrap();
    store.log_activity("WRITE src/main.rs").unwrap();
    store.log_error("SHELL FAIL: make").unwrap();
    store.log_progress("guardrail note").unwrap();
    std::fs::write(store.guardrails_path(), "custom guardrails\n").unwrap();

    let archived = store.archive_completed("20260801_120000").unwrap().unwrap();
    assert_eq!(
        archived,
        store.completed_dir().join("RALPH_TASK_20260801_120000.md")
    );

    // Task file moved, not copied.
    assert!(!dir.path().join("RALPH_TASK.md").exists());
    assert_eq!(read(&archived), "- [x] done\n");

    // Logs copied under the shared timestamp…
    let completed = store.completed_dir();
    let progress_copy = read(&completed.join("progress_20260801_120000.md"));
    assert!(progress_copy.contains("work happened"));
    assert!(read(&completed.join("activity_20260801_120000.log")).contains("WRITE src/main.rs"));
    assert!(read(&completed.join("errors_20260801_120000.log")).contains("SHELL FAIL"));

    // …and reset to canonical headers.
    assert_eq!(read(&store.progress_path()), PROGRESS_HEADER);
    assert_eq!(read(&store.activity_path()), ACTIVITY_HEADER);
    assert_eq!(read(&store.errors_path()), ERRORS_HEADER);

    // Guardrails untouched.
    assert_eq!(read(&store.guardrails_path()), "custom guardrails\n");
}

#[test]
fn test_archive_without_task_file_is_a_noop() {
    let (_dir, store) = store();
    assert!(store.archive_completed("20260801_120000").unwrap().is_none());
}

#[test]
fn test_second_completion_cycle_leaves_same_headers() {
    let (dir, store) = store();

    std::fs::write(dir.path().join("RALPH_TASK.md"), "- [x] a\n").unwrap();
    store.log_progress("first cycle").unwrap();
    store.archive_completed("20260801_100000").unwrap();

    // A second, immediate completion cycle.
    std::fs::write(dir.path().join("RALPH_TASK.md"), "- [x] b\n").unwrap();
    store.archive_completed("20260801_100001").unwrap();

    assert_eq!(read(&store.progress_path()), PROGRESS_HEADER);
    assert_eq!(read(&store.activity_path()), ACTIVITY_HEADER);
    assert_eq!(read(&store.errors_path()), ERRORS_HEADER);
}

// ─── compression ──────────────────────────────────────────────────────────────

#[test]
fn test_small_progress_log_is_not_compressed() {
    let (_dir, store) = store();
    store.log_progress("one entry").unwrap();
    assert!(!store.compress_progress().unwrap());
}

#[test]
fn test_long_progress_log_keeps_header_and_tail() {
    let (_dir, store) = store();
    for i in 0..2_500 {
        store.log_progress(&format!("entry {}", i)).unwrap();
    }
    assert!(store.compress_progress().unwrap());

    let content = read(&store.progress_path());
    assert!(content.starts_with("# Progress Log"));
    assert!(content.contains("## Session History"));
    assert!(content.contains("compressed"));
    // The most recent entries survive, the oldest are gone.
    assert!(content.contains("entry 2499"));
    assert!(!content.contains("entry 0\n"));

    let line_count = content.lines().count();
    assert!(
        line_count < 600,
        "expected header + 500-line tail, got {} lines",
        line_count
    );
}

#[test]
fn test_token_footprint_alone_triggers_compression() {
    let (_dir, store) = store();
    // Well under the 2000-line limit, but far over 20k estimated tokens.
    let wide = "x".repeat(1_000);
    for _ in 0..300 {
        store.log_progress(&wide).unwrap();
    }
    assert!(store.compress_progress().unwrap());
    let content = read(&store.progress_path());
    assert!(content.contains("compressed"));
}
