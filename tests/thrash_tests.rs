//! Tests for the thrash detector: repeated-failure counting and the
//! sliding-window write rule.

use ralph::thrash::ThrashDetector;

// ─── command failures ─────────────────────────────────────────────────────────

#[test]
fn test_same_command_failing_three_times_is_a_gutter() {
    let mut detector = ThrashDetector::new();
    assert!(!detector.record_failure("npm test", 1));
    assert!(!detector.record_failure("npm test", 1));
    assert!(detector.record_failure("npm test", 1));
}

#[test]
fn test_exit_zero_never_counts() {
    let mut detector = ThrashDetector::new();
    for _ in 0..10 {
        assert!(!detector.record_failure("npm test", 0));
    }
    // The counter never moved, so two real failures still aren't enough.
    assert!(!detector.record_failure("npm test", 1));
    assert!(!detector.record_failure("npm test", 1));
}

#[test]
fn test_distinct_commands_tracked_separately() {
    let mut detector = ThrashDetector::new();
    assert!(!detector.record_failure("make build", 2));
    assert!(!detector.record_failure("make test", 2));
    assert!(!detector.record_failure("make build", 2));
    assert!(!detector.record_failure("make test", 2));
    assert!(detector.record_failure("make build", 2));
}

#[test]
fn test_commands_compared_as_exact_byte_strings() {
    // Trailing whitespace is significant: the agent's literal command is
    // what matters.
    let mut detector = ThrashDetector::new();
    assert!(!detector.record_failure("npm test", 1));
    assert!(!detector.record_failure("npm test ", 1));
    assert!(!detector.record_failure("npm test", 1));
    assert!(detector.record_failure("npm test", 1));
}

#[test]
fn test_any_nonzero_exit_code_counts() {
    let mut detector = ThrashDetector::new();
    assert!(!detector.record_failure("cargo check", 101));
    assert!(!detector.record_failure("cargo check", -1));
    assert!(detector.record_failure("cargo check", 127));
}

// ─── write window ─────────────────────────────────────────────────────────────

#[test]
fn test_five_writes_to_same_path_is_a_gutter() {
    let mut detector = ThrashDetector::new();
    let t = 1_000_000;
    for i in 0..4 {
        assert!(!detector.record_write_at(t + i, "src/main.rs"));
    }
    assert!(detector.record_write_at(t + 4, "src/main.rs"));
}

#[test]
fn test_writes_to_different_paths_do_not_accumulate() {
    let mut detector = ThrashDetector::new();
    let t = 1_000_000;
    for i in 0..10 {
        let path = format!("src/file_{}.rs", i);
        assert!(!detector.record_write_at(t + i, &path));
    }
}

#[test]
fn test_writes_older_than_window_are_pruned() {
    let mut detector = ThrashDetector::new();
    let t = 1_000_000;
    for i in 0..4 {
        assert!(!detector.record_write_at(t + i, "src/main.rs"));
    }
    // Eleven minutes later: the four old writes are outside the window, so
    // this is effectively the first retained write.
    assert!(!detector.record_write_at(t + 660, "src/main.rs"));
}

#[test]
fn test_write_exactly_at_window_edge_is_retained() {
    let mut detector = ThrashDetector::new();
    let t = 1_000_000;
    for _ in 0..4 {
        assert!(!detector.record_write_at(t, "a.txt"));
    }
    // 600 seconds later the earlier writes sit exactly on the cutoff
    // (timestamp >= now - 600) and still count.
    assert!(detector.record_write_at(t + 600, "a.txt"));
}

#[test]
fn test_paths_compared_without_canonicalization() {
    let mut detector = ThrashDetector::new();
    let t = 1_000_000;
    assert!(!detector.record_write_at(t, "./src/main.rs"));
    assert!(!detector.record_write_at(t + 1, "src/main.rs"));
    assert!(!detector.record_write_at(t + 2, "./src/main.rs"));
    assert!(!detector.record_write_at(t + 3, "src/main.rs"));
    // Neither literal spelling has reached five on its own.
    assert!(!detector.record_write_at(t + 4, "src/main.rs"));
}

#[test]
fn test_reset_clears_both_rules() {
    let mut detector = ThrashDetector::new();
    let t = 1_000_000;
    detector.record_failure("make", 1);
    detector.record_failure("make", 1);
    for i in 0..4 {
        detector.record_write_at(t + i, "x.rs");
    }
    detector.reset();
    assert!(!detector.record_failure("make", 1));
    assert!(!detector.record_write_at(t + 10, "x.rs"));
}
