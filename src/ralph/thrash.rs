//! Thrash detection — the supervisor's view of a stuck agent.
//!
//! Two heuristics, both keyed on the agent's literal output: a command that
//! fails with the same exact byte string three times, or a file path written
//! five or more times within a ten-minute sliding window. A competent agent
//! does not redo the same failing operation indefinitely or oscillate on the
//! same file; when either rule fires the supervisor emits GUTTER and the
//! driver rotates providers.
//!
//! Commands and paths are compared as the agent emitted them — no trimming,
//! no canonicalization. A thrashing agent repeats itself literally, and the
//! literal repetition is the evidence.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Same command failing this many times is a gutter.
const FAILURE_LIMIT: u32 = 3;
/// Same path written this many times inside the window is a gutter.
const WRITE_LIMIT: usize = 5;
/// Sliding window for write tracking, in seconds.
const WRITE_WINDOW_SECS: u64 = 600;

/// Per-iteration detector for stuck patterns.
#[derive(Debug, Default)]
pub struct ThrashDetector {
    failures: HashMap<String, u32>,
    writes: Vec<(u64, String)>,
}

impl ThrashDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a shell command result.
    ///
    /// Exit code zero changes nothing and returns false. A non-zero exit
    /// increments the failure count for the exact command string; returns
    /// true once that count reaches the limit.
    pub fn record_failure(&mut self, command: &str, exit_code: i32) -> bool {
        if exit_code == 0 {
            return false;
        }
        let count = self.failures.entry(command.to_string()).or_insert(0);
        *count += 1;
        *count >= FAILURE_LIMIT
    }

    /// Record a file write at the current wall-clock time.
    ///
    /// Returns true when the retained window holds `WRITE_LIMIT` or more
    /// writes to the same path.
    pub fn record_write(&mut self, path: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.record_write_at(now, path)
    }

    /// Record a file write at an explicit unix-second timestamp.
    ///
    /// Entries older than the window are pruned on every insertion, so the
    /// retained log never references anything more than ten minutes old.
    pub fn record_write_at(&mut self, now: u64, path: &str) -> bool {
        self.writes.push((now, path.to_string()));

        let cutoff = now.saturating_sub(WRITE_WINDOW_SECS);
        self.writes.retain(|(ts, _)| *ts >= cutoff);

        self.writes.iter().filter(|(_, p)| p == path).count() >= WRITE_LIMIT
    }

    /// Drop all recorded state.
    pub fn reset(&mut self) {
        self.failures.clear();
        self.writes.clear();
    }
}
