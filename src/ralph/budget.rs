//! Context-budget estimation.
//!
//! The estimator accumulates byte counts from the four activity streams an
//! agent produces (file reads, file writes, assistant text, shell output)
//! plus a fixed estimate for the initial prompt, and converts the sum to an
//! approximate token count at one token per four bytes. The approximation is
//! deliberately coarse: the actions taken at each threshold — log a warning,
//! terminate the iteration — are discrete and monotone in the estimate, so
//! tokenizer-grade precision buys nothing.
//!
//! `should_warn` latches (fires exactly once per estimator) to keep the logs
//! quiet; `should_rotate` does not latch, so the supervisor may check it at
//! any point. A fresh estimator is created for every iteration.
//!
//! # Example
//!
//! ```rust
//! use ralph::budget::BudgetEstimator;
//!
//! let mut budget = BudgetEstimator::new(72_000, 80_000);
//! budget.add_read(100_000);
//! assert!(budget.current() > 25_000);
//! assert!(!budget.should_rotate());
//! budget.add_shell(250_000);
//! assert!(budget.should_rotate());
//! ```

/// Default token count at which a context-size warning is logged.
pub const DEFAULT_WARN_THRESHOLD: u64 = 72_000;
/// Default token count at which the iteration is rotated.
pub const DEFAULT_ROTATE_THRESHOLD: u64 = 80_000;

/// Fixed byte estimate for the iteration prompt itself.
const PROMPT_ESTIMATE_BYTES: u64 = 3_000;

/// Health band of the current estimate, measured against the rotate
/// threshold: below 60% is nominal, 60–80% is the warning band, above 80%
/// rotation is imminent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Nominal,
    Warn,
    Urgent,
}

impl Health {
    /// Short marker used to prefix activity-log lines.
    pub fn marker(&self) -> &'static str {
        match self {
            Health::Nominal => "ok",
            Health::Warn => "warn",
            Health::Urgent => "hot",
        }
    }
}

/// Tracks approximate context consumption for one iteration.
#[derive(Debug)]
pub struct BudgetEstimator {
    bytes_read: u64,
    bytes_written: u64,
    assistant_chars: u64,
    shell_output_chars: u64,
    warn_threshold: u64,
    rotate_threshold: u64,
    warn_sent: bool,
}

impl BudgetEstimator {
    /// Create an estimator with the given thresholds.
    ///
    /// Callers must ensure `warn_threshold <= rotate_threshold` and both are
    /// positive; the CLI validates this before the driver starts.
    pub fn new(warn_threshold: u64, rotate_threshold: u64) -> Self {
        Self {
            bytes_read: 0,
            bytes_written: 0,
            assistant_chars: 0,
            shell_output_chars: 0,
            warn_threshold,
            rotate_threshold,
            warn_sent: false,
        }
    }

    /// Add bytes from a completed file read.
    pub fn add_read(&mut self, bytes: u64) {
        self.bytes_read += bytes;
    }

    /// Add bytes from a completed file write.
    pub fn add_write(&mut self, bytes: u64) {
        self.bytes_written += bytes;
    }

    /// Add characters of assistant-emitted text.
    pub fn add_assistant(&mut self, chars: u64) {
        self.assistant_chars += chars;
    }

    /// Add characters of captured shell output (stdout + stderr).
    pub fn add_shell(&mut self, chars: u64) {
        self.shell_output_chars += chars;
    }

    /// Approximate token count: total tracked bytes divided by four.
    pub fn current(&self) -> u64 {
        let total = PROMPT_ESTIMATE_BYTES
            + self.bytes_read
            + self.bytes_written
            + self.assistant_chars
            + self.shell_output_chars;
        total / 4
    }

    /// The rotate threshold this estimator was configured with.
    pub fn rotate_threshold(&self) -> u64 {
        self.rotate_threshold
    }

    /// True exactly once, when the estimate first reaches the warn threshold.
    pub fn should_warn(&mut self) -> bool {
        if self.current() >= self.warn_threshold && !self.warn_sent {
            self.warn_sent = true;
            return true;
        }
        false
    }

    /// True whenever the estimate is at or above the rotate threshold.
    pub fn should_rotate(&self) -> bool {
        self.current() >= self.rotate_threshold
    }

    /// Current health band relative to the rotate threshold.
    pub fn health(&self) -> Health {
        let pct = self.current() * 100 / self.rotate_threshold;
        if pct < 60 {
            Health::Nominal
        } else if pct < 80 {
            Health::Warn
        } else {
            Health::Urgent
        }
    }

    /// Per-counter breakdown for the periodic activity-log snapshot.
    pub fn breakdown(&self) -> String {
        format!(
            "[read:{}KB write:{}KB assist:{}KB shell:{}KB]",
            self.bytes_read / 1024,
            self.bytes_written / 1024,
            self.assistant_chars / 1024,
            self.shell_output_chars / 1024,
        )
    }
}
