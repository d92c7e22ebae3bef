//! Signal alphabet and decoder.
//!
//! Agents communicate with the supervisor by embedding sentinel tags of the
//! form `<ralph>NAME</ralph>` anywhere in their output text. The alphabet is
//! closed: six tags originate in agent text, and [`Signal::Warn`] is internal
//! to the supervisor (it is never decoded from text).
//!
//! Decoding is deterministic and stateless: for any chunk of text the result
//! depends only on the chunk. When several tags appear in one chunk, the
//! winner is the first signal in the fixed scanning order, not the first tag
//! by position — an agent cannot mask a COMPLETE by appending a GUTTER later
//! in the same message.
//!
//! # Example
//!
//! ```rust
//! use ralph::signal::{decode, Signal};
//!
//! assert_eq!(decode("all done <ralph>COMPLETE</ralph>"), Some(Signal::Complete));
//! assert_eq!(decode("no tags here"), None);
//! // COMPLETE wins even though GUTTER appears first in the text.
//! let both = "<ralph>GUTTER</ralph> ... <ralph>COMPLETE</ralph>";
//! assert_eq!(decode(both), Some(Signal::Complete));
//! ```

/// A member of the closed signal alphabet driving the loop state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The agent believes every criterion is satisfied.
    Complete,
    /// End this iteration and start a fresh context with the same provider.
    Rotate,
    /// The agent is stuck; rotate to a different provider.
    Gutter,
    /// The agent wrote a question to the question file and wants an answer.
    Question,
    /// The verification agent approves completion.
    VerifyPass,
    /// The verification agent rejects completion.
    VerifyFail,
    /// The budget estimate crossed the warn threshold. Internal only.
    Warn,
}

/// Scanning order for [`decode`]. Earlier entries win ties within a chunk.
const DECODE_ORDER: [Signal; 6] = [
    Signal::Complete,
    Signal::Rotate,
    Signal::Gutter,
    Signal::Question,
    Signal::VerifyPass,
    Signal::VerifyFail,
];

/// Stop set for a normal iteration: any of these terminates the agent run.
pub const ITERATION_STOPS: &[Signal] = &[
    Signal::Complete,
    Signal::Rotate,
    Signal::Gutter,
    Signal::Question,
    Signal::VerifyPass,
    Signal::VerifyFail,
];

/// Stop set for a verification run.
pub const VERIFICATION_STOPS: &[Signal] = &[
    Signal::VerifyPass,
    Signal::VerifyFail,
    Signal::Rotate,
    Signal::Gutter,
];

impl Signal {
    /// The bare signal name, e.g. `"COMPLETE"`.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Complete => "COMPLETE",
            Signal::Rotate => "ROTATE",
            Signal::Gutter => "GUTTER",
            Signal::Question => "QUESTION",
            Signal::VerifyPass => "VERIFY_PASS",
            Signal::VerifyFail => "VERIFY_FAIL",
            Signal::Warn => "WARN",
        }
    }

    /// The exact tag an agent embeds to emit this signal.
    ///
    /// Matching is byte-exact and case-sensitive.
    pub fn tag(&self) -> &'static str {
        match self {
            Signal::Complete => "<ralph>COMPLETE</ralph>",
            Signal::Rotate => "<ralph>ROTATE</ralph>",
            Signal::Gutter => "<ralph>GUTTER</ralph>",
            Signal::Question => "<ralph>QUESTION</ralph>",
            Signal::VerifyPass => "<ralph>VERIFY_PASS</ralph>",
            Signal::VerifyFail => "<ralph>VERIFY_FAIL</ralph>",
            Signal::Warn => "<ralph>WARN</ralph>",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Return the first signal (in scanning order) whose tag occurs in `text`.
pub fn decode(text: &str) -> Option<Signal> {
    DECODE_ORDER.iter().copied().find(|s| text.contains(s.tag()))
}
