//! Normalized agent-event schema.
//!
//! Every provider CLI emits its own structured stream; the adapter for each
//! provider translates raw lines into this schema so the supervisor, budget
//! estimator, and thrash detector see one vocabulary. The schema is
//! extensible by adding variants; lines an adapter can parse but has no
//! mapping for become [`AgentEvent::Unknown`], and lines it cannot parse at
//! all normalize to `None` and are dropped by the supervisor.
//!
//! Adapters must emit `Tool*` events only when the underlying tool call has
//! *completed* — the supervisor treats them as records of side effects that
//! have already happened, not as intentions.

/// One normalized event from a running agent's output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// The agent session started; `model` is whatever identifier the
    /// provider reports.
    SystemInit { model: String },

    /// A chunk of assistant-authored text. Signals are decoded from these.
    AssistantText { text: String },

    /// A completed file read.
    ToolRead { path: String, bytes: u64 },

    /// A completed file write.
    ToolWrite { path: String, bytes: u64 },

    /// A completed shell command.
    ToolShell {
        command: String,
        exit_code: i32,
        stdout_bytes: u64,
        stderr_bytes: u64,
    },

    /// The provider's end-of-turn result record.
    Result,

    /// A line the adapter parsed but has no mapping for. Ignored.
    Unknown,
}

impl AgentEvent {
    /// Schema name of this event kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::SystemInit { .. } => "system.init",
            AgentEvent::AssistantText { .. } => "assistant.text",
            AgentEvent::ToolRead { .. } => "tool.read",
            AgentEvent::ToolWrite { .. } => "tool.write",
            AgentEvent::ToolShell { .. } => "tool.shell",
            AgentEvent::Result => "result",
            AgentEvent::Unknown => "unknown",
        }
    }
}
