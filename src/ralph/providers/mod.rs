//! Provider adapters.
//!
//! A provider is an external command-line agent (cursor-agent, claude,
//! gemini, codex) that accepts a prompt on stdin and emits a structured
//! event stream on stdout. Each adapter here is a thin translator from one
//! vendor's stream format to the normalized [`AgentEvent`] schema, plus the
//! argv needed to spawn the CLI against a workspace.
//!
//! Adapters are plain values behind the [`ProviderAdapter`] trait — there is
//! no inheritance hierarchy, just a registry function that lists them in a
//! stable order. [`ring::ProviderRing`] retains the ones whose CLI resolves
//! on PATH and rotates between them.

pub mod claude;
pub mod codex;
pub mod cursor;
pub mod gemini;
pub mod ring;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::ralph::event::AgentEvent;

/// Capability set every provider adapter exposes.
///
/// `normalize` must emit `Tool*` events only for completed tool calls, and
/// must return `None` for lines it cannot parse — the supervisor drops them.
pub trait ProviderAdapter: Send + Sync {
    /// CLI binary name, e.g. `"cursor-agent"`. Also the registry key.
    fn name(&self) -> &'static str;

    /// Human-readable name for logs and summaries.
    fn display_name(&self) -> &'static str;

    /// Whether the provider CLI is discoverable on PATH.
    fn available(&self) -> bool {
        which::which(self.name()).is_ok()
    }

    /// Full argv (program first) to spawn the provider against `workspace`.
    ///
    /// The prompt is always delivered on stdin, never in the argv.
    fn spawn_args(&self, workspace: &Path) -> Vec<String>;

    /// Translate one raw output line into a normalized event.
    fn normalize(&self, raw_line: &str) -> Option<AgentEvent>;
}

/// All adapters Ralph knows about, in stable registration order.
///
/// The order matters: it fixes the rotation sequence of the provider ring.
pub fn known_adapters() -> Vec<Arc<dyn ProviderAdapter>> {
    vec![
        Arc::new(cursor::CursorAdapter),
        Arc::new(claude::ClaudeAdapter),
        Arc::new(gemini::GeminiAdapter),
        Arc::new(codex::CodexAdapter),
    ]
}

/// The subset of [`known_adapters`] whose CLI resolves on PATH.
pub fn detect_available() -> Vec<Arc<dyn ProviderAdapter>> {
    known_adapters()
        .into_iter()
        .filter(|a| a.available())
        .collect()
}

/// Parse a raw line as JSON, returning `None` for blanks and non-JSON.
pub(crate) fn parse_json_line(raw_line: &str) -> Option<Value> {
    let line = raw_line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Map the stream fields shared by the cursor-agent-style layouts:
/// `system`/`init`, assistant messages with nested text content, and the
/// end-of-turn `result` record.
pub(crate) fn normalize_common(data: &Value) -> AgentEvent {
    match data.get("type").and_then(Value::as_str) {
        Some("system") => {
            if data.get("subtype").and_then(Value::as_str) == Some("init") {
                let model = data
                    .get("model")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                AgentEvent::SystemInit {
                    model: model.to_string(),
                }
            } else {
                AgentEvent::Unknown
            }
        }
        Some("assistant") => {
            let text: String = data
                .pointer("/message/content")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.get("text").and_then(Value::as_str))
                        .collect()
                })
                .unwrap_or_default();
            AgentEvent::AssistantText { text }
        }
        Some("result") => AgentEvent::Result,
        _ => AgentEvent::Unknown,
    }
}
