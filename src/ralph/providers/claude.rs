//! Claude CLI adapter.
//!
//! `claude -p --output-format stream-json` shares the assistant/system/result
//! layout with cursor-agent, so those map through the common normalizer.
//! Claude reports tool use inside assistant content blocks rather than as
//! discrete completed tool-call records, so no `Tool*` events are produced;
//! the budget still tracks assistant text, which dominates Claude's stream.

use std::path::Path;

use crate::ralph::event::AgentEvent;
use crate::ralph::providers::{normalize_common, parse_json_line, ProviderAdapter};

pub struct ClaudeAdapter;

impl ProviderAdapter for ClaudeAdapter {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Claude Code"
    }

    fn spawn_args(&self, _workspace: &Path) -> Vec<String> {
        // The workspace is set via the child's working directory.
        // --verbose is required for stream-json output.
        vec![
            "claude".to_string(),
            "-p".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ]
    }

    fn normalize(&self, raw_line: &str) -> Option<AgentEvent> {
        let data = parse_json_line(raw_line)?;
        Some(normalize_common(&data))
    }
}
