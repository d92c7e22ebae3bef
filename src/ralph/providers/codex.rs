//! Codex CLI adapter.
//!
//! `codex exec --json` emits a JSONL thread log: `thread.started`, then
//! `item.completed` records for agent messages and command executions, and a
//! closing `turn.completed`. Command executions carry an exit code and the
//! aggregated output, so they normalize to shell events; file-change items
//! report no sizes and become `Unknown`.

use std::path::Path;

use serde_json::Value;

use crate::ralph::event::AgentEvent;
use crate::ralph::providers::{parse_json_line, ProviderAdapter};

pub struct CodexAdapter;

impl ProviderAdapter for CodexAdapter {
    fn name(&self) -> &'static str {
        "codex"
    }

    fn display_name(&self) -> &'static str {
        "Codex CLI"
    }

    fn spawn_args(&self, _workspace: &Path) -> Vec<String> {
        // The workspace is set via the child's working directory.
        vec![
            "codex".to_string(),
            "exec".to_string(),
            "--json".to_string(),
        ]
    }

    fn normalize(&self, raw_line: &str) -> Option<AgentEvent> {
        let data = parse_json_line(raw_line)?;

        match data.get("type").and_then(Value::as_str) {
            Some("thread.started") => Some(AgentEvent::SystemInit {
                model: "codex".to_string(),
            }),
            Some("item.completed") => {
                let Some(item) = data.get("item") else {
                    return Some(AgentEvent::Unknown);
                };
                match item.get("type").and_then(Value::as_str) {
                    Some("agent_message") => {
                        let text = item
                            .get("text")
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        Some(AgentEvent::AssistantText {
                            text: text.to_string(),
                        })
                    }
                    Some("command_execution") => {
                        let command = item
                            .get("command")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown")
                            .to_string();
                        let exit_code = item
                            .get("exit_code")
                            .and_then(Value::as_i64)
                            .unwrap_or(0) as i32;
                        let stdout_bytes = item
                            .get("aggregated_output")
                            .and_then(Value::as_str)
                            .map(|s| s.len() as u64)
                            .unwrap_or(0);
                        Some(AgentEvent::ToolShell {
                            command,
                            exit_code,
                            stdout_bytes,
                            stderr_bytes: 0,
                        })
                    }
                    _ => Some(AgentEvent::Unknown),
                }
            }
            Some("turn.completed") => Some(AgentEvent::Result),
            _ => Some(AgentEvent::Unknown),
        }
    }
}
