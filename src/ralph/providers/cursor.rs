//! cursor-agent adapter.
//!
//! cursor-agent's `--output-format stream-json` is the richest of the
//! supported streams: besides assistant text it reports completed tool calls
//! with sizes and exit codes, which feed the budget estimator and thrash
//! detector directly. Its layout is also the reference the other adapters
//! normalize towards.

use std::path::Path;

use serde_json::Value;

use crate::ralph::event::AgentEvent;
use crate::ralph::providers::{normalize_common, parse_json_line, ProviderAdapter};

pub struct CursorAdapter;

impl ProviderAdapter for CursorAdapter {
    fn name(&self) -> &'static str {
        "cursor-agent"
    }

    fn display_name(&self) -> &'static str {
        "Cursor Agent"
    }

    fn spawn_args(&self, workspace: &Path) -> Vec<String> {
        vec![
            "cursor-agent".to_string(),
            "-p".to_string(),
            "--force".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--directory".to_string(),
            workspace.display().to_string(),
        ]
    }

    fn normalize(&self, raw_line: &str) -> Option<AgentEvent> {
        let data = parse_json_line(raw_line)?;

        if data.get("type").and_then(Value::as_str) == Some("tool_call") {
            // Only completed calls are side-effect records; starts carry no
            // sizes or exit codes yet.
            if data.get("subtype").and_then(Value::as_str) != Some("completed") {
                return Some(AgentEvent::Unknown);
            }
            let Some(tool_call) = data.get("tool_call") else {
                return Some(AgentEvent::Unknown);
            };
            return Some(normalize_tool_call(tool_call));
        }

        Some(normalize_common(&data))
    }
}

/// Map a completed `tool_call` payload to a `Tool*` event.
fn normalize_tool_call(tool_call: &Value) -> AgentEvent {
    if let Some(read) = tool_call.get("readToolCall") {
        if let Some(success) = read.pointer("/result/success") {
            let path = json_path(read);
            let content_size = success
                .get("contentSize")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let lines = success
                .get("totalLines")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            // When the provider omits the byte size, estimate ~100 bytes
            // per reported line.
            let bytes = if content_size > 0 {
                content_size
            } else {
                lines * 100
            };
            return AgentEvent::ToolRead { path, bytes };
        }
        return AgentEvent::Unknown;
    }

    if let Some(write) = tool_call.get("writeToolCall") {
        if let Some(success) = write.pointer("/result/success") {
            let path = json_path(write);
            let bytes = success
                .get("fileSize")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            return AgentEvent::ToolWrite { path, bytes };
        }
        return AgentEvent::Unknown;
    }

    if let Some(shell) = tool_call.get("shellToolCall") {
        let command = shell
            .pointer("/args/command")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let exit_code = shell
            .pointer("/result/exitCode")
            .and_then(Value::as_i64)
            .unwrap_or(0) as i32;
        let stdout_bytes = shell
            .pointer("/result/stdout")
            .and_then(Value::as_str)
            .map(|s| s.len() as u64)
            .unwrap_or(0);
        let stderr_bytes = shell
            .pointer("/result/stderr")
            .and_then(Value::as_str)
            .map(|s| s.len() as u64)
            .unwrap_or(0);
        return AgentEvent::ToolShell {
            command,
            exit_code,
            stdout_bytes,
            stderr_bytes,
        };
    }

    AgentEvent::Unknown
}

fn json_path(call: &Value) -> String {
    call.pointer("/args/path")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}
