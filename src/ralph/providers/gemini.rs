//! Gemini CLI adapter.
//!
//! Gemini's stream uses a flat layout: `init`, `message` records with a
//! `role` and plain string `content`, `tool_use`/`tool_result` records
//! without per-call sizes, and a final `result`. Assistant messages and
//! session boundaries normalize; tool records carry too little to account
//! for and become `Unknown`.

use std::path::Path;

use serde_json::Value;

use crate::ralph::event::AgentEvent;
use crate::ralph::providers::{parse_json_line, ProviderAdapter};

pub struct GeminiAdapter;

impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        "Gemini CLI"
    }

    fn spawn_args(&self, _workspace: &Path) -> Vec<String> {
        vec![
            "gemini".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
        ]
    }

    fn normalize(&self, raw_line: &str) -> Option<AgentEvent> {
        let data = parse_json_line(raw_line)?;

        match data.get("type").and_then(Value::as_str) {
            Some("init") => {
                let model = data
                    .get("model")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                Some(AgentEvent::SystemInit {
                    model: model.to_string(),
                })
            }
            Some("message") => {
                if data.get("role").and_then(Value::as_str) == Some("assistant") {
                    let text = data
                        .get("content")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    Some(AgentEvent::AssistantText {
                        text: text.to_string(),
                    })
                } else {
                    Some(AgentEvent::Unknown)
                }
            }
            Some("result") => Some(AgentEvent::Result),
            _ => Some(AgentEvent::Unknown),
        }
    }
}
