//! Request mapping to the Chat Completions wire format.

use salesdash_pipeline::DashboardSnapshot;
use serde::Serialize;

use crate::config::ChatConfig;
use crate::types::{ChatRequest, Role};

/// Fixed preamble placed ahead of the rendered dashboard data.
const ASSISTANT_PREAMBLE: &str = "You are the salesdash sales-operations assistant. \
Answer questions using only the dashboard data below. \
If the data does not contain the answer, say so. \
Reply in the language the user writes in.";

/// Build the system instruction for a dashboard snapshot.
#[must_use]
pub fn system_prompt(snapshot: &DashboardSnapshot) -> String {
    format!(
        "{ASSISTANT_PREAMBLE}\n\n--- dashboard data ---\n{}--- end of data ---",
        snapshot.render()
    )
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

/// Convert a [`ChatRequest`] into a streaming Chat Completions JSON body.
///
/// Message order: system instruction (if any), history in order, then the
/// new user text.
#[must_use]
pub fn to_api_request(request: &ChatRequest, config: &ChatConfig) -> serde_json::Value {
    let mut messages = Vec::with_capacity(request.history.len() + 2);

    if let Some(system) = &request.system {
        messages.push(WireMessage {
            role: Role::System,
            content: system,
        });
    }

    messages.extend(request.history.iter().map(|turn| WireMessage {
        role: turn.role,
        content: &turn.content,
    }));

    messages.push(WireMessage {
        role: Role::User,
        content: &request.user_text,
    });

    serde_json::json!({
        "model": config.model,
        "messages": messages,
        "stream": true,
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
    })
}
