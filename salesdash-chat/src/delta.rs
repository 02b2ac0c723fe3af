//! Extraction of text deltas from chat-completion chunk payloads.
//!
//! Only one path is read from each payload:
//! ```text
//! {"choices":[{"delta":{"content":"<text>"}}]}
//! ```
//! Everything else in the chunk (ids, roles, finish reasons, usage) is ignored.
//! An `error` member is only consulted when the chunk carries no content.

use serde::Deserialize;

/// Result of inspecting one data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// A non-empty text fragment, exactly as sent.
    Text(String),
    /// Nothing to emit for this payload.
    Skip(SkipReason),
}

/// Why a payload produced no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not JSON, or not shaped like a completion chunk.
    Malformed,
    /// A valid chunk whose first choice carries no content, e.g. a role-only
    /// opener or a finish-reason closer.
    NoContent,
    /// The server embedded an error object in the stream.
    ServerError(String),
}

#[derive(Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<ChoiceDelta>,
}

#[derive(Deserialize)]
struct ChoiceDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's content fragment out of `payload`.
///
/// Never fails: every problem is reported as [`DeltaOutcome::Skip`].
#[must_use]
pub fn extract_delta(payload: &str) -> DeltaOutcome {
    let chunk: Chunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(_) => return DeltaOutcome::Skip(SkipReason::Malformed),
    };

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content);

    match (content, chunk.error) {
        (Some(text), _) if !text.is_empty() => DeltaOutcome::Text(text),
        (_, Some(error)) => DeltaOutcome::Skip(SkipReason::ServerError(error_message(&error))),
        _ => DeltaOutcome::Skip(SkipReason::NoContent),
    }
}

fn error_message(error: &serde_json::Value) -> String {
    let message = match error {
        serde_json::Value::String(s) => Some(s.as_str()),
        other => other.get("message").and_then(serde_json::Value::as_str),
    };
    message.unwrap_or("unknown streaming error").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_content() {
        let out = extract_delta(r#"{"choices":[{"delta":{"content":"Hello"}}]}"#);
        assert_eq!(out, DeltaOutcome::Text("Hello".into()));
    }

    #[test]
    fn whitespace_is_preserved() {
        let out = extract_delta(r#"{"choices":[{"delta":{"content":"  spaced \n"}}]}"#);
        assert_eq!(out, DeltaOutcome::Text("  spaced \n".into()));
    }

    #[test]
    fn full_openai_chunk_is_accepted() {
        let payload = r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1,"model":"gpt-4o-mini","choices":[{"index":0,"delta":{"content":"Hi"},"logprobs":null,"finish_reason":null}]}"#;
        assert_eq!(extract_delta(payload), DeltaOutcome::Text("Hi".into()));
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert_eq!(
            extract_delta("{not json"),
            DeltaOutcome::Skip(SkipReason::Malformed)
        );
    }

    #[test]
    fn non_object_payload_is_malformed() {
        assert_eq!(
            extract_delta("42"),
            DeltaOutcome::Skip(SkipReason::Malformed)
        );
        assert_eq!(
            extract_delta(r#"{"choices":"nope"}"#),
            DeltaOutcome::Skip(SkipReason::Malformed)
        );
    }

    #[test]
    fn missing_or_empty_content_is_no_content() {
        for payload in [
            r#"{}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{}]}"#,
            r#"{"choices":[{"delta":{}}]}"#,
            r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#,
            r#"{"choices":[{"delta":{"content":null},"finish_reason":"stop"}]}"#,
        ] {
            assert_eq!(
                extract_delta(payload),
                DeltaOutcome::Skip(SkipReason::NoContent),
                "payload: {payload}"
            );
        }
    }

    #[test]
    fn only_first_choice_is_read() {
        let payload = r#"{"choices":[{"delta":{"content":"A"}},{"delta":{"content":"B"}}]}"#;
        assert_eq!(extract_delta(payload), DeltaOutcome::Text("A".into()));
    }

    #[test]
    fn error_object_is_reported() {
        let payload = r#"{"error":{"message":"Rate limit exceeded","type":"rate_limit_error"}}"#;
        assert_eq!(
            extract_delta(payload),
            DeltaOutcome::Skip(SkipReason::ServerError("Rate limit exceeded".into()))
        );
    }

    #[test]
    fn string_error_is_reported() {
        assert_eq!(
            extract_delta(r#"{"error":"boom"}"#),
            DeltaOutcome::Skip(SkipReason::ServerError("boom".into()))
        );
        assert_eq!(
            extract_delta(r#"{"error":{}}"#),
            DeltaOutcome::Skip(SkipReason::ServerError("unknown streaming error".into()))
        );
    }

    #[test]
    fn content_wins_over_error_member() {
        for payload in [
            r#"{"choices":[{"delta":{"content":"x"}}],"error":"boom"}"#,
            r#"{"choices":[{"delta":{"content":"x"}}],"error":{}}"#,
            r#"{"choices":[{"delta":{"content":"x"}}],"error":null}"#,
        ] {
            assert_eq!(
                extract_delta(payload),
                DeltaOutcome::Text("x".into()),
                "payload: {payload}"
            );
        }
    }
}
