//! Robust model invocation.
//!
//! Calls the model gateway and extracts a well-formed JSON object from the
//! possibly noisy response text, retrying recoverable failures up to a
//! bounded attempt count. Transport errors from the gateway are never
//! retried.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use taskforge_core::{
    traits::{ChatMessage, CompletionOptions, ModelGateway},
    Error, Result,
};

use crate::context::TaskContext;

/// Delimiter some models emit between chain-of-thought and the answer; only
/// text after the last occurrence is parsed.
pub const REASONING_MARKER: &str = "</think>";

fn json_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```json\s*(\{.*?\})\s*```|(\{.*?\})")
            .expect("json extraction pattern compiles")
    })
}

/// Re-encode through a lossy byte round-trip to strip invalid sequences that
/// would crash downstream encoding.
fn sanitize(raw: &str) -> String {
    String::from_utf8_lossy(raw.as_bytes()).into_owned()
}

/// Extract a JSON value from free-form model output.
///
/// Tries, in order: a direct parse of the trimmed text, a fenced
/// ```json block or brace-delimited object, and finally the substring
/// between the first `{` and the last `}`. Text that is already valid JSON
/// comes back unchanged.
pub fn extract_json(raw: &str) -> Result<Value> {
    let sanitized = sanitize(raw);
    let cleaned = match sanitized.rfind(REASONING_MARKER) {
        Some(pos) => &sanitized[pos + REASONING_MARKER.len()..],
        None => sanitized.as_str(),
    };

    if let Ok(value) = serde_json::from_str::<Value>(cleaned.trim()) {
        return Ok(value);
    }

    if let Some(caps) = json_block_re().captures(cleaned) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            match serde_json::from_str::<Value>(m.as_str()) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(error = %e, "Found a JSON block in the response, but it was invalid");
                }
            }
        }
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(Error::invalid_response(
        "no valid JSON object found in the response",
    ))
}

/// Call the gateway and parse its JSON output, retrying recoverable
/// failures. Exhausting the retry budget fails with the last raw response
/// attached for diagnostics.
pub async fn invoke_json(
    gateway: &dyn ModelGateway,
    messages: &[ChatMessage],
    options: &CompletionOptions,
    max_retries: u32,
) -> Result<Value> {
    let retries = max_retries.max(1);
    let mut last_response = String::new();

    for attempt in 1..=retries {
        match gateway.complete(messages, options).await {
            Ok(completion) => {
                last_response = completion.content.clone();

                let parse_result = if completion.content.trim().is_empty() {
                    Err(Error::invalid_response(
                        "model response contained no content",
                    ))
                } else {
                    extract_json(&completion.content)
                };

                match parse_result {
                    Ok(value) => return Ok(value),
                    Err(e) if e.is_retryable() && attempt < retries => {
                        tracing::warn!(attempt, error = %e, "Model invocation attempt failed, retrying");
                    }
                    Err(e) if e.is_retryable() => {
                        return Err(Error::InvokeExhausted {
                            attempts: retries,
                            last_response,
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => {
                // Transport and classification failures other than the
                // recoverable parse kinds fail the invocation immediately.
                tracing::error!(error = %e, "Unexpected error during model call");
                return Err(e);
            }
        }
    }

    Err(Error::InvokeExhausted {
        attempts: retries,
        last_response,
    })
}

/// Invoke the task's chat model. The token budget is the explicit argument
/// when given, otherwise the configured chat-assignment budget.
pub async fn call_model(
    ctx: &TaskContext,
    messages: &[ChatMessage],
    max_tokens: Option<u32>,
) -> Result<Value> {
    let options = CompletionOptions {
        max_tokens: max_tokens.or(ctx.config.models.chat.max_tokens),
        ..Default::default()
    };
    invoke_json(
        ctx.gateway.as_ref(),
        messages,
        &options,
        ctx.config.invoker.max_retries,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskforge_core::mocks::MockGateway;

    #[test]
    fn test_extract_plain_json_unchanged() {
        let value = extract_json(r#"{"plan": [{"sub_goal": "a"}], "n": 3}"#).unwrap();
        assert_eq!(value, json!({"plan": [{"sub_goal": "a"}], "n": 3}));
    }

    #[test]
    fn test_extract_fenced_block_equals_plain() {
        let plain = extract_json(r#"{"a": 1}"#).unwrap();
        let fenced = extract_json("```json\n{\"a\": 1}\n```").unwrap();
        let prose = extract_json("Here is my answer:\n{\"a\": 1}\nHope that helps!").unwrap();
        assert_eq!(plain, fenced);
        assert_eq!(plain, prose);
    }

    #[test]
    fn test_extract_discards_reasoning_prefix() {
        let value = extract_json("Let me think...\n</think>\n{\"a\": 2}").unwrap();
        assert_eq!(value, json!({"a": 2}));
    }

    #[test]
    fn test_extract_keeps_text_after_last_marker() {
        let value =
            extract_json("{\"a\": 1}</think>ignored</think>{\"a\": 3}").unwrap();
        assert_eq!(value, json!({"a": 3}));
    }

    #[test]
    fn test_extract_nested_braces_via_span_fallback() {
        // The non-greedy block pattern truncates nested objects; the
        // first-to-last-brace pass recovers them.
        let value = extract_json("noise {\"a\": {\"b\": 2}} trailing").unwrap();
        assert_eq!(value, json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_extract_failure() {
        let err = extract_json("no json here at all").unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_invoke_retries_then_succeeds() {
        let gateway = MockGateway::scripted(&["not json", r#"{"ok": true}"#]);
        let value = invoke_json(
            &gateway,
            &[ChatMessage::user("q")],
            &CompletionOptions::default(),
            3,
        )
        .await
        .unwrap();
        assert_eq!(value, json!({"ok": true}));
        assert_eq!(gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invoke_exhaustion_carries_last_response() {
        let gateway = MockGateway::scripted(&["bad one", "bad two", "bad three"]);
        let err = invoke_json(
            &gateway,
            &[ChatMessage::user("q")],
            &CompletionOptions::default(),
            3,
        )
        .await
        .unwrap_err();
        match err {
            Error::InvokeExhausted {
                attempts,
                last_response,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_response, "bad three");
            }
            other => panic!("expected InvokeExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invoke_gateway_errors_are_fatal() {
        // An empty script makes the mock fail with a gateway error.
        let gateway = MockGateway::scripted(&[]);
        let err = invoke_json(
            &gateway,
            &[ChatMessage::user("q")],
            &CompletionOptions::default(),
            3,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Gateway(_)));
        assert_eq!(gateway.call_count(), 1);
    }
}
