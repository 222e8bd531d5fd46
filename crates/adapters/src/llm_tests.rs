// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;

#[yare::parameterized(
    rate_limit = { LlmError::RateLimit, true },
    transient = { LlmError::Transient("timeout".to_string()), true },
    billing = { LlmError::Billing("card declined".to_string()), false },
    unauthorized = { LlmError::Unauthorized("bad key".to_string()), false },
    other = { LlmError::Other("boom".to_string()), false },
)]
fn retryable_classification_matches_spec_taxonomy(err: LlmError, expected: bool) {
    assert_eq!(err.is_retryable(), expected);
}

#[test]
fn chat_request_round_trips_through_json() {
    let request = ChatRequest {
        model: "claude".to_string(),
        system_prompt: "be helpful".to_string(),
        messages: vec![serde_json::json!({"role": "user", "content": "hi"})],
        tools: vec![ToolSchema {
            name: "signal_event".to_string(),
            description: "signal a hat transition".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }],
    };
    let encoded = serde_json::to_string(&request).unwrap();
    let decoded: ChatRequest = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, request);
}

#[test]
fn chat_response_carries_tool_calls_and_usage() {
    let response = ChatResponse {
        text: "done".to_string(),
        tokens_input: 10,
        tokens_output: 5,
        tool_calls: vec![ToolCall { name: "signal_event".to_string(), arguments: serde_json::json!({}) }],
    };
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tokens_input + response.tokens_output, 15);
}

#[tokio::test]
async fn unconfigured_client_fails_non_retryably() {
    let client = UnconfiguredLlmClient;
    let request = ChatRequest {
        model: "none".to_string(),
        system_prompt: String::new(),
        messages: Vec::new(),
        tools: Vec::new(),
    };
    let err = client.chat(request).await.unwrap_err();
    assert!(!err.is_retryable());
    assert!(matches!(err, LlmError::Unauthorized(_)));
}
