// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The LLM collaborator: out of scope to implement against a real provider
//! (spec.md §1), but the Ralph Loop needs a narrow trait to call through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool the model may call, described in whatever schema format the
/// provider expects; `hqw-adapters` treats it as opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A single request to the LLM collaborator (spec.md §4.5 step 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub system_prompt: String,
    /// Opaque provider-format conversation history, carried verbatim from
    /// `Session::conversation`.
    pub messages: Vec<serde_json::Value>,
    pub tools: Vec<ToolSchema>,
}

/// A tool call the model requested (spec.md §4.5 step 4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The model's reply: text, token usage, and any tool calls (spec.md §4.5 step 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub tool_calls: Vec<ToolCall>,
}

/// LLM API error taxonomy (spec.md §4.5, §7): rate-limit and transient
/// errors retry with backoff; billing and unauthorized fail the session.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("rate limited")]
    RateLimit,
    #[error("transient error: {0}")]
    Transient(String),
    #[error("billing error: {0}")]
    Billing(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// True for errors the Ralph Loop should retry with exponential backoff
    /// rather than fail the session outright.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::RateLimit | LlmError::Transient(_))
    }
}

/// The narrow interface the Ralph Loop calls through. The real provider
/// integration (Anthropic, OpenAI, ...) lives outside this workspace
/// (spec.md §1 Non-goals).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}

/// Placeholder [`LlmClient`] for a worker started without a real provider
/// wired in. Every call fails with [`LlmError::Unauthorized`], which the
/// Ralph Loop treats as non-retryable (spec.md §4.5, §7) so a
/// misconfigured worker fails its first session loudly instead of retrying
/// forever.
pub struct UnconfiguredLlmClient;

#[async_trait]
impl LlmClient for UnconfiguredLlmClient {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, LlmError> {
        Err(LlmError::Unauthorized("no LLM provider configured for this worker".to_string()))
    }
}

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;
