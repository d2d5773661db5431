// trade-gate-llm/src/client.rs
// ============================================================================
// Module: Chat Completion Client
// Description: Bounded HTTP client for an OpenRouter-compatible chat API.
// Purpose: Confine model-provider transport behind one narrow trait.
// Dependencies: reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! The chat client issues bounded, redirect-free POST requests against a
//! chat-completions endpoint and returns the first choice's content plus token
//! usage. Everything the rest of the crate needs from a model provider goes
//! through [`ChatClient`], so tests and alternative providers plug in without
//! touching extraction logic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the chat completion client.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Chat API base URL (without the `/chat/completions` suffix).
    pub base_url: String,
    /// Bearer token for the provider.
    pub api_key: String,
    /// Model identifier requested from the provider.
    pub model: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: String::new(),
            model: "openai/gpt-4o".to_string(),
            timeout_ms: 60_000,
        }
    }
}

// ============================================================================
// SECTION: Messages and Completions
// ============================================================================

/// One chat message in provider wire format.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Message role (`system` or `user`).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Builds a user-role message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Completion returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletion {
    /// Content of the first choice.
    pub content: String,
    /// Prompt tokens reported by the provider.
    pub prompt_tokens: u64,
    /// Completion tokens reported by the provider.
    pub completion_tokens: u64,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Chat client errors.
#[derive(Debug, Error)]
pub enum LlmClientError {
    /// HTTP client construction failed.
    #[error("chat client build failed: {0}")]
    Build(String),
    /// Transport to the provider failed.
    #[error("chat transport failed: {0}")]
    Transport(String),
    /// Provider answered with a non-success status.
    #[error("chat provider returned http {0}")]
    Status(u16),
    /// Provider response did not carry the expected shape.
    #[error("chat response malformed: {0}")]
    Malformed(String),
}

// ============================================================================
// SECTION: Client Trait
// ============================================================================

/// Narrow chat-completion capability used by the extractor.
pub trait ChatClient {
    /// Requests one completion for the given messages.
    ///
    /// # Errors
    ///
    /// Returns [`LlmClientError`] on transport, status, or shape failures.
    fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<ChatCompletion, LlmClientError>;
}

// ============================================================================
// SECTION: Wire Shapes
// ============================================================================

/// Provider response body subset.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    /// Completion choices.
    choices: Vec<CompletionChoice>,
    /// Token usage, when reported.
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

/// One completion choice.
#[derive(Debug, Deserialize)]
struct CompletionChoice {
    /// Choice message.
    message: CompletionMessage,
}

/// Choice message payload.
#[derive(Debug, Deserialize)]
struct CompletionMessage {
    /// Message content.
    content: String,
}

/// Token usage payload.
#[derive(Debug, Default, Deserialize)]
struct CompletionUsage {
    /// Prompt tokens consumed.
    #[serde(default)]
    prompt_tokens: u64,
    /// Completion tokens produced.
    #[serde(default)]
    completion_tokens: u64,
}

// ============================================================================
// SECTION: OpenRouter Client
// ============================================================================

/// Chat client for an OpenRouter-compatible chat-completions API.
pub struct OpenRouterClient {
    /// Client configuration.
    config: LlmConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl OpenRouterClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmClientError::Build`] when the HTTP client cannot be built.
    pub fn new(config: LlmConfig) -> Result<Self, LlmClientError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .build()
            .map_err(|err| LlmClientError::Build(err.to_string()))?;
        Ok(Self {
            config,
            client,
        })
    }
}

impl ChatClient for OpenRouterClient {
    fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<ChatCompletion, LlmClientError> {
        let payload = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .map_err(|err| LlmClientError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(LlmClientError::Status(status));
        }
        let body: CompletionResponse =
            response.json().map_err(|err| LlmClientError::Malformed(err.to_string()))?;
        let usage = body.usage.unwrap_or_default();
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmClientError::Malformed("no completion choices".to_string()))?;
        Ok(ChatCompletion {
            content: choice.message.content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}
