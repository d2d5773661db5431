// trade-gate-llm/src/extractor.rs
// ============================================================================
// Module: Model-Backed Intent Extractor
// Description: Structured intent extraction through a chat-completion model.
// Purpose: Produce registry-validated intents from untrusted model output.
// Dependencies: crate::{client, prompt}, serde_json, trade-gate-core
// ============================================================================

//! ## Overview
//! The extractor sends the registry-grounded prompt to the chat model and
//! parses its structured answer `{ "endpoint": id, "params": {...} }`. Model
//! output is untrusted: the endpoint identifier must exist in the registry and
//! parameters must be a scalar map, otherwise extraction fails and the
//! pipeline falls back to the offline mapper. Non-determinism stays confined
//! to this component.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;
use trade_gate_core::EndpointId;
use trade_gate_core::EndpointRegistry;
use trade_gate_core::ExtractedParams;
use trade_gate_core::ExtractionError;
use trade_gate_core::ExtractionSource;
use trade_gate_core::Intent;
use trade_gate_core::IntentSource;
use trade_gate_core::ParamValue;
use trade_gate_core::QueryContext;
use trade_gate_core::Timestamp;

use crate::client::ChatClient;
use crate::client::ChatMessage;
use crate::prompt::FewShotExample;
use crate::prompt::extraction_prompt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Sampling temperature for extraction calls.
const EXTRACTION_TEMPERATURE: f64 = 0.0;
/// Completion budget for extraction calls.
const EXTRACTION_MAX_TOKENS: u32 = 300;
/// Rule score assigned to registry-validated model intents.
const MODEL_INTENT_SCORE: u32 = 4;

// ============================================================================
// SECTION: Token Usage
// ============================================================================

/// Token usage reported by the provider for one extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    /// Prompt tokens consumed.
    pub prompt_tokens: u64,
    /// Completion tokens produced.
    pub completion_tokens: u64,
}

// ============================================================================
// SECTION: Extractor
// ============================================================================

/// Model-backed intent extractor.
pub struct LlmIntentExtractor {
    /// Shared endpoint registry used for prompt grounding and validation.
    registry: Arc<EndpointRegistry>,
    /// Chat transport.
    client: Box<dyn ChatClient + Send + Sync>,
    /// Few-shot examples included in the prompt.
    examples: Vec<FewShotExample>,
    /// Usage reported by the most recent completion, for the audit trail.
    usage: Mutex<Option<TokenUsage>>,
}

impl LlmIntentExtractor {
    /// Creates an extractor over the given registry, client, and examples.
    #[must_use]
    pub fn new(
        registry: Arc<EndpointRegistry>,
        client: Box<dyn ChatClient + Send + Sync>,
        examples: Vec<FewShotExample>,
    ) -> Self {
        Self {
            registry,
            client,
            examples,
            usage: Mutex::new(None),
        }
    }

    /// Returns the usage reported by the most recent extraction call.
    #[must_use]
    pub fn last_usage(&self) -> Option<TokenUsage> {
        self.usage.lock().ok().and_then(|guard| *guard)
    }

    /// Parses and validates one model answer into intent and parameters.
    fn parse_answer(
        &self,
        query: &str,
        answer: &str,
    ) -> Result<(Intent, ExtractedParams), ExtractionError> {
        let payload = strip_code_fences(answer);
        let value: Value = serde_json::from_str(payload)
            .map_err(|err| ExtractionError::Malformed(err.to_string()))?;
        let Value::Object(object) = value else {
            return Err(ExtractionError::Malformed("answer is not a JSON object".to_string()));
        };

        let endpoint = object
            .get("endpoint")
            .and_then(Value::as_str)
            .ok_or_else(|| ExtractionError::Malformed("missing endpoint field".to_string()))?;
        let endpoint_id = EndpointId::from(endpoint);
        if self.registry.lookup(&endpoint_id).is_err() {
            return Err(ExtractionError::UnknownEndpoint(endpoint.to_string()));
        }

        let mut params = ExtractedParams::new(ExtractionSource::Model);
        if let Some(raw_params) = object.get("params") {
            let Value::Object(map) = raw_params else {
                return Err(ExtractionError::Malformed("params is not an object".to_string()));
            };
            for (name, value) in map {
                if let Some(value) = scalar_param(value) {
                    params.insert(name.clone(), value);
                }
            }
        }

        let intent =
            Intent::candidate(query, endpoint_id, MODEL_INTENT_SCORE, ExtractionSource::Model);
        Ok((intent, params))
    }
}

impl IntentSource for LlmIntentExtractor {
    fn produce(
        &self,
        query: &str,
        _ctx: &QueryContext,
        _now: Timestamp,
    ) -> Result<(Intent, ExtractedParams), ExtractionError> {
        let prompt = extraction_prompt(&self.registry, &self.examples, query);
        let completion = self
            .client
            .complete(
                &[ChatMessage::user(prompt)],
                EXTRACTION_TEMPERATURE,
                EXTRACTION_MAX_TOKENS,
            )
            .map_err(|err| ExtractionError::Transport(err.to_string()))?;
        if let Ok(mut guard) = self.usage.lock() {
            *guard = Some(TokenUsage {
                prompt_tokens: completion.prompt_tokens,
                completion_tokens: completion.completion_tokens,
            });
        }
        self.parse_answer(query, &completion.content)
    }
}

// ============================================================================
// SECTION: Answer Cleanup
// ============================================================================

/// Strips a surrounding Markdown code fence from a model answer.
fn strip_code_fences(answer: &str) -> &str {
    let trimmed = answer.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Converts a scalar JSON value into a parameter value.
fn scalar_param(value: &Value) -> Option<ParamValue> {
    match value {
        Value::String(text) => Some(ParamValue::Text(text.clone())),
        Value::Number(number) => number
            .as_i64()
            .map(ParamValue::Integer)
            .or_else(|| number.as_f64().map(ParamValue::Number)),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
