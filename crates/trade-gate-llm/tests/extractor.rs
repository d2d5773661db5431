// trade-gate-llm/tests/extractor.rs
// ============================================================================
// Module: LLM Extractor Tests
// Description: Tests for structured answer parsing and registry validation.
// ============================================================================
//! ## Overview
//! Validates that untrusted model output is fully checked against the
//! registry and that failures surface as typed extraction errors.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic extractor fixtures.")]
#![allow(clippy::expect_used, reason = "Tests use expect for explicit failure messages.")]

use std::sync::Arc;

use trade_gate_core::EndpointRegistry;
use trade_gate_core::ExtractionError;
use trade_gate_core::ExtractionSource;
use trade_gate_core::IntentSource;
use trade_gate_core::QueryContext;
use trade_gate_core::Timestamp;
use trade_gate_llm::ChatClient;
use trade_gate_llm::ChatCompletion;
use trade_gate_llm::ChatMessage;
use trade_gate_llm::LlmClientError;
use trade_gate_llm::LlmIntentExtractor;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Fixed reference instant: 2025-08-05T12:00:00Z.
const NOW: Timestamp = Timestamp::from_unix_millis(1_754_395_200_000);

/// Chat stub answering with a canned payload.
struct CannedClient {
    /// Answer returned for every completion request.
    answer: String,
}

impl ChatClient for CannedClient {
    fn complete(
        &self,
        _messages: &[ChatMessage],
        _temperature: f64,
        _max_tokens: u32,
    ) -> Result<ChatCompletion, LlmClientError> {
        Ok(ChatCompletion {
            content: self.answer.clone(),
            prompt_tokens: 100,
            completion_tokens: 20,
        })
    }
}

/// Chat stub failing at the transport boundary.
struct OfflineClient;

impl ChatClient for OfflineClient {
    fn complete(
        &self,
        _messages: &[ChatMessage],
        _temperature: f64,
        _max_tokens: u32,
    ) -> Result<ChatCompletion, LlmClientError> {
        Err(LlmClientError::Transport("connection refused".to_string()))
    }
}

/// Builds an extractor answering with the given canned payload.
fn extractor_with_answer(answer: &str) -> LlmIntentExtractor {
    let registry = Arc::new(EndpointRegistry::bundled().unwrap());
    LlmIntentExtractor::new(
        registry,
        Box::new(CannedClient {
            answer: answer.to_string(),
        }),
        Vec::new(),
    )
}

// ============================================================================
// SECTION: Valid Answers
// ============================================================================

#[test]
fn structured_answer_becomes_a_model_intent() {
    let extractor = extractor_with_answer(
        r#"{"endpoint": "quote_latest", "params": {"symbol": "SBER@MISX"}}"#,
    );
    let (intent, params) =
        extractor.produce("Какая цена Сбербанка?", &QueryContext::default(), NOW).unwrap();
    assert_eq!(intent.candidate.as_ref().unwrap().as_str(), "quote_latest");
    assert_eq!(intent.source, ExtractionSource::Model);
    assert_eq!(params.get("symbol").unwrap().as_text().unwrap(), "SBER@MISX");
    assert_eq!(params.source(), ExtractionSource::Model);
}

#[test]
fn fenced_answer_is_unwrapped() {
    let extractor = extractor_with_answer(
        "```json\n{\"endpoint\": \"assets_list\", \"params\": {}}\n```",
    );
    let (intent, _) = extractor.produce("список бумаг", &QueryContext::default(), NOW).unwrap();
    assert_eq!(intent.candidate.as_ref().unwrap().as_str(), "assets_list");
}

#[test]
fn numeric_params_keep_their_type() {
    let extractor = extractor_with_answer(
        r#"{"endpoint": "orderbook", "params": {"symbol": "SBER", "depth": 20}}"#,
    );
    let (_, params) = extractor.produce("стакан", &QueryContext::default(), NOW).unwrap();
    assert_eq!(params.get("depth").unwrap().as_integer().unwrap(), 20);
}

// ============================================================================
// SECTION: Untrusted Output Validation
// ============================================================================

#[test]
fn unknown_endpoint_identifier_is_rejected() {
    let extractor =
        extractor_with_answer(r#"{"endpoint": "close_account", "params": {}}"#);
    let err = extractor.produce("закрой счет", &QueryContext::default(), NOW).unwrap_err();
    assert!(matches!(err, ExtractionError::UnknownEndpoint(_)));
}

#[test]
fn non_json_answer_is_malformed() {
    let extractor = extractor_with_answer("GET /v1/assets");
    let err = extractor.produce("список бумаг", &QueryContext::default(), NOW).unwrap_err();
    assert!(matches!(err, ExtractionError::Malformed(_)));
}

#[test]
fn non_object_params_are_malformed() {
    let extractor =
        extractor_with_answer(r#"{"endpoint": "assets_list", "params": ["symbol"]}"#);
    let err = extractor.produce("список бумаг", &QueryContext::default(), NOW).unwrap_err();
    assert!(matches!(err, ExtractionError::Malformed(_)));
}

#[test]
fn usage_from_the_last_completion_is_exposed_for_auditing() {
    let extractor = extractor_with_answer(r#"{"endpoint": "assets_list", "params": {}}"#);
    assert!(extractor.last_usage().is_none());
    extractor.produce("список бумаг", &QueryContext::default(), NOW).unwrap();
    let usage = extractor.last_usage().unwrap();
    assert_eq!(usage.prompt_tokens, 100);
    assert_eq!(usage.completion_tokens, 20);
}

#[test]
fn transport_failure_surfaces_as_extraction_error() {
    let registry = Arc::new(EndpointRegistry::bundled().unwrap());
    let extractor = LlmIntentExtractor::new(registry, Box::new(OfflineClient), Vec::new());
    let err = extractor.produce("Какая цена Сбербанка?", &QueryContext::default(), NOW).unwrap_err();
    assert!(matches!(err, ExtractionError::Transport(_)));
}
