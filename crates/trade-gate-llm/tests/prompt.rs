// trade-gate-llm/tests/prompt.rs
// ============================================================================
// Module: Prompt Builder Tests
// Description: Tests for registry-driven prompt assembly.
// ============================================================================
//! ## Overview
//! Validates that prompts stay grounded in the catalog and the training file.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic prompt fixtures.")]

use trade_gate_core::EndpointRegistry;
use trade_gate_llm::extraction_prompt;
use trade_gate_llm::parse_examples;

// ============================================================================
// SECTION: Few-Shot Parsing
// ============================================================================

#[test]
fn training_lines_parse_into_examples() {
    let source = "question;type;request\n\
                  Какая цена Сбербанка?;GET;/v1/instruments/SBER@MISX/quotes/latest\n\
                  broken line without fields\n\
                  Купи 10 акций;POST;/v1/accounts/{account_id}/orders\n";
    let examples = parse_examples(source);
    assert_eq!(examples.len(), 2);
    assert_eq!(examples[0].method, "GET");
    assert_eq!(examples[0].path, "/v1/instruments/SBER@MISX/quotes/latest");
}

// ============================================================================
// SECTION: Prompt Assembly
// ============================================================================

#[test]
fn prompt_lists_every_catalog_endpoint() {
    let registry = EndpointRegistry::bundled().unwrap();
    let prompt = extraction_prompt(&registry, &[], "Какая цена Сбербанка?");
    for spec in registry.iter() {
        assert!(prompt.contains(spec.path.as_str()), "prompt must list {}", spec.path);
    }
    assert!(prompt.contains("Какая цена Сбербанка?"));
    assert!(prompt.contains("TIME_FRAME_D"));
}

#[test]
fn prompt_mines_known_symbols_from_examples() {
    let registry = EndpointRegistry::bundled().unwrap();
    let examples = parse_examples(
        "Котировка SBER@MISX?;GET;/v1/instruments/SBER@MISX/quotes/latest\n\
         Стакан GAZP;GET;/v1/instruments/GAZP@MISX/orderbook\n",
    );
    let prompt = extraction_prompt(&registry, &examples, "вопрос");
    assert!(prompt.contains("Known symbols"));
    assert!(prompt.contains("SBER@MISX"));
    assert!(prompt.contains("GAZP"));
    assert!(prompt.contains("Вопрос: \"вопрос\""));
}
