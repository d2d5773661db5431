// trade-gate-core/tests/mapper.rs
// ============================================================================
// Module: Offline Mapper Tests
// Description: Tests for deterministic rule-based NL to endpoint mapping.
// ============================================================================
//! ## Overview
//! Validates mapper determinism, trigger scoring, and slot extraction.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic mapper fixtures.")]
#![allow(clippy::expect_used, reason = "Tests use expect for explicit failure messages.")]

use std::sync::Arc;

use trade_gate_core::AccountId;
use trade_gate_core::EndpointRegistry;
use trade_gate_core::ExtractionSource;
use trade_gate_core::MapperConfig;
use trade_gate_core::OfflineMapper;
use trade_gate_core::QueryContext;
use trade_gate_core::Timestamp;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Fixed reference instant: 2025-08-05T12:00:00Z.
const NOW: Timestamp = Timestamp::from_unix_millis(1_754_395_200_000);

/// Builds a mapper over the bundled catalog with a default account.
fn mapper() -> OfflineMapper {
    let registry = Arc::new(EndpointRegistry::bundled().unwrap());
    let config = MapperConfig {
        default_account: Some(AccountId::from("ACC-001-A")),
        ..MapperConfig::default()
    };
    OfflineMapper::new(registry, config).unwrap()
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

#[test]
fn mapping_is_a_pure_function_of_the_query() {
    let mapper = mapper();
    let ctx = QueryContext::default();
    let first = mapper.map("Какая цена Сбербанка?", &ctx, NOW);
    let second = mapper.map("Какая цена Сбербанка?", &ctx, NOW);
    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
}

// ============================================================================
// SECTION: Trigger Scoring
// ============================================================================

#[test]
fn quote_question_maps_to_quote_endpoint_with_symbol() {
    let mapper = mapper();
    let (intent, params) = mapper.map("Какая цена Сбербанка?", &QueryContext::default(), NOW);
    assert_eq!(intent.candidate.as_ref().unwrap().as_str(), "quote_latest");
    assert_eq!(intent.source, ExtractionSource::Rules);
    assert_eq!(params.get("symbol").unwrap().as_text().unwrap(), "SBER@MISX");
}

#[test]
fn cancel_question_with_order_id_maps_to_delete() {
    let mapper = mapper();
    let (intent, params) = mapper.map("Отмени ордер ORD123456", &QueryContext::default(), NOW);
    assert_eq!(intent.candidate.as_ref().unwrap().as_str(), "order_cancel");
    assert_eq!(params.get("order_id").unwrap().as_text().unwrap(), "ORD123456");
    assert_eq!(params.get("account_id").unwrap().as_text().unwrap(), "ACC-001-A");
}

#[test]
fn unmatched_question_yields_the_unresolved_intent() {
    let mapper = mapper();
    let (intent, params) = mapper.map("Расскажи анекдот", &QueryContext::default(), NOW);
    assert!(intent.candidate.is_none());
    assert_eq!(intent.score, 0);
    assert!(params.is_empty());
}

#[test]
fn explicit_ticker_beats_nothing_and_resolves_market() {
    let mapper = mapper();
    let (intent, params) = mapper.map("стакан по GAZP", &QueryContext::default(), NOW);
    assert_eq!(intent.candidate.as_ref().unwrap().as_str(), "orderbook");
    assert_eq!(params.get("symbol").unwrap().as_text().unwrap(), "GAZP@MISX");
}

// ============================================================================
// SECTION: Order Extraction
// ============================================================================

#[test]
fn buy_question_extracts_side_quantity_and_symbol() {
    let mapper = mapper();
    let (intent, params) = mapper.map("Купи 10 акций Газпрома", &QueryContext::default(), NOW);
    assert_eq!(intent.candidate.as_ref().unwrap().as_str(), "order_create");
    assert_eq!(params.get("side").unwrap().as_text().unwrap(), "buy");
    assert_eq!(params.get("quantity").unwrap().as_integer().unwrap(), 10);
    assert_eq!(params.get("symbol").unwrap().as_text().unwrap(), "GAZP@MISX");
    assert_eq!(params.get("order_type").unwrap().as_text().unwrap(), "market");
}

#[test]
fn limit_price_wording_switches_order_type() {
    let mapper = mapper();
    let (_, params) =
        mapper.map("Продай 5 акций Сбербанка по цене 250.5", &QueryContext::default(), NOW);
    assert_eq!(params.get("side").unwrap().as_text().unwrap(), "sell");
    assert_eq!(params.get("order_type").unwrap().as_text().unwrap(), "limit");
    let price = params.get("price").unwrap();
    assert!(matches!(price, trade_gate_core::ParamValue::Number(value) if (*value - 250.5).abs() < f64::EPSILON));
}

// ============================================================================
// SECTION: Date Handling
// ============================================================================

#[test]
fn bars_without_interval_get_a_bounded_default_window() {
    let mapper = mapper();
    let (intent, params) = mapper.map("Покажи свечи Сбербанка", &QueryContext::default(), NOW);
    assert_eq!(intent.candidate.as_ref().unwrap().as_str(), "bars");
    assert_eq!(params.get("timeframe").unwrap().as_text().unwrap(), "TIME_FRAME_D");
    assert_eq!(params.get("start").unwrap().as_text().unwrap(), "2025-07-06T12:00:00Z");
    assert_eq!(params.get("end").unwrap().as_text().unwrap(), "2025-08-05T12:00:00Z");
}

#[test]
fn month_phrase_fills_the_interval() {
    let mapper = mapper();
    let (_, params) =
        mapper.map("Покажи свечи Сбербанка за август 2025", &QueryContext::default(), NOW);
    assert_eq!(params.get("start").unwrap().as_text().unwrap(), "2025-08-01T00:00:00Z");
    assert_eq!(params.get("end").unwrap().as_text().unwrap(), "2025-08-31T23:59:59Z");
}

// ============================================================================
// SECTION: Context Overrides
// ============================================================================

#[test]
fn context_symbol_overrides_text_extraction() {
    let mapper = mapper();
    let ctx = QueryContext {
        symbol: Some("LKOH".into()),
        ..QueryContext::default()
    };
    let (_, params) = mapper.map("Какая цена Сбербанка?", &ctx, NOW);
    assert_eq!(params.get("symbol").unwrap().as_text().unwrap(), "LKOH@MISX");
}
