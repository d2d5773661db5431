// trade-gate-core/tests/gate.rs
// ============================================================================
// Module: Safety Gate Tests
// Description: Tests for policy checks and confirmation gating.
// ============================================================================
//! ## Overview
//! Validates that mutating requests never pass the gate without a fresh,
//! content-bound confirmation, and that policy denials are terminal.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic gate fixtures.")]
#![allow(clippy::expect_used, reason = "Tests use expect for explicit failure messages.")]

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use trade_gate_core::ConfirmationStore;
use trade_gate_core::EndpointId;
use trade_gate_core::GateDecision;
use trade_gate_core::GateError;
use trade_gate_core::HttpMethod;
use trade_gate_core::InMemoryConfirmationStore;
use trade_gate_core::PolicyTag;
use trade_gate_core::ResolvedRequest;
use trade_gate_core::SafetyGate;
use trade_gate_core::SafetyPolicy;
use trade_gate_core::Timestamp;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Fixed reference instant: 2025-08-05T12:00:00Z.
const NOW: Timestamp = Timestamp::from_unix_millis(1_754_395_200_000);

/// Builds a gate with the default policy and a fresh in-memory store.
fn gate() -> (SafetyGate, InMemoryConfirmationStore) {
    let store = InMemoryConfirmationStore::new();
    (SafetyGate::new(SafetyPolicy::default(), Arc::new(store.clone())), store)
}

/// Builds a read-only quote request.
fn quote_request() -> ResolvedRequest {
    let mut params = BTreeMap::new();
    params.insert("symbol".to_string(), "SBER@MISX".to_string());
    ResolvedRequest {
        endpoint_id: EndpointId::from("quote_latest"),
        method: HttpMethod::Get,
        path: "/v1/instruments/SBER@MISX/quotes/latest".to_string(),
        params,
        body: None,
        mutating: false,
        policy: PolicyTag::Read,
    }
}

/// Builds a mutating order-create request.
fn order_request(quantity: i64) -> ResolvedRequest {
    let mut params = BTreeMap::new();
    params.insert("account_id".to_string(), "ACC-001-A".to_string());
    params.insert("symbol".to_string(), "GAZP@MISX".to_string());
    params.insert("side".to_string(), "buy".to_string());
    params.insert("quantity".to_string(), quantity.to_string());
    params.insert("order_type".to_string(), "market".to_string());
    ResolvedRequest {
        endpoint_id: EndpointId::from("order_create"),
        method: HttpMethod::Post,
        path: "/v1/accounts/ACC-001-A/orders".to_string(),
        params,
        body: Some(json!({
            "instrument": "GAZP@MISX",
            "side": "buy",
            "type": "market",
            "quantity": quantity,
        })),
        mutating: true,
        policy: PolicyTag::PlaceOrder,
    }
}

// ============================================================================
// SECTION: Read Path
// ============================================================================

#[test]
fn read_requests_inside_policy_are_allowed() {
    let (gate, _) = gate();
    let decision = gate.check(quote_request(), None, NOW).unwrap();
    assert!(matches!(decision, GateDecision::Allow(_)));
}

#[test]
fn disallowed_market_is_denied_even_for_reads() {
    let (gate, _) = gate();
    let mut request = quote_request();
    request.params.insert("symbol".to_string(), "AAPL@XNYS".to_string());
    let decision = gate.check(request, None, NOW).unwrap();
    assert!(matches!(decision, GateDecision::Deny { .. }));
}

// ============================================================================
// SECTION: No Silent Mutation
// ============================================================================

#[test]
fn mutating_requests_never_pass_straight_through() {
    let (gate, _) = gate();
    let decision = gate.check(order_request(10), None, NOW).unwrap();
    assert!(matches!(decision, GateDecision::RequireConfirmation(_)));
}

#[test]
fn denylisted_tag_is_denied_outright() {
    let policy = SafetyPolicy {
        denied_tags: vec![PolicyTag::PlaceOrder],
        ..SafetyPolicy::default()
    };
    let gate = SafetyGate::new(policy, Arc::new(InMemoryConfirmationStore::new()));
    let decision = gate.check(order_request(10), None, NOW).unwrap();
    assert!(matches!(decision, GateDecision::Deny { .. }));
}

#[test]
fn oversized_order_quantity_is_denied() {
    let (gate, _) = gate();
    let decision = gate.check(order_request(1_000_000), None, NOW).unwrap();
    assert!(matches!(decision, GateDecision::Deny { .. }));
}

// ============================================================================
// SECTION: Confirmation Binding
// ============================================================================

#[test]
fn confirming_the_issued_token_clears_the_exact_request() {
    let (gate, _) = gate();
    let request = order_request(10);
    let GateDecision::RequireConfirmation(card) = gate.check(request.clone(), None, NOW).unwrap()
    else {
        unreachable!("mutating request must require confirmation");
    };
    assert_eq!(card.token.as_str(), request.content_hash().unwrap().value);

    let cleared = gate.confirm(&card.token, NOW.saturating_add_millis(1_000)).unwrap();
    assert_eq!(cleared.request(), &request);
}

#[test]
fn confirming_twice_fails() {
    let (gate, _) = gate();
    let GateDecision::RequireConfirmation(card) =
        gate.check(order_request(10), None, NOW).unwrap()
    else {
        unreachable!("mutating request must require confirmation");
    };
    gate.confirm(&card.token, NOW).unwrap();
    let err = gate.confirm(&card.token, NOW).unwrap_err();
    assert!(matches!(err, GateError::AlreadyDecided(_)));
}

#[test]
fn unknown_token_is_rejected() {
    let (gate, _) = gate();
    let err = gate.confirm(&"deadbeef".into(), NOW).unwrap_err();
    assert!(matches!(err, GateError::UnknownToken));
}

#[test]
fn expired_token_is_denied_without_execution() {
    let (gate, _) = gate();
    let GateDecision::RequireConfirmation(card) =
        gate.check(order_request(10), None, NOW).unwrap()
    else {
        unreachable!("mutating request must require confirmation");
    };
    let after_expiry = card.expires_at.saturating_add_millis(1);
    let err = gate.confirm(&card.token, after_expiry).unwrap_err();
    assert!(matches!(err, GateError::Expired));
    assert_eq!(err.to_string(), "confirmation expired");
}

#[test]
fn mutated_pending_request_invalidates_the_token() {
    let (gate, store) = gate();
    let GateDecision::RequireConfirmation(card) =
        gate.check(order_request(10), None, NOW).unwrap()
    else {
        unreachable!("mutating request must require confirmation");
    };

    // Substitute the stored request behind the same token.
    let mut record = store.load(&card.token).unwrap().unwrap();
    record.request = order_request(9_999);
    store.save(&record).unwrap();

    let err = gate.confirm(&card.token, NOW).unwrap_err();
    assert!(matches!(err, GateError::StaleRequest));
}

#[test]
fn rejecting_closes_the_pending_record() {
    let (gate, _) = gate();
    let GateDecision::RequireConfirmation(card) =
        gate.check(order_request(10), None, NOW).unwrap()
    else {
        unreachable!("mutating request must require confirmation");
    };
    gate.reject(&card.token, NOW).unwrap();
    let err = gate.confirm(&card.token, NOW).unwrap_err();
    assert!(matches!(err, GateError::AlreadyDecided(_)));
}

// ============================================================================
// SECTION: Confirmation Cards
// ============================================================================

#[test]
fn order_card_summarizes_the_order_and_carries_reasons() {
    let (gate, _) = gate();
    let GateDecision::RequireConfirmation(card) =
        gate.check(order_request(10), None, NOW).unwrap()
    else {
        unreachable!("mutating request must require confirmation");
    };
    assert_eq!(card.summary, "buy 10 GAZP@MISX (market)");
    assert!(card.reasons.iter().any(|reason| reason.contains("confirmation")));
    assert!(card.reasons.iter().any(|reason| reason.contains("places an order")));
    assert!(card.warnings.is_empty());
}

#[test]
fn aggressive_limit_price_warns_against_the_last_trade() {
    let (gate, _) = gate();
    let mut request = order_request(10);
    request.params.insert("order_type".to_string(), "limit".to_string());
    request.params.insert("price".to_string(), "150".to_string());
    let GateDecision::RequireConfirmation(card) =
        gate.check(request, Some(100.0), NOW).unwrap()
    else {
        unreachable!("mutating request must require confirmation");
    };
    assert!(card.warnings.iter().any(|warning| warning.contains("2%")));
}
