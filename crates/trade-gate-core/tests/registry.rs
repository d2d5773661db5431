// trade-gate-core/tests/registry.rs
// ============================================================================
// Module: Endpoint Registry Tests
// Description: Tests for catalog loading, lookup, and path classification.
// ============================================================================
//! ## Overview
//! Validates fail-fast catalog loading and reverse path classification.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic catalog fixtures.")]
#![allow(clippy::expect_used, reason = "Tests use expect for explicit failure messages.")]

use trade_gate_core::EndpointId;
use trade_gate_core::EndpointRegistry;
use trade_gate_core::HttpMethod;
use trade_gate_core::RegistryLoadError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Minimal valid catalog with one read and one mutating endpoint.
const SMALL_CATALOG: &str = r#"
[[endpoints]]
id = "quote_latest"
method = "GET"
path = "/v1/instruments/{symbol}/quotes/latest"
policy = "read"
synonyms = ["цена"]

[[endpoints.params]]
name = "symbol"
kind = "symbol"
location = "path"
required = true

[[endpoints]]
id = "order_cancel"
method = "DELETE"
path = "/v1/accounts/{account_id}/orders/{order_id}"
policy = "cancel_order"
mutating = true

[[endpoints.params]]
name = "account_id"
kind = "account_id"
location = "path"
required = true

[[endpoints.params]]
name = "order_id"
kind = "order_id"
location = "path"
required = true
"#;

// ============================================================================
// SECTION: Loading
// ============================================================================

#[test]
fn bundled_catalog_loads() {
    let registry = EndpointRegistry::bundled().expect("bundled catalog must load");
    assert!(!registry.is_empty());
    let quote = registry.lookup(&EndpointId::from("quote_latest")).unwrap();
    assert_eq!(quote.method, HttpMethod::Get);
    assert!(!quote.mutating);
    let create = registry.lookup(&EndpointId::from("order_create")).unwrap();
    assert!(create.mutating);
}

#[test]
fn empty_catalog_is_rejected() {
    let err = EndpointRegistry::from_toml_str("endpoints = []").unwrap_err();
    assert!(matches!(err, RegistryLoadError::EmptyCatalog));
}

#[test]
fn duplicate_identifier_fails_whole_load() {
    let source = format!("{SMALL_CATALOG}\n{SMALL_CATALOG}");
    let err = EndpointRegistry::from_toml_str(&source).unwrap_err();
    assert!(matches!(err, RegistryLoadError::DuplicateEndpointId(_)));
}

#[test]
fn duplicate_route_fails_whole_load() {
    let source = format!(
        "{SMALL_CATALOG}\n{}",
        r#"
[[endpoints]]
id = "quote_copy"
method = "GET"
path = "/v1/instruments/{symbol}/quotes/latest"
policy = "read"

[[endpoints.params]]
name = "symbol"
kind = "symbol"
location = "path"
required = true
"#
    );
    let err = EndpointRegistry::from_toml_str(&source).unwrap_err();
    assert!(matches!(err, RegistryLoadError::DuplicateRoute(_)));
}

#[test]
fn undeclared_placeholder_is_rejected() {
    let source = r#"
[[endpoints]]
id = "bad"
method = "GET"
path = "/v1/things/{thing_id}"
policy = "read"
"#;
    let err = EndpointRegistry::from_toml_str(source).unwrap_err();
    assert!(matches!(err, RegistryLoadError::UndeclaredPlaceholder { .. }));
}

#[test]
fn unknown_policy_tag_is_rejected() {
    let source = r#"
[[endpoints]]
id = "bad"
method = "GET"
path = "/v1/assets"
policy = "close_account"
"#;
    let err = EndpointRegistry::from_toml_str(source).unwrap_err();
    assert!(matches!(err, RegistryLoadError::Parse(_)));
}

#[test]
fn catalog_merge_appends_and_checks_duplicates() {
    let extra = r#"
[[endpoints]]
id = "system_time"
method = "GET"
path = "/v1/time"
policy = "read"
"#;
    let registry = EndpointRegistry::load(&[SMALL_CATALOG, extra]).unwrap();
    assert_eq!(registry.len(), 3);
    assert!(registry.lookup(&EndpointId::from("system_time")).is_ok());

    let err = EndpointRegistry::load(&[SMALL_CATALOG, SMALL_CATALOG]).unwrap_err();
    assert!(matches!(err, RegistryLoadError::DuplicateEndpointId(_)));
}

// ============================================================================
// SECTION: Lookup and Classification
// ============================================================================

#[test]
fn lookup_unknown_endpoint_fails() {
    let registry = EndpointRegistry::from_toml_str(SMALL_CATALOG).unwrap();
    assert!(registry.lookup(&EndpointId::from("missing")).is_err());
}

#[test]
fn classify_matches_concrete_paths_back_to_specs() {
    let registry = EndpointRegistry::from_toml_str(SMALL_CATALOG).unwrap();
    let spec = registry.classify("/v1/instruments/SBER@MISX/quotes/latest").unwrap();
    assert_eq!(spec.id.as_str(), "quote_latest");

    let spec = registry.classify("/v1/accounts/A100/orders/ORD42").unwrap();
    assert_eq!(spec.id.as_str(), "order_cancel");

    assert!(registry.classify("/v1/unknown/route").is_none());
}

#[test]
fn classify_ignores_query_strings() {
    let registry = EndpointRegistry::bundled().unwrap();
    let spec = registry
        .classify("/v1/instruments/SBER@MISX/bars?timeframe=TIME_FRAME_D&interval.start_time=x")
        .unwrap();
    assert_eq!(spec.id.as_str(), "bars");
}
