// trade-gate-core/tests/pipeline.rs
// ============================================================================
// Module: Resolution Pipeline Tests
// Description: Tests for strategy selection and graceful degradation.
// ============================================================================
//! ## Overview
//! Validates that extractor failures degrade to the offline mapper and that
//! the pipeline always terminates in a resolved or unresolved outcome.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic pipeline fixtures.")]
#![allow(clippy::expect_used, reason = "Tests use expect for explicit failure messages.")]

use std::sync::Arc;

use trade_gate_core::AccountId;
use trade_gate_core::EndpointId;
use trade_gate_core::EndpointRegistry;
use trade_gate_core::ExtractedParams;
use trade_gate_core::ExtractionError;
use trade_gate_core::ExtractionSource;
use trade_gate_core::HttpMethod;
use trade_gate_core::Intent;
use trade_gate_core::IntentSource;
use trade_gate_core::MapperConfig;
use trade_gate_core::OfflineMapper;
use trade_gate_core::Pipeline;
use trade_gate_core::QueryContext;
use trade_gate_core::ResolutionOutcome;
use trade_gate_core::Resolver;
use trade_gate_core::ResolverConfig;
use trade_gate_core::Timestamp;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Fixed reference instant: 2025-08-05T12:00:00Z.
const NOW: Timestamp = Timestamp::from_unix_millis(1_754_395_200_000);

/// Extractor stub that always fails at the transport boundary.
struct FailingExtractor;

impl IntentSource for FailingExtractor {
    fn produce(
        &self,
        _query: &str,
        _ctx: &QueryContext,
        _now: Timestamp,
    ) -> Result<(Intent, ExtractedParams), ExtractionError> {
        Err(ExtractionError::Transport("model unavailable".to_string()))
    }
}

/// Extractor stub that returns a fixed structured answer.
struct FixedExtractor;

impl IntentSource for FixedExtractor {
    fn produce(
        &self,
        query: &str,
        _ctx: &QueryContext,
        _now: Timestamp,
    ) -> Result<(Intent, ExtractedParams), ExtractionError> {
        let mut params = ExtractedParams::new(ExtractionSource::Model);
        params.insert("symbol", "LKOH@MISX");
        let intent =
            Intent::candidate(query, EndpointId::from("quote_latest"), 4, ExtractionSource::Model);
        Ok((intent, params))
    }
}

/// Builds a pipeline over the bundled catalog.
fn pipeline(extractor: Option<Box<dyn IntentSource + Send + Sync>>) -> Pipeline {
    let registry = Arc::new(EndpointRegistry::bundled().unwrap());
    let config = MapperConfig {
        default_account: Some(AccountId::from("ACC-001-A")),
        ..MapperConfig::default()
    };
    let mapper = OfflineMapper::new(Arc::clone(&registry), config).unwrap();
    let resolver = Resolver::new(registry, ResolverConfig::default());
    match extractor {
        Some(extractor) => Pipeline::with_extractor(mapper, extractor, resolver),
        None => Pipeline::offline(mapper, resolver),
    }
}

// ============================================================================
// SECTION: Offline Mode
// ============================================================================

#[test]
fn offline_pipeline_resolves_the_quote_scenario() {
    let pipeline = pipeline(None);
    let outcome = pipeline.resolve_query("Какая цена Сбербанка?", &QueryContext::default(), NOW);
    let request = outcome.request().expect("quote query must resolve");
    assert_eq!(
        request.observable(),
        (HttpMethod::Get, "/v1/instruments/SBER@MISX/quotes/latest")
    );
}

#[test]
fn offline_pipeline_reports_unresolved_queries() {
    let pipeline = pipeline(None);
    let outcome = pipeline.resolve_query("Расскажи анекдот", &QueryContext::default(), NOW);
    assert!(matches!(outcome, ResolutionOutcome::Unresolved { .. }));
}

// ============================================================================
// SECTION: Model Mode Degradation
// ============================================================================

#[test]
fn extractor_failure_degrades_to_the_offline_mapper() {
    let pipeline = pipeline(Some(Box::new(FailingExtractor)));
    let outcome = pipeline.resolve_query("Какая цена Сбербанка?", &QueryContext::default(), NOW);
    let ResolutionOutcome::Resolved {
        request,
        source,
    } = outcome
    else {
        unreachable!("fallback must still resolve the quote query");
    };
    assert_eq!(source, ExtractionSource::Rules);
    assert_eq!(request.path, "/v1/instruments/SBER@MISX/quotes/latest");
}

#[test]
fn extractor_failure_on_unmatched_query_yields_unresolved_not_a_panic() {
    let pipeline = pipeline(Some(Box::new(FailingExtractor)));
    let outcome = pipeline.resolve_query("Расскажи анекдот", &QueryContext::default(), NOW);
    assert!(matches!(outcome, ResolutionOutcome::Unresolved { .. }));
}

#[test]
fn successful_extraction_wins_over_the_mapper() {
    let pipeline = pipeline(Some(Box::new(FixedExtractor)));
    let outcome = pipeline.resolve_query("Какая цена Сбербанка?", &QueryContext::default(), NOW);
    let ResolutionOutcome::Resolved {
        request,
        source,
    } = outcome
    else {
        unreachable!("extractor answer must resolve");
    };
    assert_eq!(source, ExtractionSource::Model);
    assert_eq!(request.path, "/v1/instruments/LKOH@MISX/quotes/latest");
}
