// trade-gate-cli/tests/config.rs
// ============================================================================
// Module: Configuration Tests
// Description: Tests for strict TOML loading and range validation.
// ============================================================================
//! ## Overview
//! Validates defaulting of absent sections, partial overrides, and the
//! fail-closed behavior on malformed or out-of-range values.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic config fixtures.")]

use std::fs;
use std::path::PathBuf;

use trade_gate_cli::config::ConfigError;
use trade_gate_cli::config::ResolutionMode;
use trade_gate_cli::config::TradeGateConfig;

/// Writes a config fixture and returns its path.
fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("trade-gate.toml");
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// SECTION: Loading
// ============================================================================

#[test]
fn empty_file_yields_the_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "");
    let config = TradeGateConfig::load(Some(&path)).unwrap();
    assert_eq!(config.resolution.mode, ResolutionMode::Offline);
    assert_eq!(config.router.max_attempts, 4);
    assert_eq!(config.router.backoff_ms, vec![100, 300, 700, 1500]);
    assert_eq!(config.safety.max_order_quantity, 10_000);
}

#[test]
fn partial_sections_override_only_their_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[resolution]
mode = "llm"
min_confidence = 0.5

[router]
rate_per_sec = 2
"#,
    );
    let config = TradeGateConfig::load(Some(&path)).unwrap();
    assert_eq!(config.resolution.mode, ResolutionMode::Llm);
    assert!((config.resolution.min_confidence - 0.5).abs() < f64::EPSILON);
    assert_eq!(config.resolution.default_market, "MISX");
    assert_eq!(config.router.rate_per_sec, 2);
    assert_eq!(config.router.burst, 10);
}

#[test]
fn safety_policy_is_configurable_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[safety]
allowed_methods = ["GET"]
denied_tags = ["account_admin"]
allowed_markets = ["MISX"]
max_order_quantity = 100
confirmation_ttl_ms = 60000
"#,
    );
    let config = TradeGateConfig::load(Some(&path)).unwrap();
    assert_eq!(config.safety.allowed_methods.len(), 1);
    assert_eq!(config.safety.denied_tags.len(), 1);
    assert_eq!(config.safety.max_order_quantity, 100);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let err = TradeGateConfig::load(Some(&PathBuf::from("/nonexistent/trade-gate.toml")))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn malformed_toml_fails_to_parse() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[resolution\nmode = offline");
    let err = TradeGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn out_of_range_confidence_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[resolution]\nmin_confidence = 1.5\n");
    let err = TradeGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn zero_rate_limit_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[router]\nrate_per_sec = 0\n");
    let err = TradeGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn excessive_attempts_fail_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[router]\nmax_attempts = 50\n");
    let err = TradeGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn zero_timeout_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[adapter]\ntimeout_ms = 0\n");
    let err = TradeGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn relative_auth_path_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[adapter]\nauth_path = \"v1/sessions\"\n");
    let err = TradeGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn non_positive_order_cap_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[safety]\nmax_order_quantity = 0\n");
    let err = TradeGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn unknown_keys_are_rejected_or_ignored_consistently() {
    // Unknown sections are ignored by serde defaults; unknown values inside
    // known enums still fail.
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[resolution]\nmode = \"hybrid\"\n");
    let err = TradeGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
