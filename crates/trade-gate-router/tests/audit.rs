// trade-gate-router/tests/audit.rs
// ============================================================================
// Module: Audit Sink Tests
// Description: Tests for audit event serialization and the file sink.
// ============================================================================
//! ## Overview
//! Validates that audit events serialize as stable line-delimited JSON and
//! that the file sink appends without rewriting earlier entries.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic audit fixtures.")]

use std::fs;

use trade_gate_core::Timestamp;
use trade_gate_router::AuditEvent;
use trade_gate_router::AuditSink;
use trade_gate_router::ExecutionResult;
use trade_gate_router::FileAuditSink;
use trade_gate_router::NoopAuditSink;

/// Fixed reference instant: 2025-08-05T12:00:00Z.
const NOW: Timestamp = Timestamp::from_unix_millis(1_754_395_200_000);

/// Builds a successful execution event fixture.
fn execution_event() -> AuditEvent {
    AuditEvent::Execution {
        at: NOW,
        endpoint: "quote_latest".to_string(),
        method: "GET".to_string(),
        path: "/v1/instruments/SBER@MISX/quotes/latest".to_string(),
        policy: "read".to_string(),
        result: ExecutionResult {
            success: true,
            status: Some(200),
            payload: None,
            error: None,
            latency_ms: 12,
            cache_hit: false,
            attempts: 1,
        },
    }
}

// ============================================================================
// SECTION: File Sink
// ============================================================================

#[test]
fn file_sink_appends_one_json_line_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let sink = FileAuditSink::open(&path).unwrap();

    sink.append(&execution_event()).unwrap();
    sink.append(&AuditEvent::GateDecision {
        at: NOW,
        method: "POST".to_string(),
        path: "/v1/accounts/ACC-001-A/orders".to_string(),
        decision: "require_confirmation".to_string(),
        reasons: vec!["mutating endpoint requires explicit confirmation".to_string()],
    })
    .unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["event"], "execution");
    assert_eq!(first["result"]["status"], 200);

    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["event"], "gate_decision");
    assert_eq!(second["decision"], "require_confirmation");
}

#[test]
fn reopening_the_file_sink_preserves_earlier_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    FileAuditSink::open(&path).unwrap().append(&execution_event()).unwrap();
    FileAuditSink::open(&path).unwrap().append(&execution_event()).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
}

// ============================================================================
// SECTION: No-Op Sink
// ============================================================================

#[test]
fn noop_sink_accepts_every_event() {
    let sink = NoopAuditSink;
    assert!(sink.append(&execution_event()).is_ok());
}
