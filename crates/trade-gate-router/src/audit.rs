// trade-gate-router/src/audit.rs
// ============================================================================
// Module: Trade Gate Audit Trail
// Description: Structured audit events and pluggable append-only sinks.
// Purpose: Record every safety decision and execution for later review.
// Dependencies: serde, serde_json, trade-gate-core
// ============================================================================

//! ## Overview
//! Audit events are typed payloads serialized as line-delimited JSON through
//! an [`AuditSink`]. The stderr sink serves interactive sessions, the file
//! sink append-only deployments, and the no-op sink tests that do not assert
//! on the trail. Sinks must not reorder or drop events they have accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use trade_gate_core::Timestamp;

use crate::router::ExecutionResult;

// ============================================================================
// SECTION: Events
// ============================================================================

/// One audit trail entry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A query was resolved (or failed to resolve) into a request.
    Resolution {
        /// Event timestamp.
        at: Timestamp,
        /// Raw natural-language query.
        query: String,
        /// Resolved method, when resolution succeeded.
        method: Option<String>,
        /// Resolved path, when resolution succeeded.
        path: Option<String>,
        /// Strategy that produced the result (`rules` or `model`).
        source: Option<String>,
    },
    /// The safety gate classified a resolved request.
    GateDecision {
        /// Event timestamp.
        at: Timestamp,
        /// Request method.
        method: String,
        /// Request path.
        path: String,
        /// Decision label (`allow`, `require_confirmation`, `deny`).
        decision: String,
        /// Policy reasons attached to the decision.
        reasons: Vec<String>,
    },
    /// A cleared request was executed (or served from cache).
    Execution {
        /// Event timestamp.
        at: Timestamp,
        /// Originating endpoint identifier.
        endpoint: String,
        /// Request method.
        method: String,
        /// Request path.
        path: String,
        /// Policy tag of the endpoint.
        policy: String,
        /// Execution outcome.
        result: ExecutionResult,
    },
    /// Model token usage reported by the extraction provider.
    ModelUsage {
        /// Event timestamp.
        at: Timestamp,
        /// Prompt tokens consumed.
        prompt_tokens: u64,
        /// Completion tokens produced.
        completion_tokens: u64,
    },
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Errors emitted by audit sinks.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Event serialization failed.
    #[error("audit event serialization failed: {0}")]
    Serialize(String),
    /// Sink write failed.
    #[error("audit write failed: {0}")]
    Write(String),
}

/// Append-only audit event sink.
pub trait AuditSink: Send + Sync {
    /// Appends one event to the trail.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the event cannot be recorded.
    fn append(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

// ============================================================================
// SECTION: Sink Implementations
// ============================================================================

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn append(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Sink writing line-delimited JSON to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn append(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let line = render(event)?;
        let mut stderr = std::io::stderr().lock();
        writeln!(&mut stderr, "{line}").map_err(|err| AuditError::Write(err.to_string()))
    }
}

/// Sink appending line-delimited JSON to a file.
#[derive(Debug)]
pub struct FileAuditSink {
    /// Append-only file handle guarded for concurrent executions.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens (or creates) the audit file in append mode.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Write`] when the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| AuditError::Write(err.to_string()))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let line = render(event)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| AuditError::Write("audit file mutex poisoned".to_string()))?;
        writeln!(&mut *file, "{line}").map_err(|err| AuditError::Write(err.to_string()))
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Serializes one event as a single JSON line.
fn render(event: &AuditEvent) -> Result<String, AuditError> {
    serde_json::to_string(event).map_err(|err| AuditError::Serialize(err.to_string()))
}
