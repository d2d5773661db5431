// trade-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Trade Gate Interfaces
// Description: Backend-agnostic interfaces for extraction and execution.
// Purpose: Define the contract surfaces used by the resolution pipeline.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Trade Gate integrates with external systems without
//! embedding backend-specific details. The offline mapper and the model-backed
//! extractor are two implementations of one capability ([`IntentSource`]);
//! the trading backend sits behind [`TradingAdapter`]. Implementations must
//! fail closed on missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::ExtractedParams;
use crate::core::HttpMethod;
use crate::core::Intent;
use crate::core::QueryContext;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Intent Source
// ============================================================================

/// Errors raised by model-backed extraction.
///
/// The pipeline treats every variant as recoverable and falls back to the
/// offline mapper.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Transport to the model provider failed.
    #[error("model transport failed: {0}")]
    Transport(String),
    /// Model output could not be parsed into the expected shape.
    #[error("model output malformed: {0}")]
    Malformed(String),
    /// Model output referenced an endpoint absent from the registry.
    #[error("model output references unknown endpoint: {0}")]
    UnknownEndpoint(String),
}

/// Capability shared by the offline mapper and the model-backed extractor.
pub trait IntentSource {
    /// Produces an intent and extracted parameters for one query.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when extraction fails; deterministic
    /// sources never fail and return the unresolved intent instead.
    fn produce(
        &self,
        query: &str,
        ctx: &QueryContext,
        now: Timestamp,
    ) -> Result<(Intent, ExtractedParams), ExtractionError>;
}

// ============================================================================
// SECTION: Trading Adapter
// ============================================================================

/// Successful adapter response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON response body.
    pub body: Value,
}

/// Trading adapter errors, classified for retry control flow.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transient failure worth retrying (timeout, connect, 429, 5xx).
    #[error("transient adapter failure{}: {message}", fmt_status(.status))]
    Transient {
        /// HTTP status when one was received.
        status: Option<u16>,
        /// Failure description.
        message: String,
    },
    /// Permanent failure surfaced immediately (other 4xx, protocol errors).
    #[error("adapter failure{}: {message}", fmt_status(.status))]
    Permanent {
        /// HTTP status when one was received.
        status: Option<u16>,
        /// Failure description.
        message: String,
    },
}

impl AdapterError {
    /// Returns whether the failure is worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Returns the HTTP status carried by the failure, when any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transient {
                status, ..
            }
            | Self::Permanent {
                status, ..
            } => *status,
        }
    }
}

/// Renders an optional status for error display.
fn fmt_status(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |code| format!(" (http {code})"))
}

/// Backend-agnostic trading adapter.
///
/// The adapter owns its auth and connection lifecycle; Trade Gate hands it a
/// fully resolved method, path, and optional JSON body.
pub trait TradingAdapter {
    /// Executes one HTTP request against the trading backend.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] classified as transient or permanent.
    fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<AdapterResponse, AdapterError>;
}
