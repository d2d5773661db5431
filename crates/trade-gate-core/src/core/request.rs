// trade-gate-core/src/core/request.rs
// ============================================================================
// Module: Trade Gate Resolved Requests
// Description: Concrete HTTP request bound to an endpoint catalog entry.
// Purpose: Provide the durable, hashable unit that is scored, gated, and executed.
// Dependencies: crate::core::{endpoint, hashing, identifiers}, serde
// ============================================================================

//! ## Overview
//! A [`ResolvedRequest`] is the terminal output of resolution: a fully
//! substituted method and path plus normalized parameters and an optional JSON
//! body. It is immutable once constructed; its canonical content hash binds
//! confirmation tokens to the exact request they were issued for, and the
//! `(method, path)` pair is the observable compared against reference answers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::endpoint::HttpMethod;
use crate::core::endpoint::PolicyTag;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::EndpointId;

// ============================================================================
// SECTION: Resolved Request
// ============================================================================

/// Concrete request resolved from a natural-language query.
///
/// # Invariants
/// - `path` contains no remaining `{placeholder}` slots.
/// - Immutable after construction; the content hash is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRequest {
    /// Originating endpoint identifier.
    pub endpoint_id: EndpointId,
    /// Concrete HTTP method.
    pub method: HttpMethod,
    /// Concrete path including any query string.
    pub path: String,
    /// Normalized parameter values keyed by slot name.
    pub params: BTreeMap<String, String>,
    /// JSON body for order-style requests.
    pub body: Option<Value>,
    /// Whether the originating endpoint mutates external state.
    pub mutating: bool,
    /// Policy tag of the originating endpoint.
    pub policy: PolicyTag,
}

impl ResolvedRequest {
    /// Computes the canonical content hash of this request.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn content_hash(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }

    /// Returns the `(method, path)` pair observed by the scorer.
    #[must_use]
    pub fn observable(&self) -> (HttpMethod, &str) {
        (self.method, &self.path)
    }
}
