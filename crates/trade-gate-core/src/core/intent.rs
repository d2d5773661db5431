// trade-gate-core/src/core/intent.rs
// ============================================================================
// Module: Trade Gate Intent Model
// Description: Intent candidates and extracted parameters for one query.
// Purpose: Carry per-query extraction output from mapper or model to resolver.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! An [`Intent`] pairs the raw natural-language query with an endpoint
//! candidate and a confidence score; [`ExtractedParams`] carries the raw slot
//! values found alongside it. Both are transient per-query values, produced by
//! the offline mapper or the model-backed extractor and consumed read-only by
//! the resolver.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AccountId;
use crate::core::identifiers::EndpointId;
use crate::core::identifiers::OrderId;
use crate::core::identifiers::Symbol;

// ============================================================================
// SECTION: Extraction Source
// ============================================================================

/// Producer of an intent and its extracted parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// Deterministic rule and lookup matching.
    Rules,
    /// External model structured output.
    Model,
}

impl ExtractionSource {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Model => "model",
        }
    }
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Parameter Values
// ============================================================================

/// Raw extracted parameter value prior to normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Free-form string value.
    Text(String),
    /// Whole-number value.
    Integer(i64),
    /// Decimal value.
    Number(f64),
}

impl ParamValue {
    /// Returns the value rendered for a query string or path segment.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
        }
    }

    /// Returns the string payload when the value is textual.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Integer(_) | Self::Number(_) => None,
        }
    }

    /// Returns the value as a whole number when possible.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
            Self::Number(_) => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Extracted parameter map owned by the producing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedParams {
    /// Name to raw value mapping.
    values: BTreeMap<String, ParamValue>,
    /// Producer of these values.
    source: ExtractionSource,
}

impl ExtractedParams {
    /// Creates an empty parameter map for the given source.
    #[must_use]
    pub const fn new(source: ExtractionSource) -> Self {
        Self {
            values: BTreeMap::new(),
            source,
        }
    }

    /// Returns the producer of these values.
    #[must_use]
    pub const fn source(&self) -> ExtractionSource {
        self.source
    }

    /// Inserts a value, replacing any previous one under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Inserts a value only when the name is not yet present.
    pub fn insert_missing(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.entry(name.into()).or_insert_with(|| value.into());
    }

    /// Returns the value under the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Returns whether the given name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates over name/value pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of extracted values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether no values were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// SECTION: Intent
// ============================================================================

/// Endpoint candidate produced for one natural-language query.
///
/// # Invariants
/// - Never mutated after creation; a `candidate` of `None` is the designated
///   unresolved intent rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Raw natural-language query.
    pub query: String,
    /// Candidate endpoint identifier, when one matched.
    pub candidate: Option<EndpointId>,
    /// Raw rule score backing the confidence value.
    pub score: u32,
    /// Normalized confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Producer of this intent.
    pub source: ExtractionSource,
}

impl Intent {
    /// Creates an intent carrying an endpoint candidate.
    #[must_use]
    pub fn candidate(
        query: impl Into<String>,
        endpoint: EndpointId,
        score: u32,
        source: ExtractionSource,
    ) -> Self {
        Self {
            query: query.into(),
            candidate: Some(endpoint),
            score,
            confidence: confidence_from_score(score),
            source,
        }
    }

    /// Creates the designated unresolved intent for a query.
    #[must_use]
    pub fn unresolved(query: impl Into<String>, source: ExtractionSource) -> Self {
        Self {
            query: query.into(),
            candidate: None,
            score: 0,
            confidence: 0.0,
            source,
        }
    }
}

/// Maps a raw rule score onto a bounded confidence value.
fn confidence_from_score(score: u32) -> f64 {
    (f64::from(score) * 0.25).min(1.0)
}

// ============================================================================
// SECTION: Query Context
// ============================================================================

/// Session context that seeds or overrides extraction for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Account identifier override or default.
    pub account_id: Option<AccountId>,
    /// Instrument symbol override.
    pub symbol: Option<Symbol>,
    /// Order identifier override.
    pub order_id: Option<OrderId>,
    /// Last trade price for order sanity checks.
    pub last_price: Option<f64>,
}
