// trade-gate-core/src/resolve.rs
// ============================================================================
// Module: Trade Gate Resolver
// Description: Binds extracted parameters to a concrete registry entry.
// Purpose: Produce fully substituted, validated requests or typed failures.
// Dependencies: crate::{core, normalize, registry}, serde_json
// ============================================================================

//! ## Overview
//! The resolver validates an intent against the registry, normalizes every
//! extracted value for its declared semantic type, and substitutes the path
//! template. It guarantees that returned requests carry no remaining
//! placeholders; a query that cannot be bound yields a typed error instead of
//! a partial path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

use crate::core::ExtractedParams;
use crate::core::Intent;
use crate::core::ParamKind;
use crate::core::ParamLocation;
use crate::core::ParamSpec;
use crate::core::ParamValue;
use crate::core::ResolvedRequest;
use crate::core::Symbol;
use crate::core::Timestamp;
use crate::normalize::normalize_iso8601;
use crate::normalize::normalize_timeframe;
use crate::registry::EndpointRegistry;
use crate::registry::UnknownEndpoint;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Minimum intent confidence accepted without disambiguation.
    pub min_confidence: f64,
    /// Market attached to bare tickers during normalization.
    pub default_market: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.25,
            default_market: "MISX".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while resolving an intent into a concrete request.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Intent carried no endpoint candidate.
    #[error("query did not match any endpoint")]
    UnresolvedIntent,
    /// Candidate endpoint is absent from the registry.
    #[error(transparent)]
    UnknownEndpoint(#[from] UnknownEndpoint),
    /// Intent confidence is below the configured threshold.
    #[error("ambiguous endpoint match: confidence {confidence:.2} below {threshold:.2}")]
    AmbiguousEndpoint {
        /// Intent confidence.
        confidence: f64,
        /// Configured acceptance threshold.
        threshold: f64,
    },
    /// A required parameter is absent.
    #[error("missing required parameter: {0}")]
    MissingParameter(String),
    /// A parameter value failed type or format validation.
    #[error("invalid value for parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Binds intents and extracted parameters to concrete requests.
#[derive(Debug)]
pub struct Resolver {
    /// Shared endpoint registry.
    registry: Arc<EndpointRegistry>,
    /// Resolver configuration.
    config: ResolverConfig,
}

impl Resolver {
    /// Creates a resolver over the given registry and configuration.
    #[must_use]
    pub const fn new(registry: Arc<EndpointRegistry>, config: ResolverConfig) -> Self {
        Self {
            registry,
            config,
        }
    }

    /// Resolves an intent and its extracted parameters into a request.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the intent is unresolved, ambiguous, or
    /// a parameter is missing or invalid.
    pub fn resolve(
        &self,
        intent: &Intent,
        params: &ExtractedParams,
        now: Timestamp,
    ) -> Result<ResolvedRequest, ResolveError> {
        let Some(candidate) = &intent.candidate else {
            return Err(ResolveError::UnresolvedIntent);
        };
        if intent.confidence < self.config.min_confidence {
            return Err(ResolveError::AmbiguousEndpoint {
                confidence: intent.confidence,
                threshold: self.config.min_confidence,
            });
        }
        let spec = self.registry.lookup(candidate)?;

        let mut normalized: BTreeMap<String, NormalizedValue> = BTreeMap::new();
        for param in &spec.params {
            match params.get(&param.name) {
                Some(raw) => {
                    let value = self.normalize_value(param, raw, now)?;
                    normalized.insert(param.name.clone(), value);
                }
                None if param.required => {
                    return Err(ResolveError::MissingParameter(param.name.clone()));
                }
                None => {}
            }
        }

        let path = build_path(spec.path.as_str(), &spec.params, &normalized)?;
        let body = build_body(&spec.params, &normalized);
        let rendered = normalized
            .iter()
            .map(|(name, value)| (name.clone(), value.rendered.clone()))
            .collect();

        Ok(ResolvedRequest {
            endpoint_id: spec.id.clone(),
            method: spec.method,
            path,
            params: rendered,
            body,
            mutating: spec.mutating,
            policy: spec.policy,
        })
    }

    /// Normalizes one raw value for its declared semantic type.
    fn normalize_value(
        &self,
        param: &ParamSpec,
        raw: &ParamValue,
        now: Timestamp,
    ) -> Result<NormalizedValue, ResolveError> {
        let invalid = |reason: &str| ResolveError::InvalidParameter {
            name: param.name.clone(),
            reason: reason.to_string(),
        };
        match param.kind {
            ParamKind::Symbol => {
                let text = raw.as_text().map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    return Err(invalid("symbol must be a non-empty string"));
                }
                let symbol = Symbol::new(text).with_default_market(&self.config.default_market);
                Ok(NormalizedValue::text(symbol.as_str()))
            }
            ParamKind::AccountId | ParamKind::OrderId | ParamKind::Text => {
                let text = raw.as_text().map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    return Err(invalid("value must be a non-empty string"));
                }
                Ok(NormalizedValue::text(text))
            }
            ParamKind::Timeframe => {
                let text = raw.as_text().unwrap_or_default();
                Ok(NormalizedValue::text(normalize_timeframe(text).as_str()))
            }
            ParamKind::DateTime => {
                let text = raw.as_text().unwrap_or_default();
                let value = normalize_iso8601(text, now)
                    .ok_or_else(|| invalid("unrecognized date format"))?;
                Ok(NormalizedValue::text(&value))
            }
            ParamKind::Integer => {
                let value = raw.as_integer().ok_or_else(|| invalid("expected a whole number"))?;
                Ok(NormalizedValue::integer(value))
            }
            ParamKind::Decimal => {
                let value = match raw {
                    ParamValue::Number(value) => *value,
                    ParamValue::Integer(value) => {
                        // Lossless for any quantity/price magnitude in scope.
                        #[allow(clippy::cast_precision_loss, reason = "prices fit in f64")]
                        {
                            *value as f64
                        }
                    }
                    ParamValue::Text(value) => value
                        .trim()
                        .replace(',', ".")
                        .parse()
                        .map_err(|_| invalid("expected a decimal number"))?,
                };
                let number =
                    Number::from_f64(value).ok_or_else(|| invalid("decimal out of range"))?;
                Ok(NormalizedValue {
                    rendered: value.to_string(),
                    json: Value::Number(number),
                })
            }
            ParamKind::Side => {
                let text = raw.as_text().unwrap_or_default().trim().to_lowercase();
                match text.as_str() {
                    "buy" | "sell" => Ok(NormalizedValue::text(&text)),
                    _ => Err(invalid("side must be buy or sell")),
                }
            }
            ParamKind::OrderType => {
                let text = raw.as_text().unwrap_or_default().trim().to_lowercase();
                match text.as_str() {
                    "market" | "limit" | "stop" | "stop_limit" => Ok(NormalizedValue::text(&text)),
                    _ => Err(invalid("unknown order type")),
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Normalized Values
// ============================================================================

/// Normalized parameter value with both wire and JSON renderings.
#[derive(Debug, Clone)]
struct NormalizedValue {
    /// Value rendered for paths and query strings.
    rendered: String,
    /// Value rendered for JSON bodies.
    json: Value,
}

impl NormalizedValue {
    /// Builds a textual normalized value.
    fn text(value: &str) -> Self {
        Self {
            rendered: value.to_string(),
            json: Value::String(value.to_string()),
        }
    }

    /// Builds a whole-number normalized value.
    fn integer(value: i64) -> Self {
        Self {
            rendered: value.to_string(),
            json: Value::Number(Number::from(value)),
        }
    }
}

// ============================================================================
// SECTION: Request Assembly
// ============================================================================

/// Substitutes the path template and appends query parameters.
fn build_path(
    template: &str,
    params: &[ParamSpec],
    normalized: &BTreeMap<String, NormalizedValue>,
) -> Result<String, ResolveError> {
    let mut path = template.to_string();
    for param in params.iter().filter(|param| param.location == ParamLocation::Path) {
        let value = normalized
            .get(&param.name)
            .ok_or_else(|| ResolveError::MissingParameter(param.name.clone()))?;
        path = path.replace(&format!("{{{}}}", param.name), &value.rendered);
    }

    let query: Vec<String> = params
        .iter()
        .filter(|param| param.location == ParamLocation::Query)
        .filter_map(|param| {
            normalized
                .get(&param.name)
                .map(|value| format!("{}={}", param.wire_name(), value.rendered))
        })
        .collect();
    if !query.is_empty() {
        path.push('?');
        path.push_str(&query.join("&"));
    }
    Ok(path)
}

/// Builds the JSON body from body-located parameters, when any are present.
fn build_body(
    params: &[ParamSpec],
    normalized: &BTreeMap<String, NormalizedValue>,
) -> Option<Value> {
    let mut body = Map::new();
    for param in params.iter().filter(|param| param.location == ParamLocation::Body) {
        if let Some(value) = normalized.get(&param.name) {
            body.insert(param.wire_name().to_string(), value.json.clone());
        }
    }
    if body.is_empty() { None } else { Some(Value::Object(body)) }
}
