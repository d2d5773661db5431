// trade-gate-core/src/core/endpoint.rs
// ============================================================================
// Module: Trade Gate Endpoint Specifications
// Description: Endpoint catalog entries with parameters and policy metadata.
// Purpose: Define the canonical shape of one trading-backend capability.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Endpoint specifications are the single source of truth for the REST surface
//! Trade Gate can reach: HTTP method, path template, parameter slots, the
//! mutation flag, and the policy tag consumed by the safety gate. Mapper
//! trigger words (synonyms and keywords) also live here so a new catalog entry
//! is immediately visible to the offline mapper and the extraction prompt
//! without code changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::EndpointId;

// ============================================================================
// SECTION: HTTP Method
// ============================================================================

/// HTTP methods supported by the trading backend surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Read-oriented request.
    Get,
    /// Create-oriented request.
    Post,
    /// Delete-oriented request.
    Delete,
}

impl HttpMethod {
    /// Returns the canonical uppercase method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Policy Tags
// ============================================================================

/// Policy classification consumed by the safety gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyTag {
    /// Read-only market or account data.
    Read,
    /// Places a new order.
    PlaceOrder,
    /// Cancels an existing order.
    CancelOrder,
    /// Session management (token exchange, session details).
    Session,
    /// Account administration operations.
    AccountAdmin,
}

impl PolicyTag {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::PlaceOrder => "place_order",
            Self::CancelOrder => "cancel_order",
            Self::Session => "session",
            Self::AccountAdmin => "account_admin",
        }
    }

    /// Returns the human-readable confirmation reason for this tag.
    #[must_use]
    pub const fn confirmation_reason(self) -> &'static str {
        match self {
            Self::Read => "reads market or account data",
            Self::PlaceOrder => "places an order against the account",
            Self::CancelOrder => "cancels a working order",
            Self::Session => "changes the trading session",
            Self::AccountAdmin => "administers the account",
        }
    }
}

impl fmt::Display for PolicyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Parameter Specifications
// ============================================================================

/// Semantic type of a parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Instrument symbol (`TICKER` or `TICKER@MARKET`).
    Symbol,
    /// Brokerage account identifier.
    AccountId,
    /// Exchange order identifier.
    OrderId,
    /// Candle timeframe (`TIME_FRAME_*`).
    Timeframe,
    /// RFC 3339 UTC date-time.
    DateTime,
    /// Whole number (quantity, depth, limit).
    Integer,
    /// Decimal number (price levels).
    Decimal,
    /// Order side (`buy` or `sell`).
    Side,
    /// Order type (`market`, `limit`, `stop`, `stop_limit`).
    OrderType,
    /// Free-form string.
    Text,
}

impl ParamKind {
    /// Returns a stable label for prompts and audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::AccountId => "account_id",
            Self::OrderId => "order_id",
            Self::Timeframe => "timeframe",
            Self::DateTime => "date_time",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Side => "side",
            Self::OrderType => "order_type",
            Self::Text => "text",
        }
    }
}

/// Where a parameter is placed in the concrete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    /// Substituted into a path template placeholder.
    Path,
    /// Appended to the query string.
    Query,
    /// Included in the JSON request body.
    Body,
}

/// One parameter slot of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name as used in templates and extraction output.
    pub name: String,
    /// Semantic type used for validation and normalization.
    pub kind: ParamKind,
    /// Placement in the concrete request.
    pub location: ParamLocation,
    /// Whether resolution fails when the parameter is absent.
    #[serde(default)]
    pub required: bool,
    /// Wire key override for query or body placement (e.g. `interval.start_time`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire_name: Option<String>,
}

impl ParamSpec {
    /// Returns the key used on the wire for this parameter.
    #[must_use]
    pub fn wire_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }
}

// ============================================================================
// SECTION: Endpoint Specification
// ============================================================================

/// Canonical catalog entry for one trading-backend capability.
///
/// # Invariants
/// - `(method, path)` pairs are unique within a registry.
/// - Every `{placeholder}` in `path` is declared as a required path parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Endpoint identifier.
    pub id: EndpointId,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template with `{placeholder}` slots.
    pub path: String,
    /// Parameter slots in declaration order.
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    /// Whether the endpoint changes external state.
    #[serde(default)]
    pub mutating: bool,
    /// Policy tag consumed by the safety gate.
    pub policy: PolicyTag,
    /// Phrase triggers weighted highest by the offline mapper.
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Secondary keyword triggers for the offline mapper.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Cache TTL override in seconds for read responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,
}

impl EndpointSpec {
    /// Returns the placeholder names appearing in the path template.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        template_placeholders(&self.path)
    }

    /// Returns the parameter spec with the given name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|param| param.name == name)
    }

    /// Returns parameter specs that are required for resolution.
    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|param| param.required)
    }
}

// ============================================================================
// SECTION: Template Helpers
// ============================================================================

/// Extracts `{placeholder}` names from a path template in order.
#[must_use]
pub fn template_placeholders(template: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        out.push(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];
    }
    out
}

/// Tests whether a concrete path matches a template, ignoring any query string.
///
/// Placeholders match exactly one non-empty path segment.
#[must_use]
pub fn template_matches(template: &str, path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    let mut template_segments = template.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (template_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(tpl), Some(seg)) => {
                let is_placeholder = tpl.starts_with('{') && tpl.ends_with('}');
                if is_placeholder {
                    if seg.is_empty() {
                        return false;
                    }
                } else if tpl != seg {
                    return false;
                }
            }
            _ => return false,
        }
    }
}
