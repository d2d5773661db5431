// trade-gate-core/src/gate/mod.rs
// ============================================================================
// Module: Trade Gate Safety Gate
// Description: Policy checks and confirmation gating for resolved requests.
// Purpose: Keep every mutating call behind a fresh, content-bound confirmation.
// Dependencies: crate::{core, gate::store}
// ============================================================================

//! ## Overview
//! The safety gate classifies resolved requests against the configured policy.
//! Read-only requests inside policy pass straight through; mutating requests
//! are suspended behind a [`ConfirmationCard`] whose token is the canonical
//! content hash of the exact request, so a confirmation can never clear a
//! changed or substituted request. Execution clearance is a [`ClearedRequest`]
//! value that only this module can mint.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ConfirmationToken;
use crate::core::HashError;
use crate::core::HttpMethod;
use crate::core::PolicyTag;
use crate::core::ResolvedRequest;
use crate::core::Timestamp;
use crate::gate::store::ConfirmationStatus;
use crate::gate::store::ConfirmationStore;
use crate::gate::store::PendingConfirmation;
use crate::gate::store::StoreError;

// ============================================================================
// SECTION: Safety Policy
// ============================================================================

/// Safety policy configuration evaluated for every resolved request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyPolicy {
    /// HTTP methods the assistant may issue at all.
    pub allowed_methods: Vec<HttpMethod>,
    /// Policy tags denied outright, confirmation or not.
    pub denied_tags: Vec<PolicyTag>,
    /// Markets orders and quotes may reference.
    pub allowed_markets: Vec<String>,
    /// Upper bound for a single order quantity.
    pub max_order_quantity: i64,
    /// Confirmation expiry window in milliseconds.
    pub confirmation_ttl_ms: u64,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            allowed_methods: vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Delete],
            denied_tags: Vec::new(),
            allowed_markets: ["MISX", "FORTS", "RTSX", "XNGS", "SPBEX"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_order_quantity: 10_000,
            confirmation_ttl_ms: 120_000,
        }
    }
}

// ============================================================================
// SECTION: Gate Outputs
// ============================================================================

/// Execution clearance minted exclusively by the safety gate.
///
/// # Invariants
/// - Constructed only after an `Allow` decision or a valid confirmation, so
///   holding one proves the request passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearedRequest {
    /// The cleared request.
    request: ResolvedRequest,
}

impl ClearedRequest {
    /// Returns the cleared request.
    #[must_use]
    pub const fn request(&self) -> &ResolvedRequest {
        &self.request
    }
}

/// Confirmation card presented before executing a mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationCard {
    /// Human-readable description of the pending request.
    pub summary: String,
    /// Machine-checkable policy reasons requiring confirmation.
    pub reasons: Vec<String>,
    /// Advisory order sanity warnings.
    pub warnings: Vec<String>,
    /// Token correlating a decision back to the exact request.
    pub token: ConfirmationToken,
    /// Card issue timestamp.
    pub issued_at: Timestamp,
    /// Expiry timestamp after which the token is denied.
    pub expires_at: Timestamp,
}

/// Gate decision for one resolved request.
#[derive(Debug)]
pub enum GateDecision {
    /// Read-only request inside policy; cleared for execution.
    Allow(ClearedRequest),
    /// Mutating request suspended behind a confirmation card.
    RequireConfirmation(ConfirmationCard),
    /// Request denied outright by policy.
    Deny {
        /// Policy reasons for the denial.
        reasons: Vec<String>,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by confirmation handling.
#[derive(Debug, Error)]
pub enum GateError {
    /// No pending record exists under the presented token.
    #[error("unknown confirmation token")]
    UnknownToken,
    /// Confirmation window elapsed before the decision arrived.
    #[error("confirmation expired")]
    Expired,
    /// The pending record was already decided.
    #[error("confirmation already {}", .0.as_str())]
    AlreadyDecided(ConfirmationStatus),
    /// Stored request no longer hashes to the presented token.
    #[error("confirmation token does not match the stored request")]
    StaleRequest,
    /// Confirmation store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Content hashing failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Safety Gate
// ============================================================================

/// Classifies resolved requests and enforces confirmation for mutations.
pub struct SafetyGate {
    /// Active safety policy.
    policy: SafetyPolicy,
    /// Pending confirmation persistence.
    store: Arc<dyn ConfirmationStore + Send + Sync>,
}

impl SafetyGate {
    /// Creates a gate with the given policy and confirmation store.
    #[must_use]
    pub fn new(policy: SafetyPolicy, store: Arc<dyn ConfirmationStore + Send + Sync>) -> Self {
        Self {
            policy,
            store,
        }
    }

    /// Returns the active safety policy.
    #[must_use]
    pub const fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Classifies a resolved request.
    ///
    /// Mutating requests never pass straight through: the decision is either
    /// `RequireConfirmation` or `Deny`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when hashing or the confirmation store fails.
    pub fn check(
        &self,
        request: ResolvedRequest,
        last_price: Option<f64>,
        now: Timestamp,
    ) -> Result<GateDecision, GateError> {
        let reasons = self.policy_violations(&request);
        if !reasons.is_empty() {
            return Ok(GateDecision::Deny {
                reasons,
            });
        }
        if !request.mutating {
            return Ok(GateDecision::Allow(ClearedRequest {
                request,
            }));
        }

        let token = ConfirmationToken::new(request.content_hash()?.value);
        let expires_at = now.saturating_add_millis(self.policy.confirmation_ttl_ms);
        let card = ConfirmationCard {
            summary: describe(&request),
            reasons: vec![
                "mutating endpoint requires explicit confirmation".to_string(),
                request.policy.confirmation_reason().to_string(),
            ],
            warnings: order_warnings(&request, last_price),
            token: token.clone(),
            issued_at: now,
            expires_at,
        };
        self.store.save(&PendingConfirmation {
            token,
            request,
            issued_at: now,
            expires_at,
            status: ConfirmationStatus::Awaiting,
        })?;
        Ok(GateDecision::RequireConfirmation(card))
    }

    /// Confirms a pending request, clearing it for execution.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when the token is unknown, expired, already
    /// decided, stale, or the store fails.
    pub fn confirm(
        &self,
        token: &ConfirmationToken,
        now: Timestamp,
    ) -> Result<ClearedRequest, GateError> {
        let mut record = self.store.load(token)?.ok_or(GateError::UnknownToken)?;
        if record.status != ConfirmationStatus::Awaiting {
            return Err(GateError::AlreadyDecided(record.status));
        }
        if now > record.expires_at {
            record.status = ConfirmationStatus::Expired;
            self.store.save(&record)?;
            return Err(GateError::Expired);
        }
        if record.request.content_hash()?.value != record.token.as_str() {
            return Err(GateError::StaleRequest);
        }
        record.status = ConfirmationStatus::Confirmed;
        self.store.save(&record)?;
        Ok(ClearedRequest {
            request: record.request,
        })
    }

    /// Rejects a pending request with no side effects.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when the token is unknown, already decided, or
    /// the store fails.
    pub fn reject(&self, token: &ConfirmationToken, now: Timestamp) -> Result<(), GateError> {
        let mut record = self.store.load(token)?.ok_or(GateError::UnknownToken)?;
        if record.status != ConfirmationStatus::Awaiting {
            return Err(GateError::AlreadyDecided(record.status));
        }
        record.status = if now > record.expires_at {
            ConfirmationStatus::Expired
        } else {
            ConfirmationStatus::Rejected
        };
        self.store.save(&record)?;
        Ok(())
    }

    /// Collects policy violations for a resolved request.
    fn policy_violations(&self, request: &ResolvedRequest) -> Vec<String> {
        let mut reasons = Vec::new();
        if !self.policy.allowed_methods.contains(&request.method) {
            reasons.push(format!("method {} not allowed by policy", request.method));
        }
        if self.policy.denied_tags.contains(&request.policy) {
            reasons.push(format!("policy tag {} is denylisted", request.policy));
        }
        if let Some(market) = request_market(request)
            && !self.policy.allowed_markets.iter().any(|allowed| allowed == market)
        {
            reasons.push(format!("market {market} not in allowlist"));
        }
        if request.policy == PolicyTag::PlaceOrder
            && let Some(quantity) = request_quantity(request)
            && quantity > self.policy.max_order_quantity
        {
            reasons.push(format!(
                "order quantity {quantity} exceeds limit {}",
                self.policy.max_order_quantity
            ));
        }
        reasons
    }
}

// ============================================================================
// SECTION: Request Inspection
// ============================================================================

/// Extracts the market portion of the request symbol, when present.
fn request_market(request: &ResolvedRequest) -> Option<&str> {
    let symbol = request.params.get("symbol")?;
    let (_, market) = symbol.split_once('@')?;
    Some(market)
}

/// Extracts the order quantity, when present.
fn request_quantity(request: &ResolvedRequest) -> Option<i64> {
    request.params.get("quantity")?.parse().ok()
}

/// Builds a human-readable summary of a mutating request.
fn describe(request: &ResolvedRequest) -> String {
    match request.policy {
        PolicyTag::PlaceOrder => {
            let side = request.params.get("side").map_or("?", String::as_str);
            let quantity = request.params.get("quantity").map_or("?", String::as_str);
            let symbol = request.params.get("symbol").map_or("?", String::as_str);
            let order_type = request.params.get("order_type").map_or("market", String::as_str);
            let price = request
                .params
                .get("price")
                .map_or_else(String::new, |price| format!(" at {price}"));
            format!("{side} {quantity} {symbol} ({order_type}{price})")
        }
        PolicyTag::CancelOrder => {
            let order = request.params.get("order_id").map_or("?", String::as_str);
            let account = request.params.get("account_id").map_or("?", String::as_str);
            format!("cancel order {order} on account {account}")
        }
        PolicyTag::Read | PolicyTag::Session | PolicyTag::AccountAdmin => {
            format!("{} {}", request.method, request.path)
        }
    }
}

/// Builds advisory sanity warnings for order requests.
fn order_warnings(request: &ResolvedRequest, last_price: Option<f64>) -> Vec<String> {
    if request.policy != PolicyTag::PlaceOrder {
        return Vec::new();
    }
    let mut warnings = Vec::new();
    let quantity = request_quantity(request);
    if quantity.is_some_and(|quantity| quantity <= 0) {
        warnings.push("quantity is not positive".to_string());
    }
    let order_type = request.params.get("order_type").map(String::as_str).unwrap_or("market");
    let price: Option<f64> = request.params.get("price").and_then(|price| price.parse().ok());
    let stop_price: Option<f64> =
        request.params.get("stop_price").and_then(|price| price.parse().ok());
    if matches!(order_type, "limit" | "stop_limit") && price.is_none() {
        warnings.push("limit-style order without a price".to_string());
    }
    if matches!(order_type, "stop" | "stop_limit") && stop_price.is_none() {
        warnings.push("stop-style order without a stop price".to_string());
    }
    if let (Some(last), Some(price)) = (last_price, price) {
        let side = request.params.get("side").map(String::as_str).unwrap_or_default();
        if side == "buy" && price > last * 1.02 {
            warnings.push("limit buy price more than 2% above the last trade".to_string());
        }
        if side == "sell" && price < last * 0.98 {
            warnings.push("limit sell price more than 2% below the last trade".to_string());
        }
    }
    warnings
}
