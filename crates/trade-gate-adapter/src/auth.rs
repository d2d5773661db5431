// trade-gate-adapter/src/auth.rs
// ============================================================================
// Module: Trading Backend Auth
// Description: Authorization modes and the secret-to-JWT exchange.
// Purpose: Keep token material and its exchange lifecycle out of request code.
// Dependencies: reqwest, serde_json, trade-gate-core
// ============================================================================

//! ## Overview
//! The trading backend accepts a raw access token in the `Authorization`
//! header. Deployments hold either that token directly or a long-lived secret
//! that must be exchanged for a short-lived JWT on a configurable auth path.
//! The exchange result is cached for the adapter's lifetime and can be
//! invalidated to force a fresh exchange after an auth rejection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use reqwest::blocking::Client;
use serde_json::Value;
use serde_json::json;
use trade_gate_core::AdapterError;

// ============================================================================
// SECTION: Auth Mode
// ============================================================================

/// How the adapter authenticates against the trading backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// No `Authorization` header is sent.
    None,
    /// A ready-to-use access token sent verbatim.
    AccessToken(String),
    /// A long-lived secret exchanged for a JWT on the auth path.
    SecretExchange {
        /// Long-lived secret presented to the auth service.
        secret: String,
        /// Exchange path on the backend (`/v1/sessions` by default).
        auth_path: String,
    },
}

impl AuthMode {
    /// Default exchange path for secret-based auth.
    pub const DEFAULT_AUTH_PATH: &'static str = "/v1/sessions";

    /// Builds the secret-exchange mode with the default auth path.
    #[must_use]
    pub fn secret(secret: impl Into<String>) -> Self {
        Self::SecretExchange {
            secret: secret.into(),
            auth_path: Self::DEFAULT_AUTH_PATH.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Token Cache
// ============================================================================

/// Cached access token shared across concurrent adapter calls.
///
/// # Invariants
/// - Holds at most one token; `invalidate` clears it so the next request
///   performs a fresh exchange.
#[derive(Debug, Default)]
pub struct TokenCache {
    /// Exchanged token, when one has been obtained.
    token: Mutex<Option<String>>,
}

impl TokenCache {
    /// Creates an empty token cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token, when present.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.token.lock().ok().and_then(|guard| guard.clone())
    }

    /// Stores a freshly exchanged token.
    pub fn store(&self, token: String) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some(token);
        }
    }

    /// Drops the cached token so the next request re-exchanges.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = None;
        }
    }
}

// ============================================================================
// SECTION: Secret Exchange
// ============================================================================

/// Exchanges a long-lived secret for a short-lived JWT.
///
/// The auth service answers `{"token": "..."}` on success.
///
/// # Errors
///
/// Returns [`AdapterError`] when transport fails, the auth service rejects the
/// secret, or the response carries no token.
pub fn exchange_secret(
    client: &Client,
    base_url: &str,
    auth_path: &str,
    secret: &str,
) -> Result<String, AdapterError> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), auth_path);
    let response = client
        .post(url)
        .json(&json!({ "secret": secret }))
        .send()
        .map_err(|err| classify_transport(&err))?;

    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        return Err(AdapterError::Permanent {
            status: Some(status),
            message: "secret exchange rejected".to_string(),
        });
    }
    let body: Value = response.json().map_err(|_| AdapterError::Permanent {
        status: Some(status),
        message: "secret exchange returned malformed json".to_string(),
    })?;
    body.get("token")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| AdapterError::Permanent {
            status: Some(status),
            message: "secret exchange response carries no token".to_string(),
        })
}

/// Classifies a transport error from the HTTP client.
pub(crate) fn classify_transport(err: &reqwest::Error) -> AdapterError {
    if err.is_timeout() || err.is_connect() {
        AdapterError::Transient {
            status: None,
            message: err.to_string(),
        }
    } else {
        AdapterError::Permanent {
            status: None,
            message: err.to_string(),
        }
    }
}
