// trade-gate-adapter/src/client.rs
// ============================================================================
// Module: Trading Backend HTTP Client
// Description: Bounded blocking client implementing the trading adapter.
// Purpose: Execute resolved requests with strict limits and typed failures.
// Dependencies: crate::auth, reqwest, serde_json, trade-gate-core
// ============================================================================

//! ## Overview
//! The HTTP adapter issues one bounded request per call: redirects are never
//! followed, the full request lifecycle runs under one timeout, and response
//! bodies are read through a hard size limit. Failures are classified for the
//! router's retry loop: timeouts, connection errors, 429, and 5xx are
//! transient; every other non-success status is permanent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use trade_gate_core::AdapterError;
use trade_gate_core::AdapterResponse;
use trade_gate_core::HttpMethod;
use trade_gate_core::TradingAdapter;

use crate::auth::AuthMode;
use crate::auth::TokenCache;
use crate::auth::classify_transport;
use crate::auth::exchange_secret;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the trading backend HTTP adapter.
///
/// # Invariants
/// - `timeout_ms` applies to the full request lifecycle.
/// - `max_response_bytes` is a hard upper bound on response bodies.
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterConfig {
    /// Trading backend base URL.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.finam.ru".to_string(),
            timeout_ms: 30_000,
            max_response_bytes: 4 * 1024 * 1024,
            user_agent: "trade-gate/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Trading backend adapter over a bounded blocking HTTP client.
pub struct HttpTradingAdapter {
    /// Adapter configuration, including limits.
    config: AdapterConfig,
    /// Authentication mode.
    auth: AuthMode,
    /// Cached exchanged token for secret-based auth.
    tokens: TokenCache,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpTradingAdapter {
    /// Creates an adapter with the given configuration and auth mode.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Permanent`] when the HTTP client cannot be
    /// built.
    pub fn new(config: AdapterConfig, auth: AuthMode) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| AdapterError::Permanent {
                status: None,
                message: format!("http client build failed: {err}"),
            })?;
        Ok(Self {
            config,
            auth,
            tokens: TokenCache::new(),
            client,
        })
    }

    /// Returns the access token to send, exchanging the secret when needed.
    fn access_token(&self) -> Result<Option<String>, AdapterError> {
        match &self.auth {
            AuthMode::None => Ok(None),
            AuthMode::AccessToken(token) => Ok(Some(token.clone())),
            AuthMode::SecretExchange {
                secret,
                auth_path,
            } => {
                if let Some(token) = self.tokens.get() {
                    return Ok(Some(token));
                }
                let token =
                    exchange_secret(&self.client, &self.config.base_url, auth_path, secret)?;
                self.tokens.store(token.clone());
                Ok(Some(token))
            }
        }
    }

    /// Builds the request for one resolved method and path.
    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<RequestBuilder, AdapterError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut request = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Delete => self.client.delete(url),
        };
        // The backend expects the raw token, not a Bearer-prefixed value.
        if let Some(token) = self.access_token()? {
            request = request.header("Authorization", token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request)
    }
}

impl TradingAdapter for HttpTradingAdapter {
    fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<AdapterResponse, AdapterError> {
        let request = self.build_request(method, path, body)?;
        let response = request.send().map_err(|err| classify_transport(&err))?;
        let status = response.status().as_u16();
        let bytes = read_limited(response, self.config.max_response_bytes)?;

        if status == 401 {
            // A rejected token is dropped so the next call re-exchanges.
            self.tokens.invalidate();
        }
        if !(200..300).contains(&status) {
            return Err(classify_status(status));
        }

        let body = parse_body(&bytes, status)?;
        Ok(AdapterResponse {
            status,
            body,
        })
    }
}

// ============================================================================
// SECTION: Response Handling
// ============================================================================

/// Reads a response body through a hard size limit.
fn read_limited(
    response: reqwest::blocking::Response,
    limit: usize,
) -> Result<Vec<u8>, AdapterError> {
    let mut body = Vec::new();
    let bound = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut bounded = response.take(bound);
    bounded.read_to_end(&mut body).map_err(|err| AdapterError::Transient {
        status: None,
        message: format!("response read failed: {err}"),
    })?;
    if body.len() > limit {
        return Err(AdapterError::Permanent {
            status: None,
            message: format!("response exceeds size limit ({limit} bytes)"),
        });
    }
    Ok(body)
}

/// Parses a response body into JSON; empty bodies become JSON null.
fn parse_body(bytes: &[u8], status: u16) -> Result<Value, AdapterError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|err| AdapterError::Permanent {
        status: Some(status),
        message: format!("response body is not json: {err}"),
    })
}

/// Classifies a non-success HTTP status for retry control flow.
fn classify_status(status: u16) -> AdapterError {
    if status == 429 || (500..600).contains(&status) {
        AdapterError::Transient {
            status: Some(status),
            message: "backend reported a retryable failure".to_string(),
        }
    } else {
        AdapterError::Permanent {
            status: Some(status),
            message: "backend rejected the request".to_string(),
        }
    }
}
