// trade-gate-router/src/router.rs
// ============================================================================
// Module: Tool Router
// Description: Execution facade for cleared requests with retries and caching.
// Purpose: Turn cleared requests into uniform execution results, audited.
// Dependencies: crate::{audit, cache, limiter}, trade-gate-core
// ============================================================================

//! ## Overview
//! The router only accepts [`ClearedRequest`] values, so execution without a
//! gate decision is impossible by construction. Read calls consult the TTL
//! cache first; every backend call passes the rate limiter; transient adapter
//! failures are retried through an explicit bounded loop with fixed backoff
//! delays. Success or failure, each execution is appended to the audit trail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use trade_gate_core::ClearedRequest;
use trade_gate_core::EndpointRegistry;
use trade_gate_core::ResolvedRequest;
use trade_gate_core::Timestamp;
use trade_gate_core::TradingAdapter;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::cache::ReadCache;
use crate::cache::cache_key;
use crate::limiter::RateLimiter;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Default cache TTL in seconds for read responses.
    pub cache_ttl_secs: u64,
    /// Sustained backend call rate in calls per second.
    pub rate_per_sec: u32,
    /// Burst capacity of the rate limiter.
    pub burst: u32,
    /// Maximum adapter attempts per execution, first call included.
    pub max_attempts: u32,
    /// Backoff delays in milliseconds between attempts; the last entry
    /// repeats when attempts outnumber entries.
    pub backoff_ms: Vec<u64>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            rate_per_sec: 5,
            burst: 10,
            max_attempts: 4,
            backoff_ms: vec![100, 300, 700, 1500],
        }
    }
}

// ============================================================================
// SECTION: Execution Result
// ============================================================================

/// Uniform outcome of one execution attempt chain.
///
/// # Invariants
/// - Never mutated after return; surfaced to the caller and the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// Whether the backend answered with a success status.
    pub success: bool,
    /// HTTP status, when the backend was reached.
    pub status: Option<u16>,
    /// Response payload on success.
    pub payload: Option<Value>,
    /// Failure detail on error.
    pub error: Option<String>,
    /// Wall time spent executing, in milliseconds.
    pub latency_ms: u64,
    /// Whether the response came from the read cache.
    pub cache_hit: bool,
    /// Adapter attempts made; zero for cache hits.
    pub attempts: u32,
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Execution facade over the trading adapter.
pub struct ToolRouter {
    /// Shared endpoint registry for per-endpoint cache TTL overrides.
    registry: Arc<EndpointRegistry>,
    /// Trading backend adapter.
    adapter: Box<dyn TradingAdapter + Send + Sync>,
    /// Audit trail sink.
    audit: Arc<dyn AuditSink>,
    /// Read response cache.
    cache: ReadCache,
    /// Shared rate limiter.
    limiter: RateLimiter,
    /// Router configuration.
    config: RouterConfig,
}

impl ToolRouter {
    /// Creates a router over the given adapter and audit sink.
    #[must_use]
    pub fn new(
        registry: Arc<EndpointRegistry>,
        adapter: Box<dyn TradingAdapter + Send + Sync>,
        audit: Arc<dyn AuditSink>,
        config: RouterConfig,
    ) -> Self {
        let limiter = RateLimiter::new(config.rate_per_sec, config.burst);
        Self {
            registry,
            adapter,
            audit,
            cache: ReadCache::new(),
            limiter,
            config,
        }
    }

    /// Executes a cleared request and returns its uniform result.
    ///
    /// Adapter failures never propagate: they are mapped into a failed
    /// [`ExecutionResult`] after the bounded retry loop completes.
    #[must_use]
    pub fn execute(&self, cleared: &ClearedRequest, now: Timestamp) -> ExecutionResult {
        let request = cleared.request();

        if !request.mutating {
            let key = cache_key(request);
            if let Some((status, body)) = self.cache.get(&key, now) {
                let result = ExecutionResult {
                    success: true,
                    status: Some(status),
                    payload: Some(body),
                    error: None,
                    latency_ms: 0,
                    cache_hit: true,
                    attempts: 0,
                };
                self.record(request, now, &result);
                return result;
            }
        }

        let delay = self.limiter.acquire_delay_ms(now);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }

        let result = self.execute_with_retries(request, now);
        self.record(request, now, &result);
        result
    }

    /// Runs the bounded retry loop against the adapter.
    fn execute_with_retries(&self, request: &ResolvedRequest, now: Timestamp) -> ExecutionResult {
        let started = Instant::now();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.adapter.execute(request.method, &request.path, request.body.as_ref()) {
                Ok(response) => {
                    if !request.mutating {
                        let ttl_secs = self.cache_ttl_secs(request);
                        self.cache.put(
                            cache_key(request),
                            response.status,
                            response.body.clone(),
                            now.saturating_add_millis(ttl_secs.saturating_mul(1000)),
                        );
                    }
                    return ExecutionResult {
                        success: true,
                        status: Some(response.status),
                        payload: Some(response.body),
                        error: None,
                        latency_ms: elapsed_ms(started),
                        cache_hit: false,
                        attempts,
                    };
                }
                Err(err) if err.is_transient() && attempts < max_attempts => {
                    thread::sleep(Duration::from_millis(self.backoff_for(attempts)));
                }
                Err(err) => {
                    return ExecutionResult {
                        success: false,
                        status: err.status(),
                        payload: None,
                        error: Some(err.to_string()),
                        latency_ms: elapsed_ms(started),
                        cache_hit: false,
                        attempts,
                    };
                }
            }
        }
    }

    /// Returns the cache TTL for a request, honoring catalog overrides.
    fn cache_ttl_secs(&self, request: &ResolvedRequest) -> u64 {
        self.registry
            .lookup(&request.endpoint_id)
            .ok()
            .and_then(|spec| spec.cache_ttl_secs)
            .unwrap_or(self.config.cache_ttl_secs)
    }

    /// Returns the backoff delay preceding the next attempt.
    fn backoff_for(&self, completed_attempts: u32) -> u64 {
        let index = usize::try_from(completed_attempts).unwrap_or(usize::MAX).saturating_sub(1);
        let delays = &self.config.backoff_ms;
        delays.get(index).or_else(|| delays.last()).copied().unwrap_or(0)
    }

    /// Appends the execution to the audit trail.
    fn record(&self, request: &ResolvedRequest, now: Timestamp, result: &ExecutionResult) {
        let event = AuditEvent::Execution {
            at: now,
            endpoint: request.endpoint_id.to_string(),
            method: request.method.to_string(),
            path: request.path.clone(),
            policy: request.policy.to_string(),
            result: result.clone(),
        };
        // The execution already happened; a failing sink must not undo it.
        let _ = self.audit.append(&event);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns elapsed wall time in milliseconds.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
