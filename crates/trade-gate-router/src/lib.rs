// trade-gate-router/src/lib.rs
// ============================================================================
// Module: Trade Gate Router Library
// Description: Execution facade for cleared trading requests.
// Purpose: Expose the router, cache, rate limiter, and audit trail.
// Dependencies: crate::{audit, cache, limiter, router}
// ============================================================================

//! ## Overview
//! The router executes requests the safety gate has cleared: read calls go
//! through a TTL cache, every call passes a token-bucket rate limiter, and
//! transient backend failures are retried with bounded backoff. Every
//! execution, cache hits and failures included, is appended to a pluggable
//! audit sink as structured JSON.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod cache;
pub mod limiter;
pub mod router;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditError;
pub use audit::AuditEvent;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use cache::ReadCache;
pub use cache::cache_key;
pub use limiter::RateLimiter;
pub use router::ExecutionResult;
pub use router::RouterConfig;
pub use router::ToolRouter;
