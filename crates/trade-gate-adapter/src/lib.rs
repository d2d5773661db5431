// trade-gate-adapter/src/lib.rs
// ============================================================================
// Module: Trade Gate Adapter Library
// Description: HTTP adapter for the trading backend.
// Purpose: Expose the bounded trading-backend client and its auth modes.
// Dependencies: crate::{auth, client}
// ============================================================================

//! ## Overview
//! This crate owns the connection to the trading backend: a bounded blocking
//! HTTP client with redirects disabled and hard response-size limits, plus the
//! auth lifecycle (static access token or secret-to-JWT exchange). Failures
//! are classified as transient or permanent so the execution router can apply
//! bounded retries without inspecting transport details.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod client;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::AuthMode;
pub use auth::TokenCache;
pub use client::AdapterConfig;
pub use client::HttpTradingAdapter;
