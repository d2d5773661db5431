// trade-gate-router/src/cache.rs
// ============================================================================
// Module: Read Response Cache
// Description: TTL cache for read-only execution responses.
// Purpose: Serve repeated read requests without contacting the backend.
// Dependencies: serde_json, trade-gate-core
// ============================================================================

//! ## Overview
//! The cache holds immutable response snapshots keyed by the full request
//! identity (method, path, normalized params). Entries never change after
//! insertion; they simply expire against the caller-supplied clock. A single
//! mutex keeps TTL accounting consistent across concurrent executions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;
use trade_gate_core::ResolvedRequest;
use trade_gate_core::Timestamp;

// ============================================================================
// SECTION: Cache Key
// ============================================================================

/// Builds the cache key for a resolved request.
///
/// Params are already name-ordered, so the key is deterministic for one
/// request identity.
#[must_use]
pub fn cache_key(request: &ResolvedRequest) -> String {
    let mut key = format!("{} {}", request.method, request.path);
    for (name, value) in &request.params {
        key.push('|');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

// ============================================================================
// SECTION: Entries
// ============================================================================

/// One cached response snapshot.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// HTTP status of the cached response.
    status: u16,
    /// Response payload.
    body: Value,
    /// Instant after which the entry is discarded.
    expires_at: Timestamp,
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// TTL cache shared across concurrent executions.
#[derive(Debug, Default)]
pub struct ReadCache {
    /// Entries keyed by request identity.
    entries: Mutex<BTreeMap<String, CacheEntry>>,
}

impl ReadCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached response for a key, dropping it when expired.
    #[must_use]
    pub fn get(&self, key: &str, now: Timestamp) -> Option<(u16, Value)> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some((entry.status, entry.body.clone())),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Inserts a response snapshot valid until `expires_at`.
    pub fn put(&self, key: String, status: u16, body: Value, expires_at: Timestamp) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    status,
                    body,
                    expires_at,
                },
            );
        }
    }
}
