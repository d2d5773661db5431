// trade-gate-core/src/gate/store.rs
// ============================================================================
// Module: Trade Gate Confirmation Store
// Description: Persistence of pending confirmation records keyed by token.
// Purpose: Make confirmation a resumable, restart-safe suspension point.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Pending confirmations are persisted records rather than in-memory
//! callbacks, so a process restart before confirmation deterministically
//! expires the request instead of silently resuming it. The in-memory store
//! serves tests and single-process deployments; durable stores implement the
//! same trait.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ConfirmationToken;
use crate::core::ResolvedRequest;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Lifecycle status of a pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Card issued, decision outstanding.
    Awaiting,
    /// Caller confirmed; request cleared for execution.
    Confirmed,
    /// Caller rejected; request denied.
    Rejected,
    /// Expiry window elapsed; request denied.
    Expired,
}

impl ConfirmationStatus {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Awaiting => "awaiting",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

/// Pending confirmation record keyed by token.
///
/// # Invariants
/// - `token` equals the canonical content hash of `request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// Confirmation token.
    pub token: ConfirmationToken,
    /// Resolved request awaiting the decision.
    pub request: ResolvedRequest,
    /// Card issue timestamp.
    pub issued_at: Timestamp,
    /// Expiry timestamp after which confirmation is denied.
    pub expires_at: Timestamp,
    /// Current lifecycle status.
    pub status: ConfirmationStatus,
}

// ============================================================================
// SECTION: Store Trait
// ============================================================================

/// Confirmation store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store reported an error.
    #[error("confirmation store error: {0}")]
    Store(String),
}

/// Persistence for pending confirmation records.
pub trait ConfirmationStore {
    /// Saves a confirmation record, replacing any record under the same token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save(&self, record: &PendingConfirmation) -> Result<(), StoreError>;

    /// Loads a confirmation record by token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load(&self, token: &ConfirmationToken) -> Result<Option<PendingConfirmation>, StoreError>;
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory confirmation store for tests and single-process use.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConfirmationStore {
    /// Record map protected by a mutex.
    records: Arc<Mutex<BTreeMap<String, PendingConfirmation>>>,
}

impl InMemoryConfirmationStore {
    /// Creates a new in-memory confirmation store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl ConfirmationStore for InMemoryConfirmationStore {
    fn save(&self, record: &PendingConfirmation) -> Result<(), StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Store("confirmation store mutex poisoned".to_string()))?
            .insert(record.token.as_str().to_string(), record.clone());
        Ok(())
    }

    fn load(&self, token: &ConfirmationToken) -> Result<Option<PendingConfirmation>, StoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("confirmation store mutex poisoned".to_string()))?;
        Ok(guard.get(token.as_str()).cloned())
    }
}
