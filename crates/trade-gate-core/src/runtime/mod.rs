// trade-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Trade Gate Resolution Pipeline
// Description: Strategy selection and graceful degradation for resolution.
// Purpose: Turn a query into a resolved request or a typed unresolved outcome.
// Dependencies: crate::{core, interfaces, mapper, resolve}
// ============================================================================

//! ## Overview
//! The pipeline wires one resolution strategy in front of the resolver. In
//! model mode the extractor runs first and every failure, transport or
//! semantic, falls back to the offline mapper; in offline mode the mapper runs
//! alone. No extraction or resolution error propagates out of the pipeline:
//! the terminal outcome is either a resolved request or a typed unresolved
//! result carrying the reason.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ExtractionSource;
use crate::core::QueryContext;
use crate::core::ResolvedRequest;
use crate::core::Timestamp;
use crate::interfaces::IntentSource;
use crate::mapper::OfflineMapper;
use crate::resolve::Resolver;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Terminal outcome of resolving one query.
#[derive(Debug)]
pub enum ResolutionOutcome {
    /// Query resolved into a concrete request.
    Resolved {
        /// The resolved request.
        request: ResolvedRequest,
        /// Strategy that produced the winning intent.
        source: ExtractionSource,
    },
    /// Query could not be resolved.
    Unresolved {
        /// Why resolution failed, suitable for user display.
        reason: String,
    },
}

impl ResolutionOutcome {
    /// Returns the resolved request, when the outcome carries one.
    #[must_use]
    pub const fn request(&self) -> Option<&ResolvedRequest> {
        match self {
            Self::Resolved {
                request, ..
            } => Some(request),
            Self::Unresolved {
                ..
            } => None,
        }
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Resolution pipeline combining a strategy, fallback, and resolver.
pub struct Pipeline {
    /// Deterministic fallback mapper, always available.
    mapper: OfflineMapper,
    /// Optional model-backed extractor tried first.
    extractor: Option<Box<dyn IntentSource + Send + Sync>>,
    /// Parameter binder and validator.
    resolver: Resolver,
}

impl Pipeline {
    /// Creates an offline-only pipeline.
    #[must_use]
    pub fn offline(mapper: OfflineMapper, resolver: Resolver) -> Self {
        Self {
            mapper,
            extractor: None,
            resolver,
        }
    }

    /// Creates a pipeline that tries the extractor before the mapper.
    #[must_use]
    pub fn with_extractor(
        mapper: OfflineMapper,
        extractor: Box<dyn IntentSource + Send + Sync>,
        resolver: Resolver,
    ) -> Self {
        Self {
            mapper,
            extractor: Some(extractor),
            resolver,
        }
    }

    /// Resolves a query into a request or a typed unresolved outcome.
    ///
    /// Extraction and resolution failures on the model path degrade to the
    /// offline mapper rather than surfacing to the caller.
    #[must_use]
    pub fn resolve_query(
        &self,
        query: &str,
        ctx: &QueryContext,
        now: Timestamp,
    ) -> ResolutionOutcome {
        if let Some(extractor) = &self.extractor
            && let Ok((intent, params)) = extractor.produce(query, ctx, now)
            && let Ok(request) = self.resolver.resolve(&intent, &params, now)
        {
            return ResolutionOutcome::Resolved {
                request,
                source: ExtractionSource::Model,
            };
        }

        let (intent, params) = self.mapper.map(query, ctx, now);
        match self.resolver.resolve(&intent, &params, now) {
            Ok(request) => ResolutionOutcome::Resolved {
                request,
                source: ExtractionSource::Rules,
            },
            Err(err) => ResolutionOutcome::Unresolved {
                reason: err.to_string(),
            },
        }
    }
}
