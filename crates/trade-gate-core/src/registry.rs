// trade-gate-core/src/registry.rs
// ============================================================================
// Module: Trade Gate Endpoint Registry
// Description: Declarative endpoint catalog loading, lookup, and classification.
// Purpose: Provide the immutable single source of truth for the REST surface.
// Dependencies: crate::core, serde, toml
// ============================================================================

//! ## Overview
//! The registry loads one or more declarative TOML catalogs into an immutable
//! set of [`EndpointSpec`] entries. Loading is fail-fast: any malformed entry
//! rejects the whole catalog. After load the registry is shared read-only;
//! reloading means constructing a new instance and swapping the shared handle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::core::EndpointId;
use crate::core::EndpointSpec;
use crate::core::ParamLocation;
use crate::core::template_matches;
use crate::core::template_placeholders;

// ============================================================================
// SECTION: Bundled Catalog
// ============================================================================

/// Default endpoint catalog bundled with the crate.
pub const BUNDLED_CATALOG: &str = include_str!("../catalog/endpoints.toml");

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading an endpoint catalog.
#[derive(Debug, Error)]
pub enum RegistryLoadError {
    /// Catalog source failed to parse.
    #[error("failed to parse endpoint catalog: {0}")]
    Parse(String),
    /// Catalog defines no endpoints.
    #[error("endpoint catalog is empty")]
    EmptyCatalog,
    /// Two entries share one endpoint identifier.
    #[error("duplicate endpoint identifier: {0}")]
    DuplicateEndpointId(String),
    /// Two entries share one `(method, path template)` pair.
    #[error("duplicate route: {0}")]
    DuplicateRoute(String),
    /// Path template is malformed.
    #[error("invalid path template for endpoint {endpoint}: {reason}")]
    InvalidTemplate {
        /// Endpoint identifier carrying the template.
        endpoint: String,
        /// Why the template was rejected.
        reason: String,
    },
    /// Template placeholder has no matching required path parameter.
    #[error("endpoint {endpoint} placeholder {{{slot}}} is not a declared required path param")]
    UndeclaredPlaceholder {
        /// Endpoint identifier carrying the placeholder.
        endpoint: String,
        /// Placeholder slot name.
        slot: String,
    },
    /// Path-located parameter does not appear in the template.
    #[error("endpoint {endpoint} path param {name} has no {{{name}}} placeholder")]
    OrphanPathParam {
        /// Endpoint identifier carrying the parameter.
        endpoint: String,
        /// Parameter name.
        name: String,
    },
}

/// Lookup failure for an unknown endpoint identifier.
#[derive(Debug, Error)]
#[error("unknown endpoint: {0}")]
pub struct UnknownEndpoint(pub EndpointId);

// ============================================================================
// SECTION: Catalog File Model
// ============================================================================

/// Top-level catalog file shape.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    /// Endpoint entries in declaration order.
    #[serde(default)]
    endpoints: Vec<EndpointSpec>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Immutable endpoint registry loaded from declarative catalogs.
#[derive(Debug)]
pub struct EndpointRegistry {
    /// Endpoint specs in catalog declaration order.
    specs: Vec<EndpointSpec>,
    /// Identifier index into `specs`.
    by_id: BTreeMap<EndpointId, usize>,
}

impl EndpointRegistry {
    /// Loads a registry from one or more TOML catalog sources.
    ///
    /// Later sources append to earlier ones; duplicate identifiers or routes
    /// across sources fail the whole load.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryLoadError`] when any entry is malformed.
    pub fn load(sources: &[&str]) -> Result<Self, RegistryLoadError> {
        let mut specs = Vec::new();
        for source in sources {
            let file: CatalogFile =
                toml::from_str(source).map_err(|err| RegistryLoadError::Parse(err.to_string()))?;
            specs.extend(file.endpoints);
        }
        if specs.is_empty() {
            return Err(RegistryLoadError::EmptyCatalog);
        }

        let mut by_id = BTreeMap::new();
        let mut routes = BTreeMap::new();
        for (index, spec) in specs.iter().enumerate() {
            validate_spec(spec)?;
            if by_id.insert(spec.id.clone(), index).is_some() {
                return Err(RegistryLoadError::DuplicateEndpointId(spec.id.to_string()));
            }
            let route = format!("{} {}", spec.method, spec.path);
            if routes.insert(route.clone(), index).is_some() {
                return Err(RegistryLoadError::DuplicateRoute(route));
            }
        }

        Ok(Self {
            specs,
            by_id,
        })
    }

    /// Loads a registry from a single TOML catalog source.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryLoadError`] when any entry is malformed.
    pub fn from_toml_str(source: &str) -> Result<Self, RegistryLoadError> {
        Self::load(&[source])
    }

    /// Loads the catalog bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryLoadError`] when the bundled catalog is malformed.
    pub fn bundled() -> Result<Self, RegistryLoadError> {
        Self::from_toml_str(BUNDLED_CATALOG)
    }

    /// Looks up an endpoint spec by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownEndpoint`] when the identifier is absent.
    pub fn lookup(&self, id: &EndpointId) -> Result<&EndpointSpec, UnknownEndpoint> {
        self.by_id
            .get(id)
            .and_then(|index| self.specs.get(*index))
            .ok_or_else(|| UnknownEndpoint(id.clone()))
    }

    /// Classifies a concrete path back to its endpoint spec.
    ///
    /// Query strings are ignored; the first template matching in declaration
    /// order wins.
    #[must_use]
    pub fn classify(&self, path: &str) -> Option<&EndpointSpec> {
        self.specs.iter().find(|spec| template_matches(&spec.path, path))
    }

    /// Iterates over endpoint specs in catalog declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &EndpointSpec> {
        self.specs.iter()
    }

    /// Returns the number of endpoints in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns whether the registry holds no endpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a single endpoint spec against catalog invariants.
fn validate_spec(spec: &EndpointSpec) -> Result<(), RegistryLoadError> {
    if !spec.path.starts_with('/') {
        return Err(RegistryLoadError::InvalidTemplate {
            endpoint: spec.id.to_string(),
            reason: "path must start with '/'".to_string(),
        });
    }
    if spec.path.contains('?') {
        return Err(RegistryLoadError::InvalidTemplate {
            endpoint: spec.id.to_string(),
            reason: "template must not embed a query string".to_string(),
        });
    }
    if spec.path.matches('{').count() != spec.path.matches('}').count() {
        return Err(RegistryLoadError::InvalidTemplate {
            endpoint: spec.id.to_string(),
            reason: "unbalanced braces".to_string(),
        });
    }

    for slot in template_placeholders(&spec.path) {
        let declared = spec
            .param(slot)
            .is_some_and(|param| param.required && param.location == ParamLocation::Path);
        if !declared {
            return Err(RegistryLoadError::UndeclaredPlaceholder {
                endpoint: spec.id.to_string(),
                slot: slot.to_string(),
            });
        }
    }
    for param in &spec.params {
        if param.location == ParamLocation::Path
            && !template_placeholders(&spec.path).contains(&param.name.as_str())
        {
            return Err(RegistryLoadError::OrphanPathParam {
                endpoint: spec.id.to_string(),
                name: param.name.clone(),
            });
        }
    }
    Ok(())
}
