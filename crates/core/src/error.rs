//! Domain error taxonomy for route configuration management.

use crate::store::StoreError;

/// Errors surfaced by route repository operations and validation.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// No route exists under the requested id. Raised by `delete` only:
    /// lookups report absence as `Ok(None)` and updates fall back to
    /// creation instead.
    #[error("Route not found: {0}")]
    EntityNotFound(String),

    /// A route or one of its rule entries failed validation. The message
    /// names the failing sub-check and carries the underlying cause.
    #[error("Invalid route configuration: {0}")]
    InvalidRouteConfiguration(String),

    /// The storage layer failed. Surfaced after a rollback attempt, never
    /// masked by a later error.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
