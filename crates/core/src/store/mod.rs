//! Storage boundary for route persistence.
//!
//! The engine behind a [`RouteStore`] is a collaborator, not part of this
//! crate: `courier-db` implements these traits over PostgreSQL, and
//! [`memory`] provides a process-local store. Every repository operation
//! runs inside exactly one session.
//!
//! Session contract:
//! - a session observes its own staged writes (read-your-writes) and all
//!   state committed before it was opened;
//! - staged writes become visible to other sessions only on
//!   [`StoreSession::commit`];
//! - an explicit [`StoreSession::rollback`] discards staged writes, as does
//!   dropping a session without committing.

pub mod memory;

use std::future::Future;

use crate::route::Route;

/// Failure reported by a storage backend.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl StoreError {
    /// A backend-agnostic failure with a plain message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a backend error, keeping it as the source.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Opens transactional sessions over the route collection.
pub trait RouteStore: Send + Sync {
    type Session: StoreSession;

    /// Open a session seeing all previously committed state.
    fn session(&self) -> impl Future<Output = Result<Self::Session, StoreError>> + Send;
}

/// One transactional unit of work over the route collection.
pub trait StoreSession: Send {
    /// All routes with their rule entries, in stored order.
    fn routes(&mut self) -> impl Future<Output = Result<Vec<Route>, StoreError>> + Send;

    /// A single route by id.
    fn route(
        &mut self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Route>, StoreError>> + Send;

    /// Stage insertion of a new aggregate. Fails if the id already exists.
    fn insert_route(
        &mut self,
        route: &Route,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stage an insert-or-replace of the whole aggregate. The stored
    /// rule-entry collection becomes exactly `route.rule_entries`; rows
    /// absent from it are deleted with the replace.
    fn put_route(&mut self, route: &Route) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stage removal of a route and, by ownership, its rule entries.
    fn delete_route(&mut self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stage removal of every route.
    fn delete_all_routes(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Apply all staged writes.
    fn commit(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discard all staged writes.
    fn rollback(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
