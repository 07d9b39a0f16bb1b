//! Process-local route store.
//!
//! Backs the test suites and local tooling. A session works on a copy of
//! the committed state, so it reads its own staged writes; commit publishes
//! the copy, rollback (or drop) discards it.

use std::sync::{Arc, Mutex, PoisonError};

use super::{RouteStore, StoreError, StoreSession};
use crate::route::Route;

#[derive(Debug, Clone, Default)]
pub struct MemoryRouteStore {
    committed: Arc<Mutex<Vec<Route>>>,
}

impl MemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with already-committed routes.
    pub fn with_routes(routes: Vec<Route>) -> Self {
        Self {
            committed: Arc::new(Mutex::new(routes)),
        }
    }
}

impl RouteStore for MemoryRouteStore {
    type Session = MemorySession;

    async fn session(&self) -> Result<MemorySession, StoreError> {
        let working = self
            .committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(MemorySession {
            committed: Arc::clone(&self.committed),
            working,
            open: true,
        })
    }
}

/// A session over [`MemoryRouteStore`].
pub struct MemorySession {
    committed: Arc<Mutex<Vec<Route>>>,
    working: Vec<Route>,
    open: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::message("session is closed"))
        }
    }
}

impl StoreSession for MemorySession {
    async fn routes(&mut self) -> Result<Vec<Route>, StoreError> {
        self.ensure_open()?;
        Ok(self.working.clone())
    }

    async fn route(&mut self, id: &str) -> Result<Option<Route>, StoreError> {
        self.ensure_open()?;
        Ok(self.working.iter().find(|route| route.id == id).cloned())
    }

    async fn insert_route(&mut self, route: &Route) -> Result<(), StoreError> {
        self.ensure_open()?;
        if self.working.iter().any(|existing| existing.id == route.id) {
            return Err(StoreError::message(format!(
                "duplicate route id: {}",
                route.id
            )));
        }
        self.working.push(route.clone());
        Ok(())
    }

    async fn put_route(&mut self, route: &Route) -> Result<(), StoreError> {
        self.ensure_open()?;
        match self.working.iter_mut().find(|slot| slot.id == route.id) {
            Some(slot) => *slot = route.clone(),
            None => self.working.push(route.clone()),
        }
        Ok(())
    }

    async fn delete_route(&mut self, id: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.working.retain(|route| route.id != id);
        Ok(())
    }

    async fn delete_all_routes(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.working.clear();
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.open = false;
        let mut committed = self
            .committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *committed = std::mem::take(&mut self.working);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        // Discarding is valid on an already-closed session; rollback after a
        // failed commit attempt must not produce a second error.
        self.open = false;
        self.working.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteData;
    use serde_json::json;

    fn route(id: &str) -> Route {
        let data: RouteData = serde_json::from_value(json!({ "id": id })).unwrap();
        Route::from_data(data)
    }

    #[tokio::test]
    async fn staged_writes_invisible_until_commit() {
        let store = MemoryRouteStore::new();

        let mut writer = store.session().await.unwrap();
        writer.insert_route(&route("rt-1")).await.unwrap();

        let mut reader = store.session().await.unwrap();
        assert!(reader.routes().await.unwrap().is_empty());

        writer.commit().await.unwrap();

        let mut reader = store.session().await.unwrap();
        assert_eq!(reader.routes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = MemoryRouteStore::with_routes(vec![route("rt-1")]);

        let mut session = store.session().await.unwrap();
        session.delete_all_routes().await.unwrap();
        session.rollback().await.unwrap();

        let mut reader = store.session().await.unwrap();
        assert_eq!(reader.routes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dropped_session_discards_staged_writes() {
        let store = MemoryRouteStore::new();

        {
            let mut session = store.session().await.unwrap();
            session.insert_route(&route("rt-1")).await.unwrap();
        }

        let mut reader = store.session().await.unwrap();
        assert!(reader.routes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn session_reads_its_own_writes() {
        let store = MemoryRouteStore::new();

        let mut session = store.session().await.unwrap();
        session.insert_route(&route("rt-1")).await.unwrap();
        assert!(session.route("rt-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() {
        let store = MemoryRouteStore::with_routes(vec![route("rt-1")]);

        let mut session = store.session().await.unwrap();
        let err = session.insert_route(&route("rt-1")).await.unwrap_err();
        assert!(err.to_string().contains("duplicate route id"));
    }

    #[tokio::test]
    async fn put_replaces_existing_aggregate() {
        let store = MemoryRouteStore::with_routes(vec![route("rt-1")]);

        let mut updated = route("rt-1");
        updated.is_outbound = true;
        updated.host_endpoint = Some(".*".to_string());

        let mut session = store.session().await.unwrap();
        session.put_route(&updated).await.unwrap();
        session.commit().await.unwrap();

        let mut reader = store.session().await.unwrap();
        let stored = reader.route("rt-1").await.unwrap().unwrap();
        assert!(stored.is_outbound);
    }

    #[tokio::test]
    async fn closed_session_rejects_further_work() {
        let store = MemoryRouteStore::new();

        let mut session = store.session().await.unwrap();
        session.commit().await.unwrap();
        assert!(session.routes().await.is_err());
    }
}
