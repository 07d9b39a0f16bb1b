//! Transactional session over PostgreSQL.
//!
//! One [`PgSession`] wraps one `sqlx` transaction. Writes replace a route's
//! child rows wholesale (delete then insert, with an explicit `position`
//! column carrying evaluation order), matching the aggregate semantics of
//! the storage contract.

use courier_core::route::Route;
use courier_core::store::{StoreError, StoreSession};
use serde_json::Value;
use sqlx::{Postgres, Transaction};

use crate::row::{RouteRow, RuleEntryRow};

/// Column list for the `routes` table.
const ROUTE_COLUMNS: &str = "id, is_outbound, host_endpoint, attributes";

/// Column list for the `rule_entries` table.
const ENTRY_COLUMNS: &str = "id, expression_snapshot, operations, attributes";

pub struct PgSession {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx: Some(tx) }
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::message("session is closed"))
    }

    async fn entries_for(
        tx: &mut Transaction<'static, Postgres>,
        route_id: &str,
    ) -> Result<Vec<RuleEntryRow>, StoreError> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} FROM rule_entries WHERE route_id = $1 ORDER BY position"
        );
        sqlx::query_as::<_, RuleEntryRow>(&query)
            .bind(route_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(StoreError::backend)
    }

    /// Replace a route's child rows with `route.rule_entries`.
    async fn replace_entries(
        tx: &mut Transaction<'static, Postgres>,
        route: &Route,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM rule_entries WHERE route_id = $1")
            .bind(&route.id)
            .execute(&mut **tx)
            .await
            .map_err(StoreError::backend)?;

        for (position, entry) in route.rule_entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO rule_entries \
                    (id, route_id, position, expression_snapshot, operations, attributes) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&entry.id)
            .bind(&route.id)
            .bind(position as i32)
            .bind(&entry.expression_snapshot)
            .bind(Value::Array(entry.operations.clone()))
            .bind(Value::Object(entry.attributes.clone()))
            .execute(&mut **tx)
            .await
            .map_err(StoreError::backend)?;
        }

        Ok(())
    }
}

impl StoreSession for PgSession {
    async fn routes(&mut self) -> Result<Vec<Route>, StoreError> {
        let tx = self.tx()?;
        let query = format!("SELECT {ROUTE_COLUMNS} FROM routes ORDER BY id");
        let rows = sqlx::query_as::<_, RouteRow>(&query)
            .fetch_all(&mut **tx)
            .await
            .map_err(StoreError::backend)?;

        let mut routes = Vec::with_capacity(rows.len());
        for row in rows {
            let entries = Self::entries_for(tx, &row.id).await?;
            routes.push(row.into_route(entries));
        }
        Ok(routes)
    }

    async fn route(&mut self, id: &str) -> Result<Option<Route>, StoreError> {
        let tx = self.tx()?;
        let query = format!("SELECT {ROUTE_COLUMNS} FROM routes WHERE id = $1");
        let row = sqlx::query_as::<_, RouteRow>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(StoreError::backend)?;

        match row {
            Some(row) => {
                let entries = Self::entries_for(tx, &row.id).await?;
                Ok(Some(row.into_route(entries)))
            }
            None => Ok(None),
        }
    }

    async fn insert_route(&mut self, route: &Route) -> Result<(), StoreError> {
        let tx = self.tx()?;
        sqlx::query(
            "INSERT INTO routes (id, is_outbound, host_endpoint, attributes) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&route.id)
        .bind(route.is_outbound)
        .bind(&route.host_endpoint)
        .bind(Value::Object(route.attributes.clone()))
        .execute(&mut **tx)
        .await
        .map_err(StoreError::backend)?;

        Self::replace_entries(tx, route).await
    }

    async fn put_route(&mut self, route: &Route) -> Result<(), StoreError> {
        let tx = self.tx()?;
        sqlx::query(
            "INSERT INTO routes (id, is_outbound, host_endpoint, attributes) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET \
                is_outbound = EXCLUDED.is_outbound, \
                host_endpoint = EXCLUDED.host_endpoint, \
                attributes = EXCLUDED.attributes",
        )
        .bind(&route.id)
        .bind(route.is_outbound)
        .bind(&route.host_endpoint)
        .bind(Value::Object(route.attributes.clone()))
        .execute(&mut **tx)
        .await
        .map_err(StoreError::backend)?;

        Self::replace_entries(tx, route).await
    }

    async fn delete_route(&mut self, id: &str) -> Result<(), StoreError> {
        let tx = self.tx()?;
        // Child rows go with the route via ON DELETE CASCADE.
        sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn delete_all_routes(&mut self) -> Result<(), StoreError> {
        let tx = self.tx()?;
        sqlx::query("DELETE FROM routes")
            .execute(&mut **tx)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::message("session is closed"))?;
        tx.commit().await.map_err(StoreError::backend)
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(StoreError::backend),
            // A failed commit already consumed the transaction; a second
            // rollback attempt has nothing left to discard.
            None => Ok(()),
        }
    }
}
