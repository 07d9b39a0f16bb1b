//! Route repository operations.
//!
//! [`RouteManager`] orchestrates the rule reconciler and the validation
//! cascade around transactional persistence. Each operation opens one store
//! session, stages its reads and writes, and either commits or rolls back
//! before returning — [`finish`] enforces that discipline on every exit
//! path. Validation always runs before a commit is attempted, so a
//! validation failure leaves zero persisted side effects.

use crate::error::RouteError;
use crate::expression::ExpressionBuilder;
use crate::pipeline::PipelineBuilder;
use crate::reconcile::reconcile_entries;
use crate::route::{Route, RouteData, RuleEntry};
use crate::store::{RouteStore, StoreError, StoreSession};
use crate::validate;

/// Repository operations over the route collection.
///
/// Holds the storage handle and both compilers explicitly; there is no
/// ambient session state, so managers are freely shareable across tasks
/// and trivially isolated in tests.
pub struct RouteManager<S, E, P> {
    store: S,
    expressions: E,
    pipelines: P,
}

impl<S, E, P> RouteManager<S, E, P>
where
    S: RouteStore,
    E: ExpressionBuilder,
    P: PipelineBuilder,
{
    pub fn new(store: S, expressions: E, pipelines: P) -> Self {
        Self {
            store,
            expressions,
            pipelines,
        }
    }

    /// All routes, with their rule entries in evaluation order.
    pub async fn list(&self) -> Result<Vec<Route>, RouteError> {
        let mut session = self.store.session().await?;
        let result = session.routes().await.map_err(RouteError::from);
        finish(session, result).await
    }

    /// Routes filtered by directionality. The filter runs in memory over
    /// the full list rather than in the store.
    pub async fn list_by_direction(&self, is_outbound: bool) -> Result<Vec<Route>, RouteError> {
        let routes = self.list().await?;
        Ok(routes
            .into_iter()
            .filter(|route| route.is_outbound == is_outbound)
            .collect())
    }

    /// A single route by id. Absence is `Ok(None)`, not an error.
    pub async fn get(&self, id: &str) -> Result<Option<Route>, RouteError> {
        let mut session = self.store.session().await?;
        let result = session.route(id).await.map_err(RouteError::from);
        finish(session, result).await
    }

    /// Validate and persist a new route built from `data`.
    pub async fn create(&self, data: RouteData) -> Result<Route, RouteError> {
        // Validation happens before a session is even opened; an invalid
        // payload cannot leave partial state behind.
        let route = self.build_route(data)?;

        let mut session = self.store.session().await?;
        let result = session
            .insert_route(&route)
            .await
            .map_err(RouteError::from)
            .map(|()| route);
        finish(session, result).await
    }

    /// Merge `data` onto the route under `id` and persist the result.
    ///
    /// An unknown id falls through to creation under that id: the frontend
    /// imports routes through this endpoint, so update is deliberately an
    /// upsert. Rule entries are reconciled only when the payload names the
    /// `rule_entries` key; an absent key leaves the collection untouched,
    /// an empty list removes every entry.
    pub async fn update(&self, id: &str, data: RouteData) -> Result<Route, RouteError> {
        let mut session = self.store.session().await?;
        let result = self.apply_update(&mut session, id, data).await;
        finish(session, result).await
    }

    /// Remove the route under `id` together with its rule entries.
    pub async fn delete(&self, id: &str) -> Result<(), RouteError> {
        let mut session = self.store.session().await?;
        let result = match session.route(id).await {
            Ok(Some(route)) => session.delete_route(&route.id).await.map_err(RouteError::from),
            Ok(None) => Err(RouteError::EntityNotFound(id.to_string())),
            Err(err) => Err(err.into()),
        };
        finish(session, result).await
    }

    /// Atomically swap the entire route collection for `routes_data`.
    ///
    /// Every incoming route is built and validated before anything is
    /// staged; the delete-everything-insert-all swap then runs in a single
    /// session, so a failure anywhere leaves the prior set fully intact.
    pub async fn replace_all(&self, routes_data: Vec<RouteData>) -> Result<Vec<Route>, RouteError> {
        let routes = routes_data
            .into_iter()
            .map(|data| self.build_route(data))
            .collect::<Result<Vec<_>, _>>()?;

        let mut session = self.store.session().await?;
        let result = Self::stage_replace(&mut session, &routes)
            .await
            .map_err(RouteError::from);
        finish(session, result).await?;

        tracing::info!(count = routes.len(), "replaced route collection");
        Ok(routes)
    }

    /// Run the validation cascade over a route with this manager's
    /// compilers.
    pub fn check_route(&self, route: &Route) -> Result<(), RouteError> {
        validate::check_route(route, &self.expressions, &self.pipelines)
    }

    /// Run the validation cascade over a single rule entry.
    pub fn check_rule_entry(&self, entry: &RuleEntry) -> Result<(), RouteError> {
        validate::check_rule_entry(entry, &self.expressions, &self.pipelines)
    }

    /// Build and validate an aggregate from a payload without persisting it.
    fn build_route(&self, data: RouteData) -> Result<Route, RouteError> {
        let route = Route::from_data(data);
        self.check_route(&route)?;
        Ok(route)
    }

    async fn apply_update(
        &self,
        session: &mut S::Session,
        id: &str,
        mut data: RouteData,
    ) -> Result<Route, RouteError> {
        let Some(mut route) = session.route(id).await? else {
            data.id = Some(id.to_string());
            let route = self.build_route(data)?;
            session.insert_route(&route).await?;
            return Ok(route);
        };

        route.apply(&data);

        if let Some(incoming) = &data.rule_entries {
            let plan = reconcile_entries(&route.rule_entries, incoming);
            tracing::debug!(
                route_id = %route.id,
                created = plan.created.len(),
                updated = plan.updated.len(),
                removed = plan.removed.len(),
                "reconciled rule entries"
            );
            route.rule_entries = plan.entries;
        }

        self.check_route(&route)?;
        session.put_route(&route).await?;
        Ok(route)
    }

    async fn stage_replace(session: &mut S::Session, routes: &[Route]) -> Result<(), StoreError> {
        session.delete_all_routes().await?;
        for route in routes {
            session.insert_route(route).await?;
        }
        Ok(())
    }
}

/// Commit on success, roll back on failure, on every exit path. A failing
/// rollback is logged; the caller always sees the original error.
async fn finish<T, Ses>(mut session: Ses, result: Result<T, RouteError>) -> Result<T, RouteError>
where
    Ses: StoreSession,
{
    match result {
        Ok(value) => match session.commit().await {
            Ok(()) => Ok(value),
            Err(commit_err) => {
                rollback_quietly(&mut session).await;
                Err(commit_err.into())
            }
        },
        Err(err) => {
            rollback_quietly(&mut session).await;
            Err(err)
        }
    }
}

async fn rollback_quietly<Ses: StoreSession>(session: &mut Ses) {
    if let Err(err) = session.rollback().await {
        tracing::warn!(error = %err, "rollback failed after aborted operation");
    }
}
