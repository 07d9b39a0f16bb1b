//! Validation cascade for routes and their rule entries.
//!
//! Rejects invalid configuration before anything is persisted. Fail-fast:
//! the first failing check aborts validation for the whole route. Never
//! mutates what it inspects.

use regex::Regex;

use crate::error::RouteError;
use crate::expression::ExpressionBuilder;
use crate::pipeline::PipelineBuilder;
use crate::route::{Route, RuleEntry};

/// Validate a single rule entry against both compilers.
pub fn check_rule_entry<E, P>(
    entry: &RuleEntry,
    expressions: &E,
    pipelines: &P,
) -> Result<(), RouteError>
where
    E: ExpressionBuilder + ?Sized,
    P: PipelineBuilder + ?Sized,
{
    if let Some(snapshot) = &entry.expression_snapshot {
        expressions.build(snapshot).map_err(|err| {
            RouteError::InvalidRouteConfiguration(format!("Invalid expression: {err}"))
        })?;
    }

    if entry.has_operations() {
        if let Err(err) = pipelines.build(entry) {
            tracing::error!(entry_id = %entry.id, error = %err, "pipeline construction failed");
            return Err(RouteError::InvalidRouteConfiguration(format!(
                "Invalid operations: {err}"
            )));
        }
    }

    Ok(())
}

/// Validate a route and every rule entry it owns, in collection order.
pub fn check_route<E, P>(route: &Route, expressions: &E, pipelines: &P) -> Result<(), RouteError>
where
    E: ExpressionBuilder + ?Sized,
    P: PipelineBuilder + ?Sized,
{
    if route.is_outbound {
        match &route.host_endpoint {
            Some(pattern) => {
                Regex::new(pattern).map_err(|err| {
                    RouteError::InvalidRouteConfiguration(format!(
                        "Invalid host pattern {pattern}: {err}"
                    ))
                })?;
            }
            None => {
                return Err(RouteError::InvalidRouteConfiguration(
                    "Invalid host pattern: outbound route has none".to_string(),
                ));
            }
        }
    }

    for entry in &route.rule_entries {
        check_rule_entry(entry, expressions, pipelines)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::{json, Value};

    use crate::expression::{CompiledExpression, ExpressionError};
    use crate::pipeline::{BoxError, CompiledPipeline};
    use crate::route::RouteData;

    /// Accepts object snapshots, rejects everything else.
    struct StubExpressions;

    struct MatchAll;

    impl CompiledExpression for MatchAll {
        fn matches(&self, _message: &Value) -> bool {
            true
        }
    }

    impl ExpressionBuilder for StubExpressions {
        fn build(&self, snapshot: &Value) -> Result<Box<dyn CompiledExpression>, ExpressionError> {
            if snapshot.is_object() {
                Ok(Box::new(MatchAll))
            } else {
                Err(ExpressionError::new("unexpected token"))
            }
        }
    }

    /// Accepts operation lists whose elements are all objects.
    struct StubPipelines;

    struct NoopPipeline;

    impl CompiledPipeline for NoopPipeline {
        fn apply(&self, message: Value) -> Result<Value, BoxError> {
            Ok(message)
        }
    }

    impl PipelineBuilder for StubPipelines {
        fn build(&self, entry: &RuleEntry) -> Result<Box<dyn CompiledPipeline>, BoxError> {
            if entry.operations.iter().all(Value::is_object) {
                Ok(Box::new(NoopPipeline))
            } else {
                Err("unsupported operation".into())
            }
        }
    }

    fn route(value: Value) -> Route {
        let data: RouteData = serde_json::from_value(value).unwrap();
        Route::from_data(data)
    }

    fn check(route: &Route) -> Result<(), RouteError> {
        check_route(route, &StubExpressions, &StubPipelines)
    }

    // -- host pattern ---------------------------------------------------------

    #[test]
    fn outbound_with_valid_pattern_passes() {
        assert!(check(&route(json!({"is_outbound": true, "host_endpoint": "api\\..*"}))).is_ok());
    }

    #[test]
    fn outbound_with_unbalanced_paren_rejected() {
        let err = check(&route(json!({"is_outbound": true, "host_endpoint": "("}))).unwrap_err();
        assert_matches!(
            err,
            RouteError::InvalidRouteConfiguration(msg) if msg.starts_with("Invalid host pattern (")
        );
    }

    #[test]
    fn outbound_without_pattern_rejected() {
        let err = check(&route(json!({"is_outbound": true}))).unwrap_err();
        assert_matches!(
            err,
            RouteError::InvalidRouteConfiguration(msg) if msg.starts_with("Invalid host pattern")
        );
    }

    #[test]
    fn inbound_ignores_host_pattern() {
        // The pattern is meaningless for inbound routes and is not compiled.
        assert!(check(&route(json!({"is_outbound": false, "host_endpoint": "("}))).is_ok());
    }

    // -- rule entries ---------------------------------------------------------

    #[test]
    fn malformed_expression_rejected_with_context() {
        let err = check(&route(json!({
            "rule_entries": [{"expression_snapshot": "not a tree"}],
        })))
        .unwrap_err();
        assert_matches!(
            err,
            RouteError::InvalidRouteConfiguration(msg)
                if msg == "Invalid expression: unexpected token"
        );
    }

    #[test]
    fn failing_pipeline_rejected_with_context() {
        let err = check(&route(json!({
            "rule_entries": [{"operations": ["bogus"]}],
        })))
        .unwrap_err();
        assert_matches!(
            err,
            RouteError::InvalidRouteConfiguration(msg)
                if msg == "Invalid operations: unsupported operation"
        );
    }

    #[test]
    fn entry_without_expression_or_operations_passes() {
        assert!(check(&route(json!({"rule_entries": [{"label": "noop"}]}))).is_ok());
    }

    #[test]
    fn first_failing_entry_wins() {
        // Both entries are invalid; the first one's context is reported.
        let err = check(&route(json!({
            "rule_entries": [
                {"expression_snapshot": 42},
                {"operations": ["bogus"]},
            ],
        })))
        .unwrap_err();
        assert_matches!(
            err,
            RouteError::InvalidRouteConfiguration(msg) if msg.starts_with("Invalid expression")
        );
    }

    #[test]
    fn valid_entries_pass() {
        assert!(check(&route(json!({
            "rule_entries": [
                {"expression_snapshot": {"op": "eq"}},
                {"operations": [{"op": "mask"}]},
            ],
        })))
        .is_ok());
    }
}
