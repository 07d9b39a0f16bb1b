//! Row structs matching the `routes` and `rule_entries` tables.

use courier_core::route::{Route, RuleEntry};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// A row from the `routes` table.
#[derive(Debug, Clone, FromRow)]
pub struct RouteRow {
    pub id: String,
    pub is_outbound: bool,
    pub host_endpoint: Option<String>,
    pub attributes: Value,
}

/// A row from the `rule_entries` table, already ordered by position.
#[derive(Debug, Clone, FromRow)]
pub struct RuleEntryRow {
    pub id: String,
    pub expression_snapshot: Option<Value>,
    pub operations: Value,
    pub attributes: Value,
}

impl RouteRow {
    /// Assemble the aggregate from its row and its ordered entry rows.
    pub fn into_route(self, entries: Vec<RuleEntryRow>) -> Route {
        Route {
            id: self.id,
            is_outbound: self.is_outbound,
            host_endpoint: self.host_endpoint,
            rule_entries: entries.into_iter().map(RuleEntryRow::into_entry).collect(),
            attributes: object(self.attributes),
        }
    }
}

impl RuleEntryRow {
    pub fn into_entry(self) -> RuleEntry {
        RuleEntry {
            id: self.id,
            expression_snapshot: self.expression_snapshot,
            operations: array(self.operations),
            attributes: object(self.attributes),
        }
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn route_row_assembles_aggregate_in_entry_order() {
        let row = RouteRow {
            id: "rt-1".to_string(),
            is_outbound: true,
            host_endpoint: Some("api\\..*".to_string()),
            attributes: json!({"name": "prod relay"}),
        };
        let entries = vec![
            RuleEntryRow {
                id: "fl-1".to_string(),
                expression_snapshot: Some(json!({"op": "eq"})),
                operations: json!([]),
                attributes: json!({}),
            },
            RuleEntryRow {
                id: "fl-2".to_string(),
                expression_snapshot: None,
                operations: json!([{"op": "mask"}]),
                attributes: json!({"label": "mask emails"}),
            },
        ];

        let route = row.into_route(entries);

        assert_eq!(route.id, "rt-1");
        assert!(route.is_outbound);
        assert_eq!(route.attributes["name"], json!("prod relay"));
        assert_eq!(route.rule_entries.len(), 2);
        assert_eq!(route.rule_entries[0].id, "fl-1");
        assert!(!route.rule_entries[0].has_operations());
        assert_eq!(route.rule_entries[1].id, "fl-2");
        assert!(route.rule_entries[1].has_operations());
    }

    #[test]
    fn non_object_attributes_collapse_to_empty() {
        let row = RouteRow {
            id: "rt-1".to_string(),
            is_outbound: false,
            host_endpoint: None,
            attributes: Value::Null,
        };
        let route = row.into_route(Vec::new());
        assert!(route.attributes.is_empty());
    }
}
