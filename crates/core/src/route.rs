//! Route and rule-entry models with their partial-update DTOs.
//!
//! A [`Route`] owns an ordered collection of [`RuleEntry`] values; the order
//! is the evaluation order. Fields this core does not interpret (display
//! names, tags, whatever the outer layers attach) ride along in the
//! flattened `attributes` map so they survive store round trips untouched.
//!
//! [`RouteData`] and [`RuleEntryData`] are the incoming partial records.
//! Every field is optional; `RouteData::rule_entries` distinguishes "key
//! absent, leave the collection alone" (`None`) from "replace the collection
//! with this list" (`Some`, possibly empty).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A routing configuration aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Stable identity, never overwritten by merges.
    pub id: String,
    /// Direction of traffic this route applies to.
    #[serde(default)]
    pub is_outbound: bool,
    /// Host-matching regular expression. Required when outbound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_endpoint: Option<String>,
    /// Owned rule entries, in evaluation order.
    #[serde(default)]
    pub rule_entries: Vec<RuleEntry>,
    /// Attributes opaque to this core.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A single match-and-act rule owned by exactly one [`Route`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Stable identity; the reconciliation key.
    pub id: String,
    /// Serialized match expression, compiled by the expression builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_snapshot: Option<Value>,
    /// Ordered transformation operations, compiled by the pipeline builder.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<Value>,
    /// Attributes opaque to this core.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Partial route record, as received from the outer API layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RouteData {
    pub id: Option<String>,
    pub is_outbound: Option<bool>,
    pub host_endpoint: Option<String>,
    /// `None` leaves the existing collection untouched; `Some` replaces it
    /// through reconciliation, an empty list removing every entry. A payload
    /// carrying the key with `null` counts as an empty list, not as absence.
    #[serde(default, deserialize_with = "entries_null_as_empty")]
    pub rule_entries: Option<Vec<RuleEntryData>>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

fn entries_null_as_empty<'de, D>(deserializer: D) -> Result<Option<Vec<RuleEntryData>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries = Option::<Vec<RuleEntryData>>::deserialize(deserializer)?;
    Ok(Some(entries.unwrap_or_default()))
}

/// Partial rule-entry record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuleEntryData {
    pub id: Option<String>,
    pub expression_snapshot: Option<Value>,
    pub operations: Option<Vec<Value>>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Route {
    /// Build an aggregate from an incoming payload. Ids absent from the
    /// payload are assigned fresh; supplied ids are kept (imports carry
    /// their own).
    pub fn from_data(data: RouteData) -> Route {
        Route {
            id: data.id.unwrap_or_else(new_id),
            is_outbound: data.is_outbound.unwrap_or(false),
            host_endpoint: data.host_endpoint,
            rule_entries: data
                .rule_entries
                .unwrap_or_default()
                .into_iter()
                .map(RuleEntry::from_data)
                .collect(),
            attributes: data.attributes,
        }
    }

    /// Merge supplied fields onto this route. The id is never overwritten
    /// and the rule-entry collection is not touched here; reconciliation
    /// owns it.
    pub fn apply(&mut self, data: &RouteData) {
        if let Some(is_outbound) = data.is_outbound {
            self.is_outbound = is_outbound;
        }
        if let Some(host_endpoint) = &data.host_endpoint {
            self.host_endpoint = Some(host_endpoint.clone());
        }
        for (key, value) in &data.attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
    }
}

impl RuleEntry {
    /// Build an entry from an incoming payload, assigning a fresh id when
    /// none is supplied.
    pub fn from_data(data: RuleEntryData) -> RuleEntry {
        RuleEntry {
            id: data.id.unwrap_or_else(new_id),
            expression_snapshot: data.expression_snapshot,
            operations: data.operations.unwrap_or_default(),
            attributes: data.attributes,
        }
    }

    /// Merge supplied fields onto this entry. The id is never overwritten.
    pub fn apply(&mut self, data: &RuleEntryData) {
        if let Some(snapshot) = &data.expression_snapshot {
            self.expression_snapshot = Some(snapshot.clone());
        }
        if let Some(operations) = &data.operations {
            self.operations = operations.clone();
        }
        for (key, value) in &data.attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
    }

    /// Whether this entry carries a transformation pipeline.
    pub fn has_operations(&self) -> bool {
        !self.operations.is_empty()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
