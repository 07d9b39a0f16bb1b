//! Identity-keyed reconciliation of a route's rule-entry collection.
//!
//! Diffs the current owned collection against an incoming partial list and
//! produces the new authoritative collection plus the create/update/delete
//! classification. Pure over value records: inputs are never mutated, and
//! the caller applies the plan as a single replace of the owner's child
//! collection.

use std::collections::HashSet;

use crate::route::{RuleEntry, RuleEntryData};

/// Outcome of reconciling a rule-entry collection against a partial list.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    /// The new authoritative collection, in incoming order. This order is
    /// the new evaluation order; any prior order not reflected in the
    /// incoming list is discarded.
    pub entries: Vec<RuleEntry>,
    /// Ids of entries built fresh from incoming records.
    pub created: Vec<String>,
    /// Ids of existing entries merged in place with incoming fields.
    pub updated: Vec<String>,
    /// Ids of prior entries absent from the new collection, to be removed.
    pub removed: Vec<String>,
}

/// Reconcile `current` against `incoming`.
///
/// An incoming record whose id matches a current entry yields that entry
/// with the incoming fields merged on (the id itself is never part of the
/// merge). A record with no id, or an id matching nothing, yields a brand
/// new entry; supplied-but-unmatched ids are kept, since imports carry
/// their own keys. Prior entries whose id does not appear in the resulting
/// collection land in `removed`.
pub fn reconcile_entries(current: &[RuleEntry], incoming: &[RuleEntryData]) -> ReconcilePlan {
    let mut entries = Vec::with_capacity(incoming.len());
    let mut created = Vec::new();
    let mut updated = Vec::new();

    for data in incoming {
        let existing = data
            .id
            .as_deref()
            .and_then(|id| current.iter().find(|entry| entry.id == id));
        let entry = match existing {
            Some(entry) => {
                let mut merged = entry.clone();
                merged.apply(data);
                updated.push(merged.id.clone());
                merged
            }
            None => {
                let entry = RuleEntry::from_data(data.clone());
                created.push(entry.id.clone());
                entry
            }
        };
        entries.push(entry);
    }

    let target_ids: HashSet<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
    let removed = current
        .iter()
        .filter(|entry| !target_ids.contains(entry.id.as_str()))
        .map(|entry| entry.id.clone())
        .collect();

    ReconcilePlan {
        entries,
        created,
        updated,
        removed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
