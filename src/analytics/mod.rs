// src/analytics/mod.rs
//! Graph measurement for progress messages and the run report.

use crate::algebras::GraphSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

/// Entity and relationship counts of a graph, broken down by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub total_entities: usize,
    pub total_relationships: usize,
    pub entities_by_type: BTreeMap<String, usize>,
    pub relationships_by_type: BTreeMap<String, usize>,
}

/// Counts everything in a snapshot.
pub fn summarize(snapshot: &GraphSnapshot) -> GraphSummary {
    let mut summary = GraphSummary {
        total_entities: snapshot.entities.len(),
        total_relationships: snapshot.relationships.len(),
        ..GraphSummary::default()
    };

    for entity in &snapshot.entities {
        *summary
            .entities_by_type
            .entry(entity.entity_type().to_string())
            .or_default() += 1;
    }
    for relationship in &snapshot.relationships {
        *summary
            .relationships_by_type
            .entry(relationship.relationship_type().to_string())
            .or_default() += 1;
    }

    summary
}

impl GraphSummary {
    /// One line per type, largest first.
    pub fn describe(&self) -> Vec<String> {
        let mut lines: Vec<(usize, String)> = self
            .entities_by_type
            .iter()
            .map(|(t, n)| (*n, format!("{:>6}  {}", n, t)))
            .chain(
                self.relationships_by_type
                    .iter()
                    .map(|(t, n)| (*n, format!("{:>6}  {}", n, t))),
            )
            .collect();
        lines.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        lines.into_iter().map(|(_, line)| line).collect()
    }
}
