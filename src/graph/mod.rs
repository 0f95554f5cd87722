// src/graph/mod.rs
//! Relationship building: joining already-ingested entities by key.
//!
//! A link step scans every entity of one type, asks an [`EndpointExtractor`]
//! which keys sit at the other end, and emits one relationship per distinct
//! `from|class|to` triple whose endpoints both exist in the job state.

mod endpoints;

pub use endpoints::{EndpointExtractor, KeyListEndpoints, PatternEndpoints, SourceRole};

use crate::algebras::{IngestLogger, JobState, JobStateExt};
use crate::error::AppError;
use crate::model::{relationship_key, Relationship, RelationshipClass};
use std::collections::HashSet;
use std::sync::Arc;

/// Counts from one relationship build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    pub created: usize,
    /// Pairs dropped because an endpoint key is unknown.
    pub missing_endpoint: usize,
    /// Pairs dropped because the same relationship was already emitted.
    pub duplicates: usize,
}

/// What to connect: the scanned type, the verb and both endpoint types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipSpec {
    pub source_type: String,
    pub class: RelationshipClass,
    pub from_type: String,
    pub to_type: String,
}

impl RelationshipSpec {
    pub fn new(
        source_type: impl Into<String>,
        class: RelationshipClass,
        from_type: impl Into<String>,
        to_type: impl Into<String>,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            class,
            from_type: from_type.into(),
            to_type: to_type.into(),
        }
    }
}

/// Emits relationships between entities already in the job state.
pub struct RelationshipBuilder {
    job_state: Arc<dyn JobState>,
    logger: Arc<dyn IngestLogger>,
}

impl RelationshipBuilder {
    pub fn new(job_state: Arc<dyn JobState>, logger: Arc<dyn IngestLogger>) -> Self {
        Self { job_state, logger }
    }

    /// Builds every relationship described by `spec`.
    pub async fn build_relationships(
        &self,
        spec: &RelationshipSpec,
        extractor: &dyn EndpointExtractor,
    ) -> Result<BuildOutcome, AppError> {
        let role = extractor.source_role();
        let other_type = match role {
            SourceRole::From => &spec.to_type,
            SourceRole::To => &spec.from_type,
        };
        let candidates = self.job_state.entity_keys(other_type).await?;

        let mut pairs: Vec<(String, String)> = Vec::new();
        let logger = self.logger.as_ref();
        self.job_state
            .iterate_entities(&spec.source_type, &mut |source| {
                for other in extractor.extract(source, &candidates, logger) {
                    pairs.push(match role {
                        SourceRole::From => (source.key().to_string(), other),
                        SourceRole::To => (other, source.key().to_string()),
                    });
                }
                Ok(())
            })
            .await?;

        let mut outcome = BuildOutcome::default();
        let mut emitted: HashSet<String> = HashSet::new();

        for (from_key, to_key) in pairs {
            let key = relationship_key(&from_key, &spec.class, &to_key);
            if emitted.contains(&key) {
                outcome.duplicates += 1;
                continue;
            }

            if !self.job_state.has_entity(&from_key).await
                || !self.job_state.has_entity(&to_key).await
            {
                self.logger.debug(&format!(
                    "Skipping {}: endpoint not ingested",
                    key
                ));
                outcome.missing_endpoint += 1;
                continue;
            }

            let relationship = Relationship::new(
                spec.class.clone(),
                from_key,
                &spec.from_type,
                to_key,
                &spec.to_type,
            );
            self.job_state.add_relationship(relationship).await?;
            emitted.insert(key);
            outcome.created += 1;
        }

        self.logger.debug(&format!(
            "Built {} {} relationships ({} skipped for missing endpoints, {} duplicates)",
            outcome.created, spec.class, outcome.missing_endpoint, outcome.duplicates
        ));
        Ok(outcome)
    }
}
