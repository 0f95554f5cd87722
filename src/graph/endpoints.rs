// src/graph/endpoints.rs
//! Strategies that derive relationship endpoints from a source entity.

use crate::algebras::IngestLogger;
use crate::constants::{SENTINEL_ALL, SENTINEL_NONE};
use crate::model::Entity;
use regex::Regex;

/// Which end of the relationship the scanned source entity sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    /// The source entity is the `from` endpoint.
    From,
    /// The source entity is the `to` endpoint.
    To,
}

/// Derives the keys at the other end of a relationship from one source entity.
///
/// `candidates` holds the keys of every entity of the other endpoint's type
/// present when the build started.
pub trait EndpointExtractor: Send + Sync {
    fn source_role(&self) -> SourceRole {
        SourceRole::From
    }

    fn extract(
        &self,
        source: &Entity,
        candidates: &[String],
        logger: &dyn IngestLogger,
    ) -> Vec<String>;
}

/// Reads endpoint keys from a list property that may hold sentinels.
///
/// `"All"` fans out to every candidate; `"None"` ends the list, so entries
/// after it are never read.
#[derive(Debug, Clone)]
pub struct KeyListEndpoints {
    property: String,
    role: SourceRole,
}

impl KeyListEndpoints {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            role: SourceRole::From,
        }
    }

    pub fn with_role(mut self, role: SourceRole) -> Self {
        self.role = role;
        self
    }
}

impl EndpointExtractor for KeyListEndpoints {
    fn source_role(&self) -> SourceRole {
        self.role
    }

    fn extract(
        &self,
        source: &Entity,
        candidates: &[String],
        _logger: &dyn IngestLogger,
    ) -> Vec<String> {
        let mut keys = Vec::new();
        for entry in source.property_strings(&self.property) {
            match entry.as_str() {
                SENTINEL_NONE => break,
                SENTINEL_ALL => keys.extend(candidates.iter().cloned()),
                _ => keys.push(entry),
            }
        }
        keys
    }
}

/// Extracts one endpoint key from a text property with a regex.
///
/// The first capture group is the key. A missing property or a non-matching
/// value yields nothing and a debug diagnostic.
#[derive(Debug, Clone)]
pub struct PatternEndpoints {
    property: String,
    pattern: Regex,
    role: SourceRole,
}

impl PatternEndpoints {
    pub fn new(property: impl Into<String>, pattern: Regex) -> Self {
        Self {
            property: property.into(),
            pattern,
            role: SourceRole::From,
        }
    }

    pub fn with_role(mut self, role: SourceRole) -> Self {
        self.role = role;
        self
    }
}

impl EndpointExtractor for PatternEndpoints {
    fn source_role(&self) -> SourceRole {
        self.role
    }

    fn extract(
        &self,
        source: &Entity,
        _candidates: &[String],
        logger: &dyn IngestLogger,
    ) -> Vec<String> {
        let Some(text) = source.property_str(&self.property) else {
            logger.debug(&format!(
                "Entity {} has no '{}' to extract an endpoint from",
                source.key(),
                self.property
            ));
            return Vec::new();
        };

        match self
            .pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
        {
            Some(key) => vec![key.as_str().to_string()],
            None => {
                logger.debug(&format!(
                    "'{}' of entity {} does not match {}; skipping",
                    self.property,
                    source.key(),
                    self.pattern.as_str()
                ));
                Vec::new()
            }
        }
    }
}
