// src/interpreters/in_memory_state.rs
//! Sharded in-process [`JobState`].
//!
//! Concurrent steps write into the same run state. Every map is a `DashMap`,
//! so writers to different keys never contend on a single lock, and the
//! duplicate check and insert of one key happen under the same shard guard.

use crate::algebras::{GraphSnapshot, JobState};
use crate::error::AppError;
use crate::model::{Entity, Relationship};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

/// Run state held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryJobState {
    entities: DashMap<String, Entity>,
    relationships: DashMap<String, Relationship>,
    /// Entity type -> keys in insertion order.
    type_index: DashMap<String, Vec<String>>,
    data: DashMap<String, Value>,
}

impl InMemoryJobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }
}

#[async_trait]
impl JobState for InMemoryJobState {
    async fn add_entity(&self, entity: Entity) -> Result<(), AppError> {
        match self.entities.entry(entity.key().to_string()) {
            Entry::Occupied(existing) => {
                if existing.get() == &entity {
                    log::debug!("Entity {} re-asserted with identical data", entity.key());
                    Ok(())
                } else {
                    Err(AppError::DuplicateEntity {
                        key: entity.key().to_string(),
                    })
                }
            }
            Entry::Vacant(slot) => {
                self.type_index
                    .entry(entity.entity_type().to_string())
                    .or_default()
                    .push(entity.key().to_string());
                slot.insert(entity);
                Ok(())
            }
        }
    }

    async fn add_relationship(&self, relationship: Relationship) -> Result<(), AppError> {
        for endpoint in [relationship.from_key(), relationship.to_key()] {
            if !self.entities.contains_key(endpoint) {
                return Err(AppError::DanglingReference {
                    key: endpoint.to_string(),
                });
            }
        }

        match self.relationships.entry(relationship.key().to_string()) {
            Entry::Occupied(existing) => {
                if existing.get() == &relationship {
                    Ok(())
                } else {
                    Err(AppError::DuplicateRelationship {
                        key: relationship.key().to_string(),
                    })
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(relationship);
                Ok(())
            }
        }
    }

    async fn set_data(&self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    async fn get_data(&self, key: &str) -> Option<Value> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    async fn has_key(&self, key: &str) -> bool {
        self.entities.contains_key(key) || self.relationships.contains_key(key)
    }

    async fn has_entity(&self, key: &str) -> bool {
        self.entities.contains_key(key)
    }

    async fn find_entity(&self, key: &str) -> Option<Entity> {
        self.entities.get(key).map(|entry| entry.value().clone())
    }

    async fn iterate_entities(
        &self,
        entity_type: &str,
        on_each: &mut (dyn for<'e> FnMut(&'e Entity) -> Result<(), AppError> + Send),
    ) -> Result<(), AppError> {
        // Copy the key list so no shard guard is held while the callback runs.
        let keys = match self.type_index.get(entity_type) {
            Some(keys) => keys.value().clone(),
            None => return Ok(()),
        };

        for key in keys {
            let entity = match self.entities.get(&key) {
                Some(entry) => entry.value().clone(),
                None => continue,
            };
            on_each(&entity)?;
        }
        Ok(())
    }

    async fn snapshot(&self) -> GraphSnapshot {
        let mut entities: Vec<Entity> = self
            .entities
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entities.sort_by(|a, b| a.key().cmp(b.key()));

        let mut relationships: Vec<Relationship> = self
            .relationships
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        relationships.sort_by(|a, b| a.key().cmp(b.key()));

        GraphSnapshot {
            entities,
            relationships,
        }
    }
}
