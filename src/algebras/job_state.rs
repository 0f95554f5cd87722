//! Run-scoped graph store algebra.
//!
//! Steps never talk to each other directly. Everything one step produces and
//! another consumes travels through the [`JobState`]: entities and
//! relationships in the key index, single computed values in the scratch map.

use crate::error::AppError;
use crate::model::{Entity, Relationship};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Everything a run produced, in a form the output layer can serialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

/// Key-addressable store of the graph being built during one run.
///
/// # Laws
///
/// All implementations must satisfy these laws:
///
/// - **L1 (Key Visibility)**: An added entity is immediately visible by key.
///   ```text
///   add_entity(e) == Ok(())
///   has_key(e.key) == true
///   ```
///
/// - **L2 (Idempotent Re-assert)**: Adding an identical entity twice succeeds
///   and stores it once; adding different data under the same key fails.
///   ```text
///   add_entity(e) == Ok(());  add_entity(e) == Ok(())
///   add_entity(e') == Err(DuplicateEntity)   where e'.key == e.key, e' != e
///   ```
///
/// - **L3 (Referential Integrity)**: A relationship is accepted only when both
///   endpoints are stored entities. Relationship keys never count as endpoints.
///   ```text
///   has_entity(r.from) && has_entity(r.to)  <=>  add_relationship(r) is not DanglingReference
///   ```
///
/// - **L4 (Scratch Round-Trip)**: `get_data` returns the last `set_data` value.
///   ```text
///   set_data(k, v);  get_data(k) == Some(v)
///   ```
///
/// - **L5 (Type Iteration)**: `iterate_entities(t, f)` calls `f` exactly once
///   for each stored entity of type `t`, in insertion order.
///
/// This trait is **object-safe** and can be used as `dyn JobState`.
#[async_trait]
pub trait JobState: Send + Sync {
    /// Stores an entity under its key.
    async fn add_entity(&self, entity: Entity) -> Result<(), AppError>;

    /// Stores a relationship under its key.
    async fn add_relationship(&self, relationship: Relationship) -> Result<(), AppError>;

    /// Stores a scratch value for later steps.
    async fn set_data(&self, key: &str, value: Value);

    /// Reads a scratch value.
    async fn get_data(&self, key: &str) -> Option<Value>;

    /// Whether an entity or relationship with this key exists.
    async fn has_key(&self, key: &str) -> bool;

    /// Whether an entity with this key exists.
    async fn has_entity(&self, key: &str) -> bool;

    /// Looks up an entity by key.
    async fn find_entity(&self, key: &str) -> Option<Entity>;

    /// Calls `on_each` for every entity of `entity_type`.
    ///
    /// Iteration stops at the first error, which is returned.
    async fn iterate_entities(
        &self,
        entity_type: &str,
        on_each: &mut (dyn for<'e> FnMut(&'e Entity) -> Result<(), AppError> + Send),
    ) -> Result<(), AppError>;

    /// Copies out everything stored so far.
    async fn snapshot(&self) -> GraphSnapshot;
}

/// Convenience methods built from the [`JobState`] operations.
#[async_trait]
pub trait JobStateExt: JobState {
    /// Collects the keys of every entity of `entity_type`.
    async fn entity_keys(&self, entity_type: &str) -> Result<Vec<String>, AppError> {
        let mut keys = Vec::new();
        self.iterate_entities(entity_type, &mut |entity| {
            keys.push(entity.key().to_string());
            Ok(())
        })
        .await?;
        Ok(keys)
    }

    /// Collects every entity of `entity_type`.
    async fn entities_of_type(&self, entity_type: &str) -> Result<Vec<Entity>, AppError> {
        let mut entities = Vec::new();
        self.iterate_entities(entity_type, &mut |entity| {
            entities.push(entity.clone());
            Ok(())
        })
        .await?;
        Ok(entities)
    }

    /// Reads an entity previously published to the scratch map by `set_entity_data`.
    async fn get_entity_data(&self, key: &str) -> Result<Option<Entity>, AppError> {
        match self.get_data(key).await {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Publishes an entity to the scratch map under `key`.
    async fn set_entity_data(&self, key: &str, entity: &Entity) -> Result<(), AppError> {
        let value = serde_json::to_value(entity)?;
        self.set_data(key, value).await;
        Ok(())
    }
}

// Blanket implementation for all JobState
#[async_trait]
impl<T: JobState + ?Sized> JobStateExt for T {}
