// src/model/mod.rs
//! Graph vocabulary produced by the pipeline.
//!
//! An [`Entity`] is a node representing one upstream resource; a
//! [`Relationship`] is a directed, typed edge between two entity keys.
//! Both carry a flat [`PropertyMap`] whose values are primitives or arrays
//! of primitives, the shape a graph store can persist without further
//! transformation.

mod entity;
mod relationship;

pub use entity::{Entity, PropertyMap};
pub use relationship::{relationship_key, Relationship, RelationshipClass};

use serde_json::Value;

/// Whether a value is storable as a graph property (primitive or primitive list).
pub fn is_graph_primitive(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => true,
        Value::Array(items) => items
            .iter()
            .all(|item| !matches!(item, Value::Array(_) | Value::Object(_))),
        Value::Object(_) => false,
    }
}

/// Coerces a value into graph-property shape, serializing anything nested.
pub fn into_graph_primitive(value: Value) -> Value {
    if is_graph_primitive(&value) {
        value
    } else {
        Value::String(value.to_string())
    }
}
