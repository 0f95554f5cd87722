use super::into_graph_primitive;
use crate::types::ValidationError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Flat property bag of an entity or relationship, in insertion order.
pub type PropertyMap = IndexMap<String, Value>;

/// A node in the output graph representing one real-world resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "_key")]
    key: String,
    #[serde(rename = "_type")]
    entity_type: String,
    #[serde(rename = "_class")]
    class: BTreeSet<String>,
    #[serde(flatten)]
    properties: PropertyMap,
}

impl Entity {
    /// Creates an entity with no properties.
    pub fn new<I, S>(
        key: impl Into<String>,
        entity_type: impl Into<String>,
        class: I,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = key.into();
        let entity_type = entity_type.into();
        if key.trim().is_empty() {
            return Err(ValidationError::EmptyField("entity key"));
        }
        if entity_type.trim().is_empty() {
            return Err(ValidationError::EmptyField("entity type"));
        }
        let class: BTreeSet<String> = class.into_iter().map(Into::into).collect();
        if class.is_empty() {
            return Err(ValidationError::EmptyField("entity class"));
        }

        Ok(Self {
            key,
            entity_type,
            class,
            properties: PropertyMap::new(),
        })
    }

    /// Adds a property; nested values are stored as JSON text.
    ///
    /// Property names beginning with `_` are reserved for the graph envelope
    /// and are ignored.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_property(name, value);
        self
    }

    /// Adds an optional property, skipping `None`.
    pub fn with_optional_property<V: Into<Value>>(
        self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.with_property(name, value),
            None => self,
        }
    }

    /// Merges every field of a normalized property object into the entity.
    ///
    /// Properties set explicitly before this call are not overwritten.
    pub fn with_normalized(mut self, normalized: Value) -> Self {
        if let Value::Object(fields) = normalized {
            for (name, value) in fields {
                if !self.properties.contains_key(&name) {
                    self.set_property(name, value);
                }
            }
        }
        self
    }

    /// Sets a property in place, for enrichment before the entity is committed.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if name.starts_with('_') {
            log::debug!(
                "Ignoring reserved property name '{}' on entity {}",
                name,
                self.key
            );
            return;
        }
        self.properties.insert(name, into_graph_primitive(value.into()));
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn class(&self) -> &BTreeSet<String> {
        &self.class
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Looks up a single property.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Looks up a string property.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    /// Reads a property as a list of strings.
    ///
    /// A scalar string yields a one-element list; non-string elements are skipped.
    pub fn property_strings(&self, name: &str) -> Vec<String> {
        match self.properties.get(name) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}
