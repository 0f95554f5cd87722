use super::entity::PropertyMap;
use super::into_graph_primitive;
use crate::constants::RELATIONSHIP_KEY_SEPARATOR;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The verb of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum RelationshipClass {
    Has,
    Assigned,
    Contains,
    Is,
    Created,
    Uses,
    Other(String),
}

impl RelationshipClass {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Has => "HAS",
            Self::Assigned => "ASSIGNED",
            Self::Contains => "CONTAINS",
            Self::Is => "IS",
            Self::Created => "CREATED",
            Self::Uses => "USES",
            Self::Other(verb) => verb,
        }
    }
}

impl From<String> for RelationshipClass {
    fn from(verb: String) -> Self {
        match verb.to_ascii_uppercase().as_str() {
            "HAS" => Self::Has,
            "ASSIGNED" => Self::Assigned,
            "CONTAINS" => Self::Contains,
            "IS" => Self::Is,
            "CREATED" => Self::Created,
            "USES" => Self::Uses,
            _ => Self::Other(verb.to_ascii_uppercase()),
        }
    }
}

impl From<RelationshipClass> for String {
    fn from(class: RelationshipClass) -> Self {
        class.as_str().to_string()
    }
}

impl fmt::Display for RelationshipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds the canonical key of the edge `from --class--> to`.
pub fn relationship_key(from_key: &str, class: &RelationshipClass, to_key: &str) -> String {
    format!(
        "{from}{sep}{verb}{sep}{to}",
        from = from_key,
        verb = class.as_str().to_ascii_lowercase(),
        to = to_key,
        sep = RELATIONSHIP_KEY_SEPARATOR
    )
}

/// A directed, typed edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "_key")]
    key: String,
    #[serde(rename = "_type")]
    relationship_type: String,
    #[serde(rename = "_class")]
    class: RelationshipClass,
    #[serde(rename = "_fromEntityKey")]
    from_key: String,
    #[serde(rename = "_toEntityKey")]
    to_key: String,
    #[serde(rename = "_fromEntityType")]
    from_type: String,
    #[serde(rename = "_toEntityType")]
    to_type: String,
    #[serde(flatten)]
    properties: PropertyMap,
}

impl Relationship {
    /// Creates the edge `from --class--> to`.
    ///
    /// The relationship type is derived as `{from_type}_{verb}_{to_type}`.
    pub fn new(
        class: RelationshipClass,
        from_key: impl Into<String>,
        from_type: impl Into<String>,
        to_key: impl Into<String>,
        to_type: impl Into<String>,
    ) -> Self {
        let from_key = from_key.into();
        let to_key = to_key.into();
        let from_type = from_type.into();
        let to_type = to_type.into();
        let relationship_type = format!(
            "{}_{}_{}",
            from_type,
            class.as_str().to_ascii_lowercase(),
            to_type
        );

        Self {
            key: relationship_key(&from_key, &class, &to_key),
            relationship_type,
            class,
            from_key,
            to_key,
            from_type,
            to_type,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .insert(name.into(), into_graph_primitive(value.into()));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn relationship_type(&self) -> &str {
        &self.relationship_type
    }

    pub fn class(&self) -> &RelationshipClass {
        &self.class
    }

    pub fn from_key(&self) -> &str {
        &self.from_key
    }

    pub fn from_type(&self) -> &str {
        &self.from_type
    }

    pub fn to_key(&self) -> &str {
        &self.to_key
    }

    pub fn to_type(&self) -> &str {
        &self.to_type
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }
}
