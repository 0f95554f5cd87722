use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

static STEP_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[-_][a-z0-9]+)*$")
        .expect("Failed to compile step id regex - this is a bug in the code")
});

/// Identifier of one pipeline step, e.g. `fetch-users`.
///
/// Lowercase alphanumeric words joined by `-` or `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(String);

impl StepId {
    /// Parses and validates a step id.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField("step id"));
        }
        if !STEP_ID_REGEX.is_match(trimmed) {
            return Err(ValidationError::InvalidStepId {
                id: input.to_string(),
                reason: "expected lowercase words joined by '-' or '_'".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Creates a step id from a literal known to be valid.
    ///
    /// Used for statically declared step tables; panics on an invalid literal,
    /// which is a programming error in the table itself.
    pub fn from_static(id: &'static str) -> Self {
        match Self::parse(id) {
            Ok(step_id) => step_id,
            Err(e) => panic!("invalid static step id '{}': {}", id, e),
        }
    }

    /// Get the ID as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for StepId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StepId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StepId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        assert_eq!(StepId::parse("fetch-users").unwrap().as_str(), "fetch-users");
        assert_eq!(StepId::parse(" build_links ").unwrap().as_str(), "build_links");
        assert!(StepId::parse("a").is_ok());
    }

    #[test]
    fn test_parse_invalid_ids() {
        assert!(matches!(
            StepId::parse(""),
            Err(ValidationError::EmptyField(_))
        ));
        assert!(StepId::parse("Fetch-Users").is_err());
        assert!(StepId::parse("fetch--users").is_err());
        assert!(StepId::parse("-fetch").is_err());
        assert!(StepId::parse("fetch users").is_err());
    }

    #[test]
    #[should_panic(expected = "invalid static step id")]
    fn test_from_static_panics_on_bad_literal() {
        StepId::from_static("Not Valid");
    }
}
