use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Bearer token used to authenticate against the inventory API.
///
/// Token acquisition happens outside this crate; the pipeline only carries
/// the opaque value and never prints it in full.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new access token with validation
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        let trimmed = token.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::InvalidAccessToken {
                reason: "token cannot be empty".to_string(),
            });
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidAccessToken {
                reason: "token cannot contain whitespace".to_string(),
            });
        }

        if trimmed.len() < 16 {
            return Err(ValidationError::InvalidAccessToken {
                reason: "token is too short".to_string(),
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the token as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Redact token in display
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "{}...", prefix)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({})", self)
    }
}

/// Base address of the inventory API. Always ends with `/` so relative
/// locators join beneath it instead of replacing its last segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(Url);

impl Serialize for BaseUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BaseUrl::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl BaseUrl {
    /// Parses and validates an http(s) base URL.
    pub fn parse(url: &str) -> Result<Self, ValidationError> {
        let mut parsed = Url::parse(url.trim()).map_err(|e| ValidationError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: "Only HTTP and HTTPS URLs are supported".to_string(),
            });
        }

        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: "Base URL cannot carry a query or fragment".to_string(),
            });
        }

        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        Ok(Self(parsed))
    }

    /// Get the inner URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Get the URL as a string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_rejects_blank_and_short_values() {
        assert!(AccessToken::new("").is_err());
        assert!(AccessToken::new("   ").is_err());
        assert!(AccessToken::new("short").is_err());
        assert!(AccessToken::new("has a space in the middle").is_err());
        assert!(AccessToken::new("eyJ0eXAiOiJKV1QiLCJhbGciOi").is_ok());
    }

    #[test]
    fn access_token_display_is_redacted() {
        let token = AccessToken::new("eyJ0eXAiOiJKV1QiLCJhbGciOi").unwrap();
        assert_eq!(token.to_string(), "eyJ0eX...");
        assert!(!format!("{:?}", token).contains("KV1Q"));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = BaseUrl::parse("https://inventory.example.com/v1.0").unwrap();
        assert_eq!(url.as_str(), "https://inventory.example.com/v1.0/");
        assert_eq!(
            url.as_url().join("users").unwrap().as_str(),
            "https://inventory.example.com/v1.0/users"
        );
    }

    #[test]
    fn base_url_rejects_other_schemes_and_queries() {
        assert!(BaseUrl::parse("ftp://inventory.example.com").is_err());
        assert!(BaseUrl::parse("https://inventory.example.com/?x=1").is_err());
        assert!(BaseUrl::parse("not a url").is_err());
    }
}
