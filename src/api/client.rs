// src/api/client.rs
//! HTTP transport for the inventory API.
//!
//! A thin wrapper around reqwest: authentication, address resolution and
//! query shaping. Pagination and retry policy live in the resource client.

use super::{parser, ListingShape, PageRequest, ResourcePage, ShapingOptions, Transport};
use crate::constants::API_VERSION_PARAM;
use crate::error::AppError;
use crate::types::{AccessToken, BaseUrl};
use reqwest::{header, Client};
use std::time::Duration;
use url::Url;

/// [`Transport`] over HTTPS with bearer authentication.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: BaseUrl,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport for `base_url` authenticated with `token`.
    pub fn new(
        token: &AccessToken,
        base_url: BaseUrl,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(token)?)
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            request_timeout,
        })
    }

    /// Creates the default headers for API requests.
    fn create_headers(token: &AccessToken) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", token.as_str());
        let mut auth_value = header::HeaderValue::from_str(&auth_header).map_err(|e| {
            AppError::MissingConfiguration(format!("Invalid API token format: {}", e))
        })?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);

        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// Resolves a page request into the absolute URL to fetch.
    ///
    /// First requests are joined onto the base URL and shaped; continuation
    /// cursors are used exactly as the API returned them.
    pub fn resolve(&self, request: &PageRequest<'_>) -> Result<Url, AppError> {
        match request {
            PageRequest::First { locator, shaping } => {
                let mut url = self
                    .base_url
                    .as_url()
                    .join(locator.trim_start_matches('/'))
                    .map_err(|e| AppError::InvalidLocator {
                        locator: locator.to_string(),
                        reason: e.to_string(),
                    })?;
                apply_shaping(&mut url, shaping);
                Ok(url)
            }
            PageRequest::Continuation(cursor) => {
                Url::parse(cursor.as_str()).map_err(|e| AppError::InvalidLocator {
                    locator: cursor.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn apply_shaping(url: &mut Url, shaping: &ShapingOptions) {
    if shaping.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    if !shaping.select.is_empty() {
        query.append_pair("$select", &shaping.select.join(","));
    }
    if let Some(expand) = &shaping.expand {
        query.append_pair("$expand", expand);
    }
    if let Some(version) = &shaping.alternate_api_version {
        query.append_pair(API_VERSION_PARAM, version);
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn fetch_page(
        &self,
        request: PageRequest<'_>,
        shape: ListingShape,
    ) -> Result<ResourcePage, AppError> {
        let url = self.resolve(&request)?;
        let locator = request.address();
        log::debug!("GET {}", url);

        let timed_out = |e: reqwest::Error| {
            if e.is_timeout() {
                AppError::Timeout {
                    locator: locator.to_string(),
                    seconds: self.request_timeout.as_secs(),
                }
            } else {
                AppError::NetworkFailure(e)
            }
        };

        let response = self.client.get(url).send().await.map_err(timed_out)?;
        let status = response.status();
        let body = response.text().await.map_err(timed_out)?;

        if status.is_success() {
            parser::parse_resource_page(&body, shape, locator)
        } else {
            log::debug!("GET {} returned HTTP {}", locator, status);
            Err(parser::parse_error_response(&body, status.as_u16(), locator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PageCursor;

    fn transport() -> HttpTransport {
        HttpTransport::new(
            &AccessToken::new("0123456789abcdef0123").unwrap(),
            BaseUrl::parse("https://api.example.com/v1.0").unwrap(),
            Duration::from_secs(5),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn first_request_is_joined_and_shaped() {
        let shaping = ShapingOptions::new()
            .select(["id", "displayName"])
            .expand("members")
            .api_version("beta");
        let url = transport()
            .resolve(&PageRequest::First {
                locator: "/users",
                shaping: &shaping,
            })
            .unwrap();

        assert_eq!(url.path(), "/v1.0/users");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("$select".to_string(), "id,displayName".to_string()),
                ("$expand".to_string(), "members".to_string()),
                ("api-version".to_string(), "beta".to_string()),
            ]
        );
    }

    #[test]
    fn unshaped_first_request_has_no_query() {
        let url = transport()
            .resolve(&PageRequest::First {
                locator: "groups",
                shaping: &ShapingOptions::default(),
            })
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1.0/groups");
    }

    #[test]
    fn continuation_is_used_verbatim() {
        let cursor = PageCursor::new("https://other.example.com/users?$skiptoken=X1");
        let url = transport()
            .resolve(&PageRequest::Continuation(&cursor))
            .unwrap();
        assert_eq!(url.as_str(), "https://other.example.com/users?$skiptoken=X1");
    }

    #[test]
    fn malformed_cursor_is_an_invalid_locator() {
        let cursor = PageCursor::new("not a url");
        let err = transport()
            .resolve(&PageRequest::Continuation(&cursor))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidLocator { .. }));
    }
}
