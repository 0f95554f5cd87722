// src/api/mod.rs
//! Inventory API interaction: the ability to walk paginated resource listings.
//!
//! The module separates three concerns:
//! - [`Transport`]: one page per request, no pagination or policy
//! - [`parser`]: turning response bodies into pages and typed errors
//! - [`ResourceClient`]: walking a listing to exhaustion with retries,
//!   per-item failure isolation and permission short-circuiting

pub mod client;
pub mod parser;
mod paginator;

use crate::constants::{LISTING_ITEMS_FIELD, STAGED_ITEMS_FIELD};
use crate::error::AppError;
use serde_json::Value;
use std::fmt;

pub use client::HttpTransport;
pub use paginator::{ListingOutcome, ResourceClient, RetryPolicy};

/// Opaque continuation token returned by the API: the absolute address of the
/// next page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query shaping applied to the first request of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapingOptions {
    /// Fields to return (`$select`).
    pub select: Vec<String>,
    /// Related resource to inline (`$expand`).
    pub expand: Option<String>,
    /// API version overriding the default for this listing.
    pub alternate_api_version: Option<String>,
}

impl ShapingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn expand(mut self, relation: impl Into<String>) -> Self {
        self.expand = Some(relation.into());
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.alternate_api_version = Some(version.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.select.is_empty() && self.expand.is_none() && self.alternate_api_version.is_none()
    }
}

/// Where a listing page keeps its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingShape {
    /// Items under `value`.
    Value,
    /// Items under `stages`.
    Stages,
}

impl ListingShape {
    pub fn items_field(self) -> &'static str {
        match self {
            ListingShape::Value => LISTING_ITEMS_FIELD,
            ListingShape::Stages => STAGED_ITEMS_FIELD,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourcePage {
    pub items: Vec<Value>,
    /// Absent on the final page.
    pub next_cursor: Option<PageCursor>,
}

/// A single page request: the start of a listing or a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest<'a> {
    /// First page; the locator is relative to the API base and shaping applies.
    First {
        locator: &'a str,
        shaping: &'a ShapingOptions,
    },
    /// Follow-up page; the cursor is requested verbatim.
    Continuation(&'a PageCursor),
}

impl PageRequest<'_> {
    /// The locator or cursor address, for diagnostics.
    pub fn address(&self) -> &str {
        match self {
            PageRequest::First { locator, .. } => locator,
            PageRequest::Continuation(cursor) => cursor.as_str(),
        }
    }
}

/// The ability to fetch one page of a resource listing.
///
/// Business logic depends on this trait, never on HTTP details. Failures
/// carry the HTTP status in [`AppError::Api`] so the client can tell a
/// permission denial from a server fault.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_page(
        &self,
        request: PageRequest<'_>,
        shape: ListingShape,
    ) -> Result<ResourcePage, AppError>;
}
