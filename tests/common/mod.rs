// tests/common/mod.rs
//! Shared fixtures: an in-process inventory API and fast client settings.

#![allow(dead_code)]

use inventory2graph::{
    ApiErrorCode, AppError, ListingShape, PageCursor, PageRequest, ResourceClient, ResourcePage,
    RetryPolicy, RunLogger, Transport,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A canned reply for one request address.
#[derive(Debug, Clone)]
pub enum Scripted {
    Page {
        items: Vec<Value>,
        next: Option<String>,
    },
    Status(u16),
}

/// Answers page requests from a route table keyed by locator or cursor.
///
/// Unknown addresses answer with an empty final page.
#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, Scripted>>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listing whose pages are chained by generated cursors.
    pub fn with_listing(self, locator: &str, pages: Vec<Vec<Value>>) -> Self {
        let count = pages.len();
        for (index, items) in pages.into_iter().enumerate() {
            let address = page_address(locator, index);
            let next = (index + 1 < count).then(|| page_address(locator, index + 1));
            self.routes
                .lock()
                .insert(address, Scripted::Page { items, next });
        }
        self
    }

    /// Replaces the reply for one page of a listing (0-based).
    pub fn with_page_reply(self, locator: &str, index: usize, reply: Scripted) -> Self {
        self.routes.lock().insert(page_address(locator, index), reply);
        self
    }

    /// Denies a listing outright.
    pub fn with_denied(self, locator: &str) -> Self {
        self.with_page_reply(locator, 0, Scripted::Status(403))
    }

    /// Addresses requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

/// The first page is addressed by its locator; later ones by cursor URL.
pub fn page_address(locator: &str, index: usize) -> String {
    if index == 0 {
        locator.to_string()
    } else {
        format!("https://inventory.test/{}?page={}", locator, index + 1)
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn fetch_page(
        &self,
        request: PageRequest<'_>,
        _shape: ListingShape,
    ) -> Result<ResourcePage, AppError> {
        let address = request.address().to_string();
        self.requests.lock().push(address.clone());
        let reply = self.routes.lock().get(&address).cloned();

        match reply {
            None => Ok(ResourcePage::default()),
            Some(Scripted::Page { items, next }) => Ok(ResourcePage {
                items,
                next_cursor: next.map(PageCursor::new),
            }),
            Some(Scripted::Status(status)) => Err(AppError::Api {
                code: ApiErrorCode::from_http_status(status),
                status,
                message: "scripted failure".to_string(),
                locator: address,
            }),
        }
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
    }
}

pub fn client(transport: Arc<FakeTransport>, logger: &RunLogger) -> ResourceClient {
    ResourceClient::new(transport, Arc::new(logger.clone())).with_retry_policy(fast_retry())
}
