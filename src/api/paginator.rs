// src/api/paginator.rs
//! Walks cursor-based listings to exhaustion.
//!
//! Each item is handed to the caller's callback in upstream page order, one at
//! a time. A failing or panicking callback costs one warning and that one item;
//! a listing the caller may not read costs one warning and one permission
//! event. Every other request failure ends the listing with an error, and so
//! does running past the listing's time budget.

use super::{ListingShape, PageCursor, PageRequest, ResourcePage, ShapingOptions, Transport};
use crate::algebras::{IngestLogger, WarnEvent};
use crate::constants::{
    DEFAULT_LISTING_TIMEOUT, DEFAULT_MAX_ATTEMPTS, MISSING_PERMISSION_EVENT, RETRY_INITIAL_DELAY,
    RETRY_MAX_DELAY,
};
use crate::error::AppError;
use crate::error_recovery::{panic_message, retry_with_backoff};
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How transient request failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A single attempt per request.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: RETRY_INITIAL_DELAY,
            max_delay: RETRY_MAX_DELAY,
        }
    }
}

/// What happened during one listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingOutcome {
    pub pages: usize,
    /// Items whose callback succeeded.
    pub delivered: usize,
    /// Items whose callback failed and were skipped.
    pub failed: usize,
    /// The listing ended early because the caller lacks permission.
    pub permission_denied: bool,
}

/// Paginated resource client shared by fetch steps.
#[derive(Clone)]
pub struct ResourceClient {
    transport: Arc<dyn Transport>,
    logger: Arc<dyn IngestLogger>,
    retry: RetryPolicy,
    listing_timeout: Duration,
}

impl ResourceClient {
    pub fn new(transport: Arc<dyn Transport>, logger: Arc<dyn IngestLogger>) -> Self {
        Self {
            transport,
            logger,
            retry: RetryPolicy::default(),
            listing_timeout: DEFAULT_LISTING_TIMEOUT,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bounds the wall-clock time of each whole listing, retries included.
    pub fn with_listing_timeout(mut self, listing_timeout: Duration) -> Self {
        self.listing_timeout = listing_timeout;
        self
    }

    /// The same client reporting through another logger.
    pub fn with_logger(&self, logger: Arc<dyn IngestLogger>) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            logger,
            retry: self.retry,
            listing_timeout: self.listing_timeout,
        }
    }

    /// Delivers every item of the listing at `locator` to `on_item`.
    ///
    /// Shaping applies to the first request only. Returns `Ok` when the
    /// listing was exhausted or denied for lack of permission, and
    /// [`AppError::Timeout`] when it outlived the listing time budget.
    pub async fn iterate_resources<F, Fut>(
        &self,
        locator: &str,
        shaping: &ShapingOptions,
        on_item: F,
    ) -> Result<ListingOutcome, AppError>
    where
        F: FnMut(Value) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        self.iterate(locator, shaping, ListingShape::Value, on_item)
            .await
    }

    /// Like [`iterate_resources`](Self::iterate_resources), reading items
    /// from the `stages` field of each page.
    pub async fn iterate_stages<F, Fut>(
        &self,
        locator: &str,
        shaping: &ShapingOptions,
        on_item: F,
    ) -> Result<ListingOutcome, AppError>
    where
        F: FnMut(Value) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        self.iterate(locator, shaping, ListingShape::Stages, on_item)
            .await
    }

    async fn iterate<F, Fut>(
        &self,
        locator: &str,
        shaping: &ShapingOptions,
        shape: ListingShape,
        on_item: F,
    ) -> Result<ListingOutcome, AppError>
    where
        F: FnMut(Value) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let deadline = Instant::now() + self.listing_timeout;
        match tokio::time::timeout_at(deadline, self.walk(locator, shaping, shape, deadline, on_item))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(self.listing_timed_out(locator)),
        }
    }

    async fn walk<F, Fut>(
        &self,
        locator: &str,
        shaping: &ShapingOptions,
        shape: ListingShape,
        deadline: Instant,
        mut on_item: F,
    ) -> Result<ListingOutcome, AppError>
    where
        F: FnMut(Value) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let mut outcome = ListingOutcome::default();
        let mut cursor: Option<PageCursor> = None;
        let mut seen_cursors: HashSet<PageCursor> = HashSet::new();

        loop {
            // A transport that never yields would starve the timer.
            if Instant::now() >= deadline {
                return Err(self.listing_timed_out(locator));
            }

            let request = match &cursor {
                None => PageRequest::First { locator, shaping },
                Some(cursor) => PageRequest::Continuation(cursor),
            };

            let page = match self.fetch_with_retry(request, shape).await {
                Ok(page) => page,
                Err(e) if e.is_permission_denied() => {
                    self.logger.warn(&format!(
                        "Missing permission to list {}, skipping it: {}",
                        locator, e
                    ));
                    self.logger.publish_warn_event(WarnEvent::new(
                        MISSING_PERMISSION_EVENT,
                        format!("Missing permission to read {}", locator),
                    ));
                    outcome.permission_denied = true;
                    return Ok(outcome);
                }
                Err(e) => return Err(e),
            };
            outcome.pages += 1;

            for item in page.items {
                let callback = &mut on_item;
                let delivery = AssertUnwindSafe(async move { callback(item).await })
                    .catch_unwind()
                    .await;
                match delivery {
                    Ok(Ok(())) => outcome.delivered += 1,
                    Ok(Err(e)) => {
                        outcome.failed += 1;
                        self.logger
                            .warn(&format!("Failed to process item from {}: {:#}", locator, e));
                    }
                    Err(panic) => {
                        outcome.failed += 1;
                        self.logger.warn(&format!(
                            "Processing an item from {} panicked: {}",
                            locator,
                            panic_message(panic.as_ref())
                        ));
                    }
                }
            }

            match page.next_cursor {
                Some(next) if !seen_cursors.insert(next.clone()) => {
                    self.logger.warn(&format!(
                        "Listing {} returned continuation {} a second time, stopping",
                        locator, next
                    ));
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        self.logger.debug(&format!(
            "Listed {}: {} items over {} pages ({} failed)",
            locator, outcome.delivered, outcome.pages, outcome.failed
        ));
        Ok(outcome)
    }

    fn listing_timed_out(&self, locator: &str) -> AppError {
        AppError::Timeout {
            locator: locator.to_string(),
            seconds: self.listing_timeout.as_secs(),
        }
    }

    async fn fetch_with_retry(
        &self,
        request: PageRequest<'_>,
        shape: ListingShape,
    ) -> Result<ResourcePage, AppError> {
        retry_with_backoff(
            || self.transport.fetch_page(request, shape),
            self.retry.max_attempts,
            self.retry.initial_delay,
            self.retry.max_delay,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorCode;
    use crate::interpreters::RunLogger;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;

    /// Replays scripted responses and records every request address.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<ResourcePage, AppError>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<ResourcePage, AppError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn fetch_page(
            &self,
            request: PageRequest<'_>,
            _shape: ListingShape,
        ) -> Result<ResourcePage, AppError> {
            let address = match request {
                PageRequest::First { locator, shaping } if !shaping.is_empty() => {
                    format!("{}?shaped", locator)
                }
                other => other.address().to_string(),
            };
            self.requests.lock().push(address);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(ResourcePage::default()))
        }
    }

    fn page(ids: &[u32], next: Option<&str>) -> Result<ResourcePage, AppError> {
        Ok(ResourcePage {
            items: ids.iter().map(|id| json!({ "id": id })).collect(),
            next_cursor: next.map(PageCursor::new),
        })
    }

    fn api_error(status: u16) -> Result<ResourcePage, AppError> {
        Err(AppError::Api {
            code: ApiErrorCode::from_http_status(status),
            status,
            message: "scripted".to_string(),
            locator: "users".to_string(),
        })
    }

    fn client(transport: Arc<ScriptedTransport>, logger: &RunLogger) -> ResourceClient {
        ResourceClient::new(transport, Arc::new(logger.clone())).with_retry_policy(RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        })
    }

    #[tokio::test]
    async fn shaping_applies_to_first_request_only() {
        let transport = ScriptedTransport::new(vec![
            page(&[1], Some("https://api/next-1")),
            page(&[2], None),
        ]);
        let logger = RunLogger::new();
        let shaping = ShapingOptions::new().select(["id"]);

        let outcome = client(transport.clone(), &logger)
            .iterate_resources("users", &shaping, |_| async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(outcome.pages, 2);
        assert_eq!(
            *transport.requests.lock(),
            vec!["users?shaped".to_string(), "https://api/next-1".to_string()]
        );
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let transport = ScriptedTransport::new(vec![api_error(503), page(&[1, 2], None)]);
        let logger = RunLogger::new();

        let outcome = client(transport.clone(), &logger)
            .iterate_resources("users", &ShapingOptions::default(), |_| async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 2);
        assert_eq!(transport.requests.lock().len(), 2);
        assert_eq!(logger.warning_count(), 0);
    }

    #[tokio::test]
    async fn non_permission_errors_propagate() {
        let transport = ScriptedTransport::new(vec![page(&[1], Some("https://api/next")), api_error(404)]);
        let logger = RunLogger::new();

        let err = client(transport, &logger)
            .iterate_resources("users", &ShapingOptions::default(), |_| async { Ok(()) })
            .await
            .unwrap_err();

        assert_eq!(err.api_code(), Some(&ApiErrorCode::NotFound));
        assert!(logger.warn_events().is_empty());
    }

    #[tokio::test]
    async fn repeated_cursor_stops_the_listing() {
        let transport = ScriptedTransport::new(vec![
            page(&[1], Some("https://api/same")),
            page(&[2], Some("https://api/same")),
            page(&[3], None),
        ]);
        let logger = RunLogger::new();

        let outcome = client(transport, &logger)
            .iterate_resources("users", &ShapingOptions::default(), |_| async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 2);
        assert_eq!(logger.warning_count(), 1);
    }

    #[tokio::test]
    async fn stages_listing_uses_same_algorithm() {
        let transport = ScriptedTransport::new(vec![page(&[1, 2], Some("https://api/p2")), page(&[3], None)]);
        let logger = RunLogger::new();
        let mut seen = Vec::new();

        client(transport, &logger)
            .iterate_stages("pipelines/p1", &ShapingOptions::default(), |item| {
                seen.push(item["id"].as_u64().unwrap_or_default());
                async { Ok(()) }
            })
            .await
            .unwrap();

        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn cursor_cycle_stops_the_listing() {
        let transport = ScriptedTransport::new(vec![
            page(&[1], Some("https://api/c1")),
            page(&[2], Some("https://api/c2")),
            page(&[3], Some("https://api/c1")),
            page(&[4], None),
        ]);
        let logger = RunLogger::new();

        let outcome = client(transport.clone(), &logger)
            .iterate_resources("users", &ShapingOptions::default(), |_| async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 3);
        assert_eq!(transport.requests.lock().len(), 3);
        assert_eq!(logger.warning_count(), 1);
    }

    /// Hands out a fresh continuation on every request, forever.
    struct EndlessTransport {
        delay: Option<Duration>,
        calls: Mutex<u32>,
    }

    #[async_trait::async_trait]
    impl Transport for EndlessTransport {
        async fn fetch_page(
            &self,
            _request: PageRequest<'_>,
            _shape: ListingShape,
        ) -> Result<ResourcePage, AppError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let call = {
                let mut calls = self.calls.lock();
                *calls += 1;
                *calls
            };
            let next = format!("https://api/next-{}", call);
            page(&[call], Some(next.as_str()))
        }
    }

    async fn list_endlessly(delay: Option<Duration>) -> Result<ListingOutcome, AppError> {
        let transport = Arc::new(EndlessTransport {
            delay,
            calls: Mutex::new(0),
        });
        ResourceClient::new(transport, Arc::new(RunLogger::new()))
            .with_retry_policy(RetryPolicy::no_retry())
            .with_listing_timeout(Duration::from_millis(50))
            .iterate_resources("users", &ShapingOptions::default(), |_| async { Ok(()) })
            .await
    }

    #[tokio::test]
    async fn listing_budget_fails_a_slow_listing() {
        let err = list_endlessly(Some(Duration::from_millis(10)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Timeout { locator, .. } if locator == "users"));
    }

    #[tokio::test]
    async fn listing_budget_holds_without_yielding_transport() {
        let err = list_endlessly(None).await.unwrap_err();

        assert!(matches!(err, AppError::Timeout { .. }));
    }

    #[tokio::test]
    async fn panicking_callback_costs_only_that_item() {
        let transport = ScriptedTransport::new(vec![page(&[1, 5, 2], None)]);
        let logger = RunLogger::new();
        let mut seen = Vec::new();

        let outcome = client(transport, &logger)
            .iterate_resources("users", &ShapingOptions::default(), |item| {
                let id = item["id"].as_u64().unwrap_or_default();
                let lookup = [0, 10, 20];
                seen.push(lookup[id as usize] / 10);
                async { Ok(()) }
            })
            .await
            .unwrap();

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(logger.warning_count(), 1);
    }

    #[tokio::test]
    async fn panic_inside_callback_future_is_isolated() {
        let transport = ScriptedTransport::new(vec![page(&[1, 2], None)]);
        let logger = RunLogger::new();

        let outcome = client(transport, &logger)
            .iterate_resources("users", &ShapingOptions::default(), |item| async move {
                if item["id"] == 1 {
                    panic!("converter bug");
                }
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.failed, 1);
    }
}
