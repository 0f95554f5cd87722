//! Diagnostic channel available to every step.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A structured warning that belongs in the run report, not just the log.
///
/// The pipeline publishes one when a listing is denied for lack of
/// permission, so operators can see which data is missing from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarnEvent {
    pub name: String,
    pub description: String,
}

impl WarnEvent {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for WarnEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// Logging capability handed to steps and the resource client.
///
/// # Laws
///
/// - **L1 (Warning Accounting)**: Every `warn` call is counted exactly once
///   by the implementation that receives it, including calls made through a
///   scoped logger.
///
/// - **L2 (Event Delivery)**: Every published event is retained, in
///   publication order, and visible through every logger sharing the run.
///
/// This trait is **object-safe** and can be used as `dyn IngestLogger`.
pub trait IngestLogger: Send + Sync {
    fn debug(&self, message: &str);

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    /// Publishes a structured warning for the run report.
    fn publish_warn_event(&self, event: WarnEvent);

    /// Every event published during the run so far.
    fn published_events(&self) -> Vec<WarnEvent>;

    /// Returns a logger whose messages carry `scope` as context.
    ///
    /// Scoped loggers share counters and events with their parent.
    fn scoped(&self, scope: &str) -> Arc<dyn IngestLogger>;
}
