// src/interpreters/run_logger.rs
//! [`IngestLogger`] backed by the `log` facade.
//!
//! Messages go to whatever backend the binary configured (log4rs in
//! production). Warnings are counted and warn events retained so the run
//! report can show them after the fact.

use crate::algebras::{IngestLogger, WarnEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct RunDiagnostics {
    warnings: AtomicUsize,
    events: Mutex<Vec<WarnEvent>>,
}

/// Logger for one run, optionally scoped to a step.
#[derive(Debug, Clone, Default)]
pub struct RunLogger {
    scope: Option<String>,
    diagnostics: Arc<RunDiagnostics>,
}

impl RunLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of warnings logged through this logger or any scoped child.
    pub fn warning_count(&self) -> usize {
        self.diagnostics.warnings.load(Ordering::SeqCst)
    }

    /// Warn events published so far, in publication order.
    pub fn warn_events(&self) -> Vec<WarnEvent> {
        self.diagnostics.events.lock().clone()
    }

    fn contextualize(&self, message: &str) -> String {
        match &self.scope {
            Some(scope) => format!("[{}] {}", scope, message),
            None => message.to_string(),
        }
    }
}

impl IngestLogger for RunLogger {
    fn debug(&self, message: &str) {
        log::debug!("{}", self.contextualize(message));
    }

    fn info(&self, message: &str) {
        log::info!("{}", self.contextualize(message));
    }

    fn warn(&self, message: &str) {
        self.diagnostics.warnings.fetch_add(1, Ordering::SeqCst);
        log::warn!("{}", self.contextualize(message));
    }

    fn publish_warn_event(&self, event: WarnEvent) {
        log::warn!("{}", self.contextualize(&format!("Event {}", event)));
        self.diagnostics.events.lock().push(event);
    }

    fn published_events(&self) -> Vec<WarnEvent> {
        self.warn_events()
    }

    fn scoped(&self, scope: &str) -> Arc<dyn IngestLogger> {
        Arc::new(RunLogger {
            scope: Some(scope.to_string()),
            diagnostics: Arc::clone(&self.diagnostics),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn law_l1_warnings_through_scoped_loggers_are_counted_once() {
        let logger = RunLogger::new();
        let scoped = logger.scoped("fetch-users");

        logger.warn("top level");
        scoped.warn("inside step");
        scoped.debug("not counted");

        assert_eq!(logger.warning_count(), 2);
    }

    #[test]
    fn law_l2_events_are_shared_in_publication_order() {
        let logger = RunLogger::new();
        let scoped = logger.scoped("fetch-devices");

        scoped.publish_warn_event(WarnEvent::new("MISSING_PERMISSION", "devices"));
        logger.publish_warn_event(WarnEvent::new("OTHER", "second"));

        assert_eq!(
            logger.warn_events(),
            vec![
                WarnEvent::new("MISSING_PERMISSION", "devices"),
                WarnEvent::new("OTHER", "second"),
            ]
        );
        assert_eq!(logger.warning_count(), 0);
    }

    #[test]
    fn scope_prefixes_messages() {
        let logger = RunLogger {
            scope: Some("fetch-users".to_string()),
            diagnostics: Arc::default(),
        };
        assert_eq!(logger.contextualize("done"), "[fetch-users] done");
        assert_eq!(RunLogger::new().contextualize("done"), "done");
    }
}
