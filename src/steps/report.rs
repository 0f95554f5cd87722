// src/steps/report.rs
//! Per-step outcomes and the report of a whole run.

use crate::algebras::WarnEvent;
use crate::analytics::GraphSummary;
use crate::error::AppError;
use crate::types::StepId;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a step within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Waiting for dependencies.
    Pending,
    /// Dependencies completed; waiting for a worker.
    Ready,
    Running,
    Completed,
    /// The handler returned an error.
    Failed,
    /// Never invoked because a dependency failed.
    FailedByPropagation,
}

impl StepStatus {
    pub fn is_failure(self) -> bool {
        matches!(self, StepStatus::Failed | StepStatus::FailedByPropagation)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Pending => "pending",
            StepStatus::Ready => "ready",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::FailedByPropagation => "failed by propagation",
        };
        write!(f, "{}", label)
    }
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The failed step this one was abandoned for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<StepId>,
}

impl StepOutcome {
    pub fn pending() -> Self {
        Self {
            status: StepStatus::Pending,
            duration_ms: None,
            error: None,
            caused_by: None,
        }
    }
}

/// Result of executing a plan.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Outcomes in plan order.
    pub outcomes: IndexMap<StepId, StepOutcome>,
    /// The first step whose handler failed.
    pub failed_step: Option<StepId>,
    pub summary: GraphSummary,
    pub warn_events: Vec<WarnEvent>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failed_step.is_none()
    }

    pub fn outcome(&self, id: &str) -> Option<&StepOutcome> {
        self.outcomes.get(id)
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.outcomes
            .values()
            .filter(|outcome| outcome.status == status)
            .count()
    }

    /// The report when every step completed, otherwise the failure naming the
    /// first failed step.
    pub fn into_result(self) -> Result<RunReport, AppError> {
        match &self.failed_step {
            None => Ok(self),
            Some(step_id) => {
                let cause = self
                    .outcomes
                    .get(step_id)
                    .and_then(|outcome| outcome.error.clone())
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(AppError::StepFailed {
                    step_id: step_id.to_string(),
                    cause,
                })
            }
        }
    }

    /// Multi-line summary for the console.
    pub fn describe(&self) -> String {
        let mut lines = vec![format!(
            "Run {} finished in {}ms: {} completed, {} failed, {} abandoned",
            self.run_id,
            self.duration_ms,
            self.count(StepStatus::Completed),
            self.count(StepStatus::Failed),
            self.count(StepStatus::FailedByPropagation)
        )];
        for (id, outcome) in &self.outcomes {
            let mut line = format!("  {:<36} {}", id.as_str(), outcome.status);
            if let Some(ms) = outcome.duration_ms {
                line.push_str(&format!(" ({}ms)", ms));
            }
            if let Some(cause) = &outcome.caused_by {
                line.push_str(&format!(" after {} failed", cause));
            }
            if let Some(error) = &outcome.error {
                line.push_str(&format!(": {}", error));
            }
            lines.push(line);
        }
        lines.push(format!(
            "Graph: {} entities, {} relationships",
            self.summary.total_entities, self.summary.total_relationships
        ));
        for event in &self.warn_events {
            lines.push(format!("  warning {}", event));
        }
        lines.join("\n")
    }
}
