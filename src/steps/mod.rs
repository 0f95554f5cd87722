// src/steps/mod.rs
//! Pipeline steps and their dependency-ordered execution.
//!
//! A [`Step`] is a named unit of ingestion work: fetch a listing, or link
//! entities that earlier steps produced. Steps declare what they depend on;
//! [`plan`] turns a step table into an acyclic [`ExecutionPlan`] and the
//! [`Scheduler`] runs it, starting each step as soon as its dependencies
//! completed.

mod plan;
mod report;
mod scheduler;

pub use plan::{plan, plan_subset, ExecutionPlan};
pub use report::{RunReport, StepOutcome, StepStatus};
pub use scheduler::Scheduler;

use crate::algebras::{IngestLogger, JobState};
use crate::api::ResourceClient;
use crate::error::AppError;
use crate::graph::RelationshipBuilder;
use crate::types::StepId;
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a step handler.
pub type StepFuture = BoxFuture<'static, Result<(), AppError>>;

/// The work a step performs.
pub type StepHandler = Arc<dyn Fn(StepContext) -> StepFuture + Send + Sync>;

/// One declared unit of pipeline work.
#[derive(Clone)]
pub struct Step {
    pub id: StepId,
    pub name: String,
    pub depends_on: BTreeSet<StepId>,
    pub produces_entity_types: BTreeSet<String>,
    pub produces_relationship_types: BTreeSet<String>,
    handler: StepHandler,
}

impl Step {
    /// Declares a step with no dependencies.
    pub fn new<F, Fut>(id: StepId, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        Self {
            id,
            name: name.into(),
            depends_on: BTreeSet::new(),
            produces_entity_types: BTreeSet::new(),
            produces_relationship_types: BTreeSet::new(),
            handler: Arc::new(move |context| Box::pin(handler(context))),
        }
    }

    pub fn depends_on<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = StepId>,
    {
        self.depends_on.extend(ids);
        self
    }

    pub fn produces_entities<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.produces_entity_types
            .extend(types.into_iter().map(Into::into));
        self
    }

    pub fn produces_relationships<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.produces_relationship_types
            .extend(types.into_iter().map(Into::into));
        self
    }

    pub(crate) fn invoke(&self, context: StepContext) -> StepFuture {
        (self.handler)(context)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

/// Shared collaborators of one run.
#[derive(Clone)]
pub struct RunEnvironment {
    pub job_state: Arc<dyn JobState>,
    pub logger: Arc<dyn IngestLogger>,
    pub client: Option<ResourceClient>,
}

impl RunEnvironment {
    pub fn new(job_state: Arc<dyn JobState>, logger: Arc<dyn IngestLogger>) -> Self {
        Self {
            job_state,
            logger,
            client: None,
        }
    }

    pub fn with_client(mut self, client: ResourceClient) -> Self {
        self.client = Some(client);
        self
    }

    /// The context handed to one step, with a step-scoped logger.
    pub(crate) fn context_for(&self, step_id: &StepId) -> StepContext {
        let logger = self.logger.scoped(step_id.as_str());
        StepContext {
            step_id: step_id.clone(),
            job_state: Arc::clone(&self.job_state),
            client: self
                .client
                .as_ref()
                .map(|client| client.with_logger(Arc::clone(&logger))),
            logger,
        }
    }
}

/// Everything a step handler may use.
#[derive(Clone)]
pub struct StepContext {
    pub step_id: StepId,
    pub job_state: Arc<dyn JobState>,
    pub logger: Arc<dyn IngestLogger>,
    client: Option<ResourceClient>,
}

impl StepContext {
    /// The resource client; fetch steps fail without one.
    pub fn client(&self) -> Result<&ResourceClient, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::MissingConfiguration(format!(
                "step '{}' needs a resource client but the run has none",
                self.step_id
            ))
        })
    }

    /// A relationship builder over this run's job state.
    pub fn relationships(&self) -> RelationshipBuilder {
        RelationshipBuilder::new(Arc::clone(&self.job_state), Arc::clone(&self.logger))
    }
}
