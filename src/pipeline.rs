// src/pipeline.rs
//! Pipeline capability traits and the directory ingestion that implements them.
//!
//! Ingestion runs the step table against a transport and yields the populated
//! graph; delivery writes that graph wherever the configuration says.

use crate::algebras::{GraphSnapshot, IngestLogger, JobState};
use crate::api::{HttpTransport, ResourceClient, RetryPolicy, Transport};
use crate::config::PipelineConfig;
use crate::directory::directory_steps;
use crate::error::AppError;
use crate::interpreters::{InMemoryJobState, RunLogger};
use crate::output::write_graph;
use crate::steps::{plan, plan_subset, RunEnvironment, RunReport, Scheduler, Step};
use std::sync::Arc;

/// A finished run: the report and everything the job state holds.
#[derive(Debug)]
pub struct IngestedGraph {
    pub report: RunReport,
    pub graph: GraphSnapshot,
}

/// Populates a graph from an inventory source.
#[async_trait::async_trait]
pub trait GraphSource {
    async fn ingest(&self) -> Result<IngestedGraph, AppError>;
}

/// Hands a populated graph to its destination.
pub trait GraphDelivery {
    /// Returns the number of bytes written, zero when nothing was written.
    fn deliver(&self, ingested: &IngestedGraph) -> Result<usize, AppError>;
}

/// Directory ingestion over any transport.
pub struct InventoryIngestion<'a> {
    config: &'a PipelineConfig,
    transport: Arc<dyn Transport>,
    steps: fn() -> Vec<Step>,
}

impl<'a> InventoryIngestion<'a> {
    /// Ingestion over HTTP with the directory step table.
    pub fn new(config: &'a PipelineConfig) -> Result<Self, AppError> {
        let transport = HttpTransport::new(
            &config.access_token,
            config.base_url.clone(),
            config.request_timeout,
            config.connect_timeout,
        )?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: &'a PipelineConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            steps: directory_steps,
        }
    }

    /// Replaces the step table.
    pub fn with_steps(mut self, steps: fn() -> Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.config.max_attempts,
            ..RetryPolicy::default()
        }
    }
}

#[async_trait::async_trait]
impl GraphSource for InventoryIngestion<'_> {
    async fn ingest(&self) -> Result<IngestedGraph, AppError> {
        let steps = (self.steps)();
        let plan = if self.config.steps.is_empty() {
            plan(steps)?
        } else {
            plan(plan_subset(steps, &self.config.steps)?)?
        };

        let logger = Arc::new(RunLogger::new());
        let job_state = Arc::new(InMemoryJobState::new());
        let client = ResourceClient::new(Arc::clone(&self.transport), logger.clone())
            .with_retry_policy(self.retry_policy())
            .with_listing_timeout(self.config.listing_timeout);
        let env = RunEnvironment::new(job_state.clone(), logger.clone()).with_client(client);

        let report = Scheduler::new(self.config.concurrency)
            .execute(&plan, &env)
            .await;
        for line in report.describe().lines() {
            logger.info(line);
        }
        if logger.warning_count() > 0 {
            log::warn!("Run finished with {} warnings", logger.warning_count());
        }

        let report = report.into_result()?;
        let graph = job_state.snapshot().await;
        Ok(IngestedGraph { report, graph })
    }
}

impl GraphDelivery for InventoryIngestion<'_> {
    fn deliver(&self, ingested: &IngestedGraph) -> Result<usize, AppError> {
        match &self.config.output_file {
            Some(path) => write_graph(path, &ingested.graph, self.config.pretty),
            None => Ok(0),
        }
    }
}
