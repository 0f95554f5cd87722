// src/lib.rs
//! inventory2graph library: ingests paginated resource inventories into a typed
//! entity/relationship graph.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ApiErrorCode`, `PlanError`, `ValidationError`
//! - **Configuration**: `CommandLineInput`, `PipelineConfig`
//! - **Graph model**: `Entity`, `Relationship`, `RelationshipClass`
//! - **Normalization**: `normalize`, `normalize_json`, `NormalizeOptions`, `Payload`
//! - **API client**: `Transport`, `HttpTransport`, `ResourceClient`, listing types
//! - **Relationship building**: `RelationshipBuilder` and endpoint strategies
//! - **Steps**: `Step`, `plan`, `Scheduler`, `RunReport`
//! - **Capabilities**: `JobState`, `IngestLogger` and their in-memory interpreters

pub mod algebras;
pub mod analytics;
pub mod api;
pub mod config;
pub mod constants;
pub mod directory;
pub mod error;
pub mod error_recovery;
pub mod graph;
pub mod interpreters;
pub mod model;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod steps;
pub mod types;

// --- Error Handling ---
pub use crate::error::{ApiErrorCode, AppError, PlanError};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, PipelineConfig};

// --- Domain Types ---
pub use crate::types::{AccessToken, BaseUrl, StepId};

// --- Graph Model ---
pub use crate::model::{relationship_key, Entity, Relationship, RelationshipClass};

// --- Normalization ---
pub use crate::normalize::{normalize, normalize_json, NormalizeOptions, Payload};

// --- API Client ---
pub use crate::api::{
    HttpTransport, ListingOutcome, ListingShape, PageCursor, PageRequest, ResourceClient,
    ResourcePage, RetryPolicy, ShapingOptions, Transport,
};

// --- Relationship Building ---
pub use crate::graph::{
    BuildOutcome, EndpointExtractor, KeyListEndpoints, PatternEndpoints, RelationshipBuilder,
    RelationshipSpec, SourceRole,
};

// --- Steps ---
pub use crate::steps::{
    plan, plan_subset, ExecutionPlan, RunEnvironment, RunReport, Scheduler, Step, StepContext,
    StepOutcome, StepStatus,
};

// --- Pipeline ---
pub use crate::pipeline::{GraphDelivery, GraphSource, IngestedGraph, InventoryIngestion};

// --- Algebras (Capability Traits) ---
pub use crate::algebras::{GraphSnapshot, IngestLogger, JobState, JobStateExt, WarnEvent};
pub use crate::interpreters::{InMemoryJobState, RunLogger};
