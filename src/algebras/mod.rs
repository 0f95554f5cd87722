//! Capability algebras for inventory2graph.
//!
//! This module defines algebraic traits that represent **capabilities**,
//! not implementations. Each trait is:
//!
//! - **Object-safe**: can be used as `dyn Trait`
//! - **Documented with laws**: properties that all implementations must satisfy
//! - **Shareable**: `Send + Sync`, handed to concurrent steps behind an `Arc`
//!
//! # Architecture
//!
//! ```text
//! Application Layer (main.rs)
//!         ↓
//! Step Layer (steps/, directory/)
//!         ↓
//! Domain Layer (algebras/)
//!         ↓
//! Interpreter Layer (interpreters/)
//! ```
//!
//! # Capability Traits
//!
//! - [`JobState`]: Run-scoped graph store with a global key index
//! - [`IngestLogger`]: Diagnostics and structured warn events
//!
//! The HTTP side has its own algebra, [`crate::api::Transport`], next to the
//! client that consumes it.
//!
//! # Laws
//!
//! Each trait documents algebraic laws that all implementations must satisfy.
//! The in-process interpreters verify them in their test suites.

pub mod job_state;
pub mod logger;

// Re-exports for convenience
pub use job_state::{GraphSnapshot, JobState, JobStateExt};
pub use logger::{IngestLogger, WarnEvent};
