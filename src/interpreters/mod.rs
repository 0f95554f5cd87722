//! In-process interpreters of the capability algebras.
//!
//! - [`InMemoryJobState`] interprets [`crate::algebras::JobState`]
//! - [`RunLogger`] interprets [`crate::algebras::IngestLogger`]

mod in_memory_state;
mod run_logger;

pub use in_memory_state::InMemoryJobState;
pub use run_logger::RunLogger;
