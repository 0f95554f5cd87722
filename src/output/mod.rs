// src/output/mod.rs
//! Graph output: the only place the pipeline touches the filesystem.

mod writer;

pub use writer::{render_graph, write_graph};
