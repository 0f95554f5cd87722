// src/output/writer.rs
//! Serializes the ingested graph and writes it to disk.

use crate::algebras::GraphSnapshot;
use crate::error::AppError;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Renders `{ "entities": [...], "relationships": [...] }`.
pub fn render_graph(snapshot: &GraphSnapshot, pretty: bool) -> Result<String, AppError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(snapshot)?
    } else {
        serde_json::to_string(snapshot)?
    };
    Ok(rendered)
}

/// Writes the graph as JSON, creating parent directories as needed.
///
/// Returns the number of bytes written.
pub fn write_graph(path: &Path, snapshot: &GraphSnapshot, pretty: bool) -> Result<usize, AppError> {
    let started = Instant::now();
    let content = render_graph(snapshot, pretty)?;
    log::debug!("Writing {} bytes to {}", content.len(), path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &content)?;

    log::info!(
        "Wrote {} entities and {} relationships to {} in {}ms",
        snapshot.entities.len(),
        snapshot.relationships.len(),
        path.display(),
        started.elapsed().as_millis()
    );
    Ok(content.len())
}
