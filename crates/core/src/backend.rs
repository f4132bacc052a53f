//! Contracts for the two external collaborators the tools drive:
//! the document-mutation backend and the slide renderer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ToolError;

/// Runs one named operation against a document and returns its JSON result.
///
/// Implementations must treat a nonzero exit or non-JSON output as an error.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn invoke(&self, operation: &str, args: &[String]) -> Result<serde_json::Value, ToolError>;
}

/// Renders every slide of a document to an image in `output_dir`.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Returns the generated image paths sorted in slide order.
    async fn render(&self, document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, ToolError>;
}

/// Keep only the requested 1-based slides. An empty selection keeps everything.
pub fn select_slides(rendered: Vec<PathBuf>, slide_numbers: &[u32]) -> Vec<PathBuf> {
    if slide_numbers.is_empty() {
        return rendered;
    }
    rendered
        .into_iter()
        .enumerate()
        .filter(|(i, _)| slide_numbers.iter().any(|&n| n as usize == i + 1))
        .map(|(_, p)| p)
        .collect()
}
