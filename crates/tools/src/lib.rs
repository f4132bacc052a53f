//! Slide tools for SlidePilot.
//!
//! Six operations give the model access to the presentation: list, read,
//! edit, export, add, and delete. Document access goes through a
//! [`DocumentBackend`] (one script per operation) and rendering through a
//! [`Renderer`], both injected so tests can substitute them.

pub mod add_slide;
pub mod delete_slide;
pub mod edit_slide_text;
pub mod export_slides;
pub mod list_slides;
pub mod office;
pub mod read_slide;
pub mod renderer;
pub mod script_backend;

use std::path::PathBuf;
use std::sync::Arc;

use slidepilot_core::backend::{DocumentBackend, Renderer};
use slidepilot_core::error::{RegistryError, ToolError};
use slidepilot_core::tool::{ToolContext, ToolRegistry};

pub use office::{OfficeError, OfficeService};
pub use renderer::{LibreOfficeRenderer, list_artifacts};
pub use script_backend::ScriptBackend;

/// Build the registry with all six slide tools, in catalogue order.
pub fn default_registry(
    backend: Arc<dyn DocumentBackend>,
    renderer: Arc<dyn Renderer>,
    output_dir: impl Into<PathBuf>,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(list_slides::ListSlidesTool::new(backend.clone()))?;
    registry.register(read_slide::ReadSlideTool::new(backend.clone()))?;
    registry.register(edit_slide_text::EditSlideTextTool::new(backend.clone()))?;
    registry.register(export_slides::ExportSlidesTool::new(renderer, output_dir))?;
    registry.register(add_slide::AddSlideTool::new(backend.clone()))?;
    registry.register(delete_slide::DeleteSlideTool::new(backend))?;
    Ok(registry)
}

/// Check a 1-based index supplied by the model.
pub(crate) fn one_based(field: &'static str, value: i64) -> Result<u32, ToolError> {
    if value < 1 {
        return Err(ToolError::InvalidIndex { field, value });
    }
    u32::try_from(value)
        .map_err(|_| ToolError::InvalidArguments(format!("{field} is out of range (got {value})")))
}

/// Reject a missing or blank string argument.
pub(crate) fn required(field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::InvalidArguments(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn document_arg(ctx: &ToolContext) -> String {
    ctx.document.to_string_lossy().into_owned()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use slidepilot_core::backend::{DocumentBackend, Renderer};
    use slidepilot_core::error::ToolError;
    use slidepilot_core::session::DocumentSession;

    /// Backend that records every call and replies with a fixed payload.
    pub struct RecordingBackend {
        pub calls: Mutex<Vec<(String, Vec<String>)>>,
        reply: serde_json::Value,
    }

    impl RecordingBackend {
        pub fn new(reply: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply,
            })
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocumentBackend for RecordingBackend {
        async fn invoke(&self, operation: &str, args: &[String]) -> Result<serde_json::Value, ToolError> {
            self.calls
                .lock()
                .unwrap()
                .push((operation.to_string(), args.to_vec()));
            Ok(self.reply.clone())
        }
    }

    /// Renderer that pretends to produce `count` slide images.
    pub struct FakeRenderer {
        pub count: usize,
        pub renders: Mutex<Vec<PathBuf>>,
    }

    impl FakeRenderer {
        pub fn new(count: usize) -> Arc<Self> {
            Arc::new(Self {
                count,
                renders: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn render(&self, _document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
            self.renders.lock().unwrap().push(output_dir.to_path_buf());
            Ok((1..=self.count)
                .map(|i| output_dir.join(format!("slide-{i:03}.jpg")))
                .collect())
        }
    }

    /// A session with a real (empty) presentation file loaded.
    pub fn loaded_session() -> (tempfile::TempDir, Arc<DocumentSession>, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("deck.pptx");
        std::fs::write(&deck, b"pptx").unwrap();
        let session = Arc::new(DocumentSession::new());
        let deck = session.load(&deck).unwrap();
        (dir, session, deck)
    }
}
