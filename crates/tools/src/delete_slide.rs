//! `delete_slide`: remove one slide. Later slides are renumbered.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use slidepilot_core::backend::DocumentBackend;
use slidepilot_core::error::ToolError;
use slidepilot_core::tool::{RefreshScope, Tool, ToolContext, ToolInput, ToolOutput};

use crate::one_based;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteSlideInput {
    /// Path to the PowerPoint (.pptx) file. Defaults to the loaded presentation.
    #[serde(default)]
    pub presentation_path: Option<String>,

    /// Slide number to delete (1-based indexing)
    pub slide_number: i64,
}

impl ToolInput for DeleteSlideInput {
    fn document_path(&self) -> Option<&str> {
        self.presentation_path.as_deref()
    }

    fn validate(&self) -> Result<(), ToolError> {
        one_based("slide_number", self.slide_number).map(|_| ())
    }
}

pub struct DeleteSlideTool {
    backend: Arc<dyn DocumentBackend>,
}

impl DeleteSlideTool {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for DeleteSlideTool {
    type Input = DeleteSlideInput;

    fn name(&self) -> &'static str {
        "delete_slide"
    }

    fn description(&self) -> &'static str {
        "Delete a slide from the presentation. Slides after it are renumbered automatically."
    }

    fn status_label(&self) -> &'static str {
        "Deleting slide"
    }

    fn is_mutating(&self) -> bool {
        true
    }

    fn refresh_scope(&self, _input: &DeleteSlideInput) -> RefreshScope {
        RefreshScope::All
    }

    async fn call(&self, ctx: &ToolContext, input: DeleteSlideInput) -> Result<ToolOutput, ToolError> {
        let slide = one_based("slide_number", input.slide_number)?;
        let data = self
            .backend
            .invoke("delete_slide", &[crate::document_arg(ctx), slide.to_string()])
            .await?;
        Ok(ToolOutput::new(data))
    }
}
