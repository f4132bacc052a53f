//! `list_slides`: overview of the presentation structure.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use slidepilot_core::backend::DocumentBackend;
use slidepilot_core::error::ToolError;
use slidepilot_core::tool::{Tool, ToolContext, ToolInput, ToolOutput};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListSlidesInput {
    /// Path to the PowerPoint (.pptx) file. Defaults to the loaded presentation.
    #[serde(default)]
    pub presentation_path: Option<String>,
}

impl ToolInput for ListSlidesInput {
    fn document_path(&self) -> Option<&str> {
        self.presentation_path.as_deref()
    }
}

pub struct ListSlidesTool {
    backend: Arc<dyn DocumentBackend>,
}

impl ListSlidesTool {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ListSlidesTool {
    type Input = ListSlidesInput;

    fn name(&self) -> &'static str {
        "list_slides"
    }

    fn description(&self) -> &'static str {
        "List all slides in the presentation with basic information: slide numbers, titles, and layouts.\n\n\
         Use this first to get an overview of the presentation structure."
    }

    fn status_label(&self) -> &'static str {
        "Listing slides"
    }

    async fn call(&self, ctx: &ToolContext, _input: ListSlidesInput) -> Result<ToolOutput, ToolError> {
        let data = self
            .backend
            .invoke("list_slides", &[crate::document_arg(ctx)])
            .await?;
        Ok(ToolOutput::new(data))
    }
}
