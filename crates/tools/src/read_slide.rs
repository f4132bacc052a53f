//! `read_slide`: shapes and text of one slide.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use slidepilot_core::backend::DocumentBackend;
use slidepilot_core::error::ToolError;
use slidepilot_core::tool::{Tool, ToolContext, ToolInput, ToolOutput};

use crate::one_based;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadSlideInput {
    /// Path to the PowerPoint (.pptx) file. Defaults to the loaded presentation.
    #[serde(default)]
    pub presentation_path: Option<String>,

    /// Slide number to read (1-based indexing)
    pub slide_number: i64,
}

impl ToolInput for ReadSlideInput {
    fn document_path(&self) -> Option<&str> {
        self.presentation_path.as_deref()
    }

    fn validate(&self) -> Result<(), ToolError> {
        one_based("slide_number", self.slide_number).map(|_| ())
    }
}

pub struct ReadSlideTool {
    backend: Arc<dyn DocumentBackend>,
}

impl ReadSlideTool {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ReadSlideTool {
    type Input = ReadSlideInput;

    fn name(&self) -> &'static str {
        "read_slide"
    }

    fn description(&self) -> &'static str {
        "Read the detailed content of one slide: every text shape with its index, type, and text.\n\n\
         Use this before editing to learn which shape index or type to target."
    }

    fn status_label(&self) -> &'static str {
        "Reading slide content"
    }

    async fn call(&self, ctx: &ToolContext, input: ReadSlideInput) -> Result<ToolOutput, ToolError> {
        let slide = one_based("slide_number", input.slide_number)?;
        let data = self
            .backend
            .invoke("read_slide", &[crate::document_arg(ctx), slide.to_string()])
            .await?;
        Ok(ToolOutput::new(data))
    }
}
