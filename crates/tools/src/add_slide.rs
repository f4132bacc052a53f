//! `add_slide`: insert a new slide.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use slidepilot_core::backend::DocumentBackend;
use slidepilot_core::error::ToolError;
use slidepilot_core::tool::{RefreshScope, Tool, ToolContext, ToolInput, ToolOutput};

use crate::one_based;

const DEFAULT_LAYOUT: &str = "blank";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddSlideInput {
    /// Path to the PowerPoint (.pptx) file. Defaults to the loaded presentation.
    #[serde(default)]
    pub presentation_path: Option<String>,

    /// Position to insert the slide (1-based). Defaults to the end.
    #[serde(default)]
    pub position: Option<i64>,

    /// Slide layout type. Defaults to 'blank'.
    #[serde(default)]
    pub layout: Option<String>,

    /// Initial title text for the slide
    #[serde(default)]
    pub title: Option<String>,
}

impl ToolInput for AddSlideInput {
    fn document_path(&self) -> Option<&str> {
        self.presentation_path.as_deref()
    }

    fn validate(&self) -> Result<(), ToolError> {
        if let Some(position) = self.position {
            one_based("position", position)?;
        }
        Ok(())
    }
}

pub struct AddSlideTool {
    backend: Arc<dyn DocumentBackend>,
}

impl AddSlideTool {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for AddSlideTool {
    type Input = AddSlideInput;

    fn name(&self) -> &'static str {
        "add_slide"
    }

    fn description(&self) -> &'static str {
        "Add a new slide to the presentation. Optionally choose its position, layout, and initial title."
    }

    fn status_label(&self) -> &'static str {
        "Adding new slide"
    }

    fn is_mutating(&self) -> bool {
        true
    }

    fn refresh_scope(&self, _input: &AddSlideInput) -> RefreshScope {
        RefreshScope::All
    }

    async fn call(&self, ctx: &ToolContext, input: AddSlideInput) -> Result<ToolOutput, ToolError> {
        // An empty position argument means "append".
        let position = match input.position {
            Some(p) => one_based("position", p)?.to_string(),
            None => String::new(),
        };
        let layout = input
            .layout
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LAYOUT.to_string());

        let mut args = vec![crate::document_arg(ctx), position, layout];
        if let Some(title) = input.title.filter(|t| !t.is_empty()) {
            args.push(title);
        }

        let data = self.backend.invoke("add_slide", &args).await?;
        Ok(ToolOutput::new(data))
    }
}
