//! `export_slides`: render slides to JPEG images.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use slidepilot_core::backend::{Renderer, select_slides};
use slidepilot_core::error::ToolError;
use slidepilot_core::tool::{Tool, ToolContext, ToolInput, ToolOutput};

use crate::one_based;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportSlidesInput {
    /// Path to the PowerPoint (.pptx) file. Defaults to the loaded presentation.
    #[serde(default)]
    pub presentation_path: Option<String>,

    /// Specific slides to export (1-based). Defaults to all slides.
    #[serde(default)]
    pub slide_numbers: Option<Vec<i64>>,

    /// Directory to save images. Defaults to 'slides/'.
    #[serde(default)]
    pub output_dir: Option<String>,
}

impl ToolInput for ExportSlidesInput {
    fn document_path(&self) -> Option<&str> {
        self.presentation_path.as_deref()
    }

    fn validate(&self) -> Result<(), ToolError> {
        for &n in self.slide_numbers.iter().flatten() {
            one_based("slide_numbers", n)?;
        }
        Ok(())
    }
}

pub struct ExportSlidesTool {
    renderer: Arc<dyn Renderer>,
    default_dir: PathBuf,
}

impl ExportSlidesTool {
    pub fn new(renderer: Arc<dyn Renderer>, default_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            default_dir: default_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for ExportSlidesTool {
    type Input = ExportSlidesInput;

    fn name(&self) -> &'static str {
        "export_slides"
    }

    fn description(&self) -> &'static str {
        "Export slides as JPEG images for preview or verification.\n\n\
         Useful after edits to check the result. Exports all slides unless specific slide numbers are given."
    }

    fn status_label(&self) -> &'static str {
        "Exporting slides"
    }

    async fn call(&self, ctx: &ToolContext, input: ExportSlidesInput) -> Result<ToolOutput, ToolError> {
        let selection = input
            .slide_numbers
            .unwrap_or_default()
            .into_iter()
            .map(|n| one_based("slide_numbers", n))
            .collect::<Result<Vec<u32>, _>>()?;

        let output_dir = input
            .output_dir
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_dir.clone());

        let rendered = self.renderer.render(&ctx.document, &output_dir).await?;

        // A full render into the session's own directory is the new preview set.
        if same_dir(&output_dir, &self.default_dir) {
            ctx.session.set_artifacts(rendered.clone());
        }

        let slides = select_slides(rendered, &selection);
        Ok(ToolOutput::new(serde_json::json!({
            "success": true,
            "slide_count": slides.len(),
            "slides": slides,
            "output_dir": output_dir,
        })))
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (std::path::absolute(a), std::path::absolute(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
