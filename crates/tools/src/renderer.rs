//! Slide rendering through LibreOffice and ImageMagick.
//!
//! PPTX → PDF with `libreoffice --headless --convert-to pdf` into a scratch
//! directory, then PDF → `slide-NNN.jpg` with `convert -density <dpi>`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use slidepilot_config::RenderConfig;
use slidepilot_core::backend::Renderer;
use slidepilot_core::error::ToolError;
use tokio::process::Command;
use tracing::{debug, info, warn};

const IMAGE_PREFIX: &str = "slide-";

#[derive(Debug, Clone)]
pub struct LibreOfficeRenderer {
    converter: String,
    rasterizer: String,
    density: u32,
    timeout: Duration,
}

impl LibreOfficeRenderer {
    pub fn new(converter: impl Into<String>, rasterizer: impl Into<String>, density: u32, timeout: Duration) -> Self {
        Self {
            converter: converter.into(),
            rasterizer: rasterizer.into(),
            density,
            timeout,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            &config.converter,
            &config.rasterizer,
            config.density,
            config.timeout(),
        )
    }

    async fn run(&self, mut cmd: Command, step: &str) -> Result<(), ToolError> {
        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| ToolError::Timeout {
                operation: step.to_string(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| render_error(format!("{step} could not start: {e}"), String::new()))?;

        if !output.status.success() {
            return Err(render_error(
                format!("{step} failed with {}", output.status),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }
}

fn render_error(reason: String, output: String) -> ToolError {
    ToolError::Backend {
        operation: "export_slides".into(),
        reason,
        output,
    }
}

#[async_trait]
impl Renderer for LibreOfficeRenderer {
    async fn render(&self, document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| render_error(format!("failed to create {}: {e}", output_dir.display()), String::new()))?;

        // Scratch sits inside the output directory: rename needs a single filesystem.
        let scratch = tempfile::Builder::new()
            .prefix(".render-")
            .tempdir_in(output_dir)
            .map_err(|e| render_error(format!("failed to create temp directory: {e}"), String::new()))?;

        debug!(document = %document.display(), "Converting presentation to PDF");
        let mut convert = Command::new(&self.converter);
        convert
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(scratch.path())
            .arg(document);
        self.run(convert, "pdf conversion").await?;

        let stem = document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pdf = scratch.path().join(format!("{stem}.pdf"));
        if !pdf.exists() {
            return Err(render_error(
                format!("PDF file not found at {}", pdf.display()),
                String::new(),
            ));
        }

        debug!(pdf = %pdf.display(), density = self.density, "Rasterising slides");
        let mut rasterize = Command::new(&self.rasterizer);
        rasterize
            .arg("-density")
            .arg(self.density.to_string())
            .arg(&pdf)
            .arg(scratch.path().join(format!("{IMAGE_PREFIX}%03d.jpg")));
        self.run(rasterize, "rasterisation").await?;

        let fresh = list_artifacts(scratch.path())?;
        if fresh.is_empty() {
            return Err(render_error("no JPEG files were generated".into(), String::new()));
        }

        // Only a complete render replaces what observers are looking at.
        for stale in list_artifacts(output_dir)? {
            if let Err(e) = tokio::fs::remove_file(&stale).await {
                warn!(path = %stale.display(), error = %e, "Could not remove stale slide image");
            }
        }
        for image in &fresh {
            let Some(name) = image.file_name() else { continue };
            let target = output_dir.join(name);
            tokio::fs::rename(image, &target).await.map_err(|e| {
                render_error(format!("failed to move {}: {e}", target.display()), String::new())
            })?;
        }

        let slides = list_artifacts(output_dir)?;
        if slides.is_empty() {
            return Err(render_error("no JPEG files were generated".into(), String::new()));
        }
        info!(
            document = %document.display(),
            count = slides.len(),
            output_dir = %output_dir.display(),
            "Slides rendered"
        );
        Ok(slides)
    }
}

/// Rendered slide images in `dir`, sorted. A missing directory yields nothing.
pub fn list_artifacts(dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(render_error(
                format!("failed to read {}: {e}", dir.display()),
                String::new(),
            ));
        }
    };

    let mut slides: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let is_jpeg = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
            name.starts_with(IMAGE_PREFIX) && is_jpeg
        })
        .map(|path| std::path::absolute(&path).unwrap_or(path))
        .collect();
    slides.sort();
    Ok(slides)
}
