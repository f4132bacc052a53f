//! Document session: which presentation is active and what has been rendered.
//!
//! Shared between the tool handlers (which may switch or refresh the active
//! document) and observers (which read the current name and slide images).
//! All state sits behind one `RwLock`, so readers never see a half-updated
//! path/artifact pair.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct SessionState {
    active: Option<PathBuf>,
    /// Latest rendered slide images, in slide order.
    artifacts: Vec<PathBuf>,
    /// Data-URI cache keyed by artifact path.
    data_uris: HashMap<PathBuf, String>,
}

/// Process-wide state for the currently loaded presentation.
#[derive(Debug, Default)]
pub struct DocumentSession {
    state: RwLock<SessionState>,
}

impl DocumentSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `path` the active document. The path is stored in absolute form.
    ///
    /// Any cached renderings belong to the previous document and are dropped.
    pub fn load(&self, path: impl AsRef<Path>) -> std::io::Result<PathBuf> {
        let absolute = std::path::absolute(path.as_ref())?;
        if !absolute.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("presentation file not found: {}", absolute.display()),
            ));
        }
        let mut state = self.write();
        state.active = Some(absolute.clone());
        state.artifacts.clear();
        state.data_uris.clear();
        info!(document = %absolute.display(), "Loaded presentation");
        Ok(absolute)
    }

    /// Absolute path of the active document, if one is loaded.
    pub fn active_path(&self) -> Option<PathBuf> {
        self.read().active.clone()
    }

    pub fn has_document(&self) -> bool {
        self.read().active.is_some()
    }

    /// File name of the active document, or an empty string.
    pub fn document_name(&self) -> String {
        self.read()
            .active
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Replace the rendered artifact list. Cached data for stale paths is dropped.
    pub fn set_artifacts(&self, artifacts: Vec<PathBuf>) {
        let mut state = self.write();
        state.data_uris.clear();
        debug!(count = artifacts.len(), "Artifact list updated");
        state.artifacts = artifacts;
    }

    /// The latest rendered artifacts, in slide order.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.read().artifacts.clone()
    }

    /// Drop cached image data, keeping the artifact list.
    pub fn clear_artifact_cache(&self) {
        self.write().data_uris.clear();
    }

    pub fn cached_artifact_count(&self) -> usize {
        self.read().data_uris.len()
    }

    /// Read an artifact as a `data:` URI.
    ///
    /// The encoded result is cached only while `path` is in the current
    /// artifact list, so a render that lands mid-read never leaves stale data.
    pub fn artifact_data_uri(&self, path: &Path) -> std::io::Result<String> {
        if let Some(uri) = self.read().data_uris.get(path) {
            return Ok(uri.clone());
        }

        let bytes = std::fs::read(path)?;
        let mime = match path.extension().and_then(|e| e.to_str()) {
            Some("png") => "image/png",
            _ => "image/jpeg",
        };
        let uri = format!("data:{mime};base64,{}", STANDARD.encode(bytes));

        let mut state = self.write();
        if let Some(cached) = state.data_uris.get(path) {
            return Ok(cached.clone());
        }
        if state.artifacts.iter().any(|a| a == path) {
            state.data_uris.insert(path.to_path_buf(), uri.clone());
        }
        Ok(uri)
    }
}
