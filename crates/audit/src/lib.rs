//! Audit logging: durable record of every turn and tool invocation.
//!
//! The logger keeps entries in memory and forwards each one to its sinks.
//! Sinks never report failure to the caller: a sink that cannot write logs a
//! warning and moves on, so the agent loop is never blocked by the audit log.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Entries kept in memory unless a logger is built with another limit.
pub const DEFAULT_RETENTION: usize = 500;

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Local>,
    pub kind: AuditKind,
    pub message: String,
    pub details: Option<String>,
}

/// Kinds of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    /// Text sent by the user
    User,
    /// Text produced by the model
    Assistant,
    /// The model requested a tool
    ToolCall,
    /// Executor internals: decoded input, resolved document, refresh outcome
    ToolDebug,
    /// A tool finished successfully
    ToolResult,
    /// A tool failed
    ToolError,
    /// A turn failed
    Error,
    Debug,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
            Self::ToolCall => "TOOL_CALL",
            Self::ToolDebug => "TOOL_DEBUG",
            Self::ToolResult => "TOOL_RESULT",
            Self::ToolError => "TOOL_ERROR",
            Self::Error => "ERROR",
            Self::Debug => "DEBUG",
        }
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuditEntry {
    /// Render as one text block:
    ///
    /// ```text
    /// [2025-03-01 14:02:11] TOOL_CALL: Calling tool: list_slides
    /// Details: Input: {}
    /// ---
    /// ```
    pub fn to_block(&self) -> String {
        let mut block = format!(
            "[{}] {}: {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.kind,
            self.message
        );
        if let Some(details) = self.details.as_deref().filter(|d| !d.is_empty()) {
            block.push_str("Details: ");
            block.push_str(details);
            block.push('\n');
        }
        block.push_str("---\n");
        block
    }
}

/// Trait for audit log sinks (where entries are written).
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Audit logger that stores entries in memory and forwards them to sinks.
///
/// Only the newest `retention` entries stay in memory; the sinks see all of them.
pub struct AuditLogger {
    entries: Mutex<VecDeque<AuditEntry>>,
    retention: usize,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.count())
            .field("retention", &self.retention)
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    /// Create a new audit logger with no sinks.
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    /// Create a new audit logger with the given sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            retention: DEFAULT_RETENTION,
            sinks,
        }
    }

    /// Keep at most `max` entries in memory. Zero keeps none.
    pub fn with_retention(mut self, max: usize) -> Self {
        self.retention = max;
        self
    }

    /// Record an audit entry.
    pub fn record(&self, kind: AuditKind, message: impl Into<String>, details: Option<String>) {
        let entry = AuditEntry {
            timestamp: Local::now(),
            kind,
            message: message.into(),
            details,
        };

        for sink in &self.sinks {
            sink.record(&entry);
        }

        if self.retention == 0 {
            return;
        }
        let mut entries = self.lock();
        while entries.len() >= self.retention {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Get all recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Get entries of one kind.
    pub fn entries_by_kind(&self, kind: AuditKind) -> Vec<AuditEntry> {
        self.lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Clear all stored entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Count of stored entries.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A tracing-based audit sink that logs entries via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::info!(
            kind = %entry.kind,
            message = %entry.message,
            details = ?entry.details,
            "AUDIT"
        );
    }
}

/// Appends text blocks to a log file.
///
/// The directory is created and the file opened on the first write; the
/// handle then stays open. A failed write drops the handle so the next entry
/// reopens the file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> std::io::Result<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
    }

    fn append(&self, block: &str) -> std::io::Result<()> {
        let mut slot = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let file = match slot.as_mut() {
            Some(file) => file,
            None => slot.insert(self.open()?),
        };
        let written = file.write_all(block.as_bytes()).and_then(|()| file.flush());
        if written.is_err() {
            *slot = None;
        }
        written
    }
}

impl AuditSink for FileSink {
    fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.append(&entry.to_block()) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write audit log");
        }
    }
}
