//! Configuration loading, validation, and management for SlidePilot.
//!
//! Loads configuration from `~/.slidepilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.slidepilot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Anthropic API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider base URL (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model identifier sent with every inference request
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature; provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Document backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Slide rendering settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Audit log settings
    #[serde(default)]
    pub audit: AuditConfig,
}

fn default_model() -> String {
    "claude-3-7-sonnet-latest".into()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("agent", &self.agent)
            .field("backend", &self.backend)
            .field("render", &self.render)
            .field("audit", &self.audit)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Upper bound on inference rounds per user message. Unset = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,

    /// Timeout for a single inference call
    #[serde(default = "default_inference_timeout")]
    pub inference_timeout_secs: u64,

    /// Prefix user messages with the active presentation path
    #[serde(default = "default_true")]
    pub include_document_context: bool,

    /// Optional system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_inference_timeout() -> u64 {
    120
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_rounds: None,
            inference_timeout_secs: default_inference_timeout(),
            include_document_context: true,
            system_prompt: None,
        }
    }
}

impl AgentSettings {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Interpreter used to run operation scripts
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Directory holding `uno_<operation>.py` scripts
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Timeout for one backend operation
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,

    /// UNO socket host for the headless office service
    #[serde(default = "default_office_host")]
    pub office_host: String,

    /// UNO socket port for the headless office service
    #[serde(default = "default_office_port")]
    pub office_port: u16,

    /// Office binary launched in headless mode when the socket is closed
    #[serde(default = "default_office_binary")]
    pub office_binary: String,
}

fn default_interpreter() -> String {
    "python3".into()
}
fn default_scripts_dir() -> PathBuf {
    PathBuf::from("scripts")
}
fn default_backend_timeout() -> u64 {
    60
}
fn default_office_host() -> String {
    "127.0.0.1".into()
}
fn default_office_port() -> u16 {
    8100
}
fn default_office_binary() -> String {
    "soffice".into()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            scripts_dir: default_scripts_dir(),
            timeout_secs: default_backend_timeout(),
            office_host: default_office_host(),
            office_port: default_office_port(),
            office_binary: default_office_binary(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Where slide images are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Binary used for PPTX → PDF conversion
    #[serde(default = "default_converter")]
    pub converter: String,

    /// Binary used for PDF → JPEG rasterisation
    #[serde(default = "default_rasterizer")]
    pub rasterizer: String,

    /// Rasterisation density (DPI)
    #[serde(default = "default_density")]
    pub density: u32,

    /// Timeout for one full render
    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("slides")
}
fn default_converter() -> String {
    "libreoffice".into()
}
fn default_rasterizer() -> String {
    "convert".into()
}
fn default_density() -> u32 {
    150
}
fn default_render_timeout() -> u64 {
    120
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            converter: default_converter(),
            rasterizer: default_rasterizer(),
            density: default_density(),
            timeout_secs: default_render_timeout(),
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Write the conversation audit log to disk
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Audit log file
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,

    /// Mirror audit entries into the tracing output
    #[serde(default)]
    pub mirror_to_tracing: bool,

    /// Entries kept in memory for the session; the file keeps everything
    #[serde(default = "default_retain_entries")]
    pub retain_entries: usize,
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("slides").join("ai_conversation.log")
}

fn default_retain_entries() -> usize {
    500
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_audit_path(),
            mirror_to_tracing: false,
            retain_entries: default_retain_entries(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.slidepilot/config.toml).
    ///
    /// Also checks environment variables:
    /// - `SLIDEPILOT_API_KEY` (highest priority), then `ANTHROPIC_API_KEY`
    /// - `SLIDEPILOT_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("SLIDEPILOT_API_KEY").or_else(|| lookup("ANTHROPIC_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("SLIDEPILOT_MODEL") {
            self.model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".slidepilot")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.temperature {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "temperature must be between 0.0 and 1.0".into(),
                ));
            }
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be > 0".into()));
        }
        if self.agent.max_rounds == Some(0) {
            return Err(ConfigError::ValidationError(
                "agent.max_rounds must be > 0 (omit it for no limit)".into(),
            ));
        }
        if self.agent.inference_timeout_secs == 0
            || self.backend.timeout_secs == 0
            || self.render.timeout_secs == 0
        {
            return Err(ConfigError::ValidationError("timeouts must be > 0".into()));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            agent: AgentSettings::default(),
            backend: BackendConfig::default(),
            render: RenderConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.agent.max_rounds, None);
        assert_eq!(config.backend.office_port, 8100);
        assert_eq!(config.render.output_dir, PathBuf::from("slides"));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.audit.path, config.audit.path);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "claude-sonnet-4-20250514"

[agent]
max_rounds = 8

[backend]
scripts_dir = "/opt/slidepilot/scripts"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.agent.max_rounds, Some(8));
        assert_eq!(config.agent.inference_timeout_secs, 120);
        assert_eq!(config.backend.scripts_dir, PathBuf::from("/opt/slidepilot/scripts"));
        assert_eq!(config.backend.interpreter, "python3");
        assert_eq!(config.audit.retain_entries, 500);
    }

    #[test]
    fn zero_round_cap_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_rounds = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: Some(3.0),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unparseable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model, default_model());
    }

    #[test]
    fn env_overrides_take_priority() {
        let env: HashMap<&str, &str> = [
            ("ANTHROPIC_API_KEY", "sk-ant-fallback"),
            ("SLIDEPILOT_API_KEY", "sk-ant-primary"),
            ("SLIDEPILOT_MODEL", "claude-opus-4-20250514"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sk-ant-primary"));
        assert_eq!(config.model, "claude-opus-4-20250514");
        assert!(config.has_api_key());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-ant-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
