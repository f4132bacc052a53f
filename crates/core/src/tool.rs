//! Tool trait and registry: the catalogue of operations the model may request.
//!
//! A tool is written against a typed input struct. The registry erases that
//! type behind a [`ToolDescriptor`] whose JSON schema is generated from the
//! very same struct, so the schema sent to the model and the decoder used at
//! call time cannot drift apart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, ToolError};
use crate::provider::ToolDefinition;
use crate::session::DocumentSession;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_use id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Raw arguments as produced by the model
    pub arguments: serde_json::Value,
}

/// The result of a tool invocation, as fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// The output content (JSON payload or error message)
    pub output: String,

    /// Whether the invocation failed
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            is_error: true,
        }
    }
}

/// Structured payload returned by a tool handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub data: serde_json::Value,
}

impl ToolOutput {
    pub fn new(data: serde_json::Value) -> Self {
        Self { data }
    }

    /// Whether the backend reported `"success": true`.
    pub fn succeeded(&self) -> bool {
        self.data
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Attach an extra top-level field. No-op for non-object payloads.
    pub fn annotate(&mut self, key: &str, value: serde_json::Value) {
        if let Some(map) = self.data.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }

    /// The string handed back to the model.
    pub fn render(&self) -> String {
        self.data.to_string()
    }
}

/// Which rendered artifacts a successful mutation invalidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshScope {
    /// Only these slides (1-based).
    Slides(Vec<u32>),
    /// Every slide; numbering may have shifted.
    All,
}

/// Everything a handler gets besides its decoded input.
#[derive(Clone)]
pub struct ToolContext {
    /// Absolute path of the document this call operates on.
    pub document: PathBuf,

    /// The shared document session.
    pub session: Arc<DocumentSession>,
}

/// Typed input of a tool.
pub trait ToolInput: DeserializeOwned + JsonSchema + Send + Sync + 'static {
    /// Document path supplied by the model, if any.
    fn document_path(&self) -> Option<&str>;

    /// Field checks that must hold before the handler runs.
    fn validate(&self) -> Result<(), ToolError> {
        Ok(())
    }
}

/// The core Tool trait.
///
/// Each slide operation implements this trait against its own input type.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Input: ToolInput;

    /// The unique name of this tool (e.g., "list_slides").
    fn name(&self) -> &'static str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &'static str;

    /// Short progress label shown to observers while the tool runs.
    fn status_label(&self) -> &'static str;

    /// Mutating tools trigger an auto-refresh after a successful call.
    fn is_mutating(&self) -> bool {
        false
    }

    /// Artifacts a successful call invalidates. Only consulted for mutating tools.
    fn refresh_scope(&self, _input: &Self::Input) -> RefreshScope {
        RefreshScope::All
    }

    /// Run the operation.
    async fn call(&self, ctx: &ToolContext, input: Self::Input) -> Result<ToolOutput, ToolError>;
}

/// A successful handler run, with the facts the executor needs afterwards.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub document: PathBuf,
    pub output: ToolOutput,
    pub refresh: Option<RefreshScope>,
}

#[async_trait]
trait ErasedTool: Send + Sync {
    async fn invoke(
        &self,
        raw: serde_json::Value,
        session: Arc<DocumentSession>,
    ) -> Result<Invocation, ToolError>;
}

struct Erased<T>(T);

#[async_trait]
impl<T: Tool> ErasedTool for Erased<T> {
    async fn invoke(
        &self,
        raw: serde_json::Value,
        session: Arc<DocumentSession>,
    ) -> Result<Invocation, ToolError> {
        let input = decode_input::<T::Input>(raw)?;
        input.validate()?;

        let document = resolve_document(input.document_path(), &session)?;
        let refresh = self.0.is_mutating().then(|| self.0.refresh_scope(&input));

        debug!(tool = self.0.name(), document = %document.display(), "Invoking tool handler");
        let ctx = ToolContext {
            document: document.clone(),
            session,
        };
        let output = self.0.call(&ctx, input).await?;

        Ok(Invocation {
            document,
            output,
            refresh,
        })
    }
}

/// Decode raw model arguments into a typed input.
///
/// A missing argument object is treated as `{}` so tools with only optional
/// fields accept it.
pub fn decode_input<I: DeserializeOwned>(raw: serde_json::Value) -> Result<I, ToolError> {
    let raw = if raw.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        raw
    };
    serde_json::from_value(raw).map_err(|e| ToolError::InvalidArguments(format!("failed to parse input: {e}")))
}

/// Pick the explicit path when given, otherwise fall back to the active document.
fn resolve_document(explicit: Option<&str>, session: &DocumentSession) -> Result<PathBuf, ToolError> {
    let path = match explicit.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => PathBuf::from(p),
        None => session.active_path().ok_or(ToolError::NoDocument)?,
    };
    if !Path::new(&path).exists() {
        return Err(ToolError::DocumentNotFound(path.display().to_string()));
    }
    Ok(path)
}

/// JSON schema for a tool input, inlined and stripped of meta fields.
pub fn input_schema<I: JsonSchema>() -> Result<serde_json::Value, serde_json::Error> {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.option_add_null_type = false;
    });
    let root = settings.into_generator().into_root_schema_for::<I>();
    let mut schema = serde_json::to_value(root)?;
    if let Some(map) = schema.as_object_mut() {
        map.remove("$schema");
        map.remove("title");
    }
    Ok(schema)
}

/// An immutable catalogue entry.
pub struct ToolDescriptor {
    name: &'static str,
    description: &'static str,
    status_label: &'static str,
    parameters: serde_json::Value,
    mutating: bool,
    handler: Box<dyn ErasedTool>,
}

impl ToolDescriptor {
    fn new<T: Tool>(tool: T) -> Result<Self, RegistryError> {
        let parameters = input_schema::<T::Input>().map_err(|e| RegistryError::Schema {
            tool: tool.name().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: tool.name(),
            description: tool.description(),
            status_label: tool.status_label(),
            parameters,
            mutating: tool.is_mutating(),
            handler: Box::new(Erased(tool)),
        })
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn description(&self) -> &str {
        self.description
    }

    pub fn status_label(&self) -> &str {
        self.status_label
    }

    pub fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }

    pub fn is_mutating(&self) -> bool {
        self.mutating
    }

    /// Convert this descriptor into a ToolDefinition for sending to the LLM.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.parameters.clone(),
        }
    }

    /// Decode, validate, resolve the document, and run the handler.
    pub async fn invoke(
        &self,
        raw: serde_json::Value,
        session: Arc<DocumentSession>,
    ) -> Result<Invocation, ToolError> {
        self.handler.invoke(raw, session).await
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("mutating", &self.mutating)
            .finish()
    }
}

/// A registry of available tools.
///
/// Populated once at startup, then shared behind an `Arc` and only read.
/// Listing order is registration order so prompts are reproducible.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<(), RegistryError> {
        let name = tool.name();
        if self.index.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        let descriptor = ToolDescriptor::new(tool)?;
        self.index.insert(name, self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All descriptors in registration order.
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolDescriptor::to_definition).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
