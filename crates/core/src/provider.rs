//! Provider trait: the abstraction over the inference backend.
//!
//! A Provider takes the full conversation plus the tool catalogue and returns
//! one model response as an ordered list of content items. The agent loop
//! treats it as an opaque request/response call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Turn;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "claude-3-7-sonnet-latest")
    pub model: String,

    /// Optional system instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// The full conversation, in order
    pub turns: Vec<Turn>,

    /// Available tools the model can call, in catalogue order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature; provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// One item of a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

impl ContentItem {
    /// The conversation turn this item is recorded as.
    pub fn to_turn(&self) -> Turn {
        match self {
            Self::Text { text } => Turn::AssistantText { text: text.clone() },
            Self::ToolUse { id, name, input } => Turn::ToolCall {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
        }
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Content items in the order the model produced them
    pub content: Vec<ContentItem>,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Why generation stopped, if the provider says
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl ProviderResponse {
    /// Number of tool-use items in this response.
    pub fn tool_use_count(&self) -> usize {
        self.content
            .iter()
            .filter(|c| matches!(c, ContentItem::ToolUse { .. }))
            .count()
    }

    /// All text items joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ContentItem::Text { text } => Some(text.as_str()),
                ContentItem::ToolUse { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The agent loop calls `complete()` without knowing which backend answers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Check that the provider is reachable and accepts our credentials for `model`.
    async fn health_check(&self, _model: &str) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
