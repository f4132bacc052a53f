//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly.
//!
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slidepilot_core::error::ProviderError;
use slidepilot_core::message::{Role, Turn};
use slidepilot_core::provider::*;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    ///
    /// No client-level timeout: the agent loop bounds each call itself.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert turns to Anthropic messages.
    ///
    /// Consecutive turns on the same side are merged into one message so
    /// every tool result from a round lands in a single user message.
    fn to_api_messages(turns: &[Turn]) -> Vec<AnthropicMessage> {
        let mut result: Vec<AnthropicMessage> = Vec::new();

        for turn in turns {
            let block = match turn {
                Turn::UserText { text } | Turn::AssistantText { text } => {
                    if text.is_empty() {
                        continue;
                    }
                    ContentBlock::Text { text: text.clone() }
                }
                Turn::ToolCall { id, name, input } => ContentBlock::ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                },
                Turn::ToolResult {
                    id,
                    output,
                    is_error,
                } => ContentBlock::ToolResult {
                    tool_use_id: id.clone(),
                    content: output.clone(),
                    is_error: *is_error,
                },
            };

            let role = match turn.role() {
                Role::User => "user",
                Role::Assistant => "assistant",
            };

            match result.last_mut() {
                Some(last) if last.role == role => last.content.push(block),
                _ => result.push(AnthropicMessage {
                    role: role.into(),
                    content: vec![block],
                }),
            }
        }

        result
    }

    /// Convert tool definitions to Anthropic format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.turns),
            "max_tokens": request.max_tokens,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if let Some(ref sys) = request.system {
            body["system"] = serde_json::json!(sys);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }

    /// Convert Anthropic API response to our ProviderResponse, preserving item order.
    fn response_to_provider_response(resp: AnthropicResponse) -> ProviderResponse {
        let content = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(ContentItem::Text { text }),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    Some(ContentItem::ToolUse { id, name, input })
                }
                ResponseContentBlock::Other => None,
            })
            .collect();

        ProviderResponse {
            content,
            usage: Some(Usage {
                prompt_tokens: resp.usage.input_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
            }),
            model: resp.model,
            stop_reason: resp.stop_reason,
        }
    }
}

fn network_error(e: reqwest::Error) -> ProviderError {
    ProviderError::Network(e.to_string())
}

#[async_trait]
impl slidepilot_core::Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            provider = "anthropic",
            model = %request.model,
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse Anthropic response: {e}")))?;

        let parsed = Self::response_to_provider_response(api_resp);
        debug!(
            provider = "anthropic",
            items = parsed.content.len(),
            tool_uses = parsed.tool_use_count(),
            stop_reason = ?parsed.stop_reason,
            "Completion received"
        );
        Ok(parsed)
    }

    async fn health_check(&self, model: &str) -> std::result::Result<bool, ProviderError> {
        // Minimal request to verify the API key
        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": model,
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 1,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        // 401/403 = bad key; anything else means reachable
        let status = response.status().as_u16();
        debug!(status, model, "Health check response");
        Ok(!matches!(status, 401 | 403))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidepilot_core::Provider;
    use slidepilot_core::ToolResult;

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider =
            AnthropicProvider::new("sk-ant-test").with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn consecutive_turns_merge_by_side() {
        let turns = vec![
            Turn::user("Current presentation loaded: /tmp/deck.pptx\n\nUser request: tidy up"),
            Turn::assistant("Let me look."),
            Turn::ToolCall {
                id: "toolu_1".into(),
                name: "list_slides".into(),
                input: serde_json::json!({}),
            },
            Turn::ToolCall {
                id: "toolu_2".into(),
                name: "read_slide".into(),
                input: serde_json::json!({"slide_number": 1}),
            },
            ToolResult::ok("toolu_1", "{\"success\":true}").into(),
            ToolResult::error("toolu_2", "slide_number must be 1 or greater (got 0)").into(),
        ];

        let msgs = AnthropicProvider::to_api_messages(&turns);
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].role, "user");
        assert_eq!(msgs[1].role, "assistant");
        assert_eq!(msgs[1].content.len(), 3);
        assert_eq!(msgs[2].role, "user");
        assert_eq!(msgs[2].content.len(), 2);

        match &msgs[2].content[1] {
            ContentBlock::ToolResult {
                tool_use_id,
                is_error,
                ..
            } => {
                assert_eq!(tool_use_id, "toolu_2");
                assert!(*is_error);
            }
            other => panic!("Expected tool_result block, got {other:?}"),
        }
    }

    #[test]
    fn empty_assistant_text_is_skipped() {
        let turns = vec![
            Turn::user("hi"),
            Turn::assistant(""),
            Turn::ToolCall {
                id: "toolu_1".into(),
                name: "list_slides".into(),
                input: serde_json::json!({}),
            },
        ];
        let msgs = AnthropicProvider::to_api_messages(&turns);
        assert_eq!(msgs[1].content.len(), 1);
        assert!(matches!(msgs[1].content[0], ContentBlock::ToolUse { .. }));
    }

    #[test]
    fn successful_tool_result_omits_is_error() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "toolu_1".into(),
            content: "ok".into(),
            is_error: false,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert!(json.get("is_error").is_none());
    }

    #[test]
    fn body_carries_system_tools_and_limits() {
        let request = ProviderRequest {
            model: "claude-3-7-sonnet-latest".into(),
            system: Some("You edit slides.".into()),
            turns: vec![Turn::user("hello")],
            tools: vec![ToolDefinition {
                name: "list_slides".into(),
                description: "List slides".into(),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
            }],
            max_tokens: 2048,
            temperature: None,
        };
        let body = AnthropicProvider::build_body(&request);
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["system"], "You edit slides.");
        assert_eq!(body["tools"][0]["name"], "list_slides");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn parse_mixed_response_preserves_order() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_02",
                "model": "claude-3-7-sonnet-latest",
                "content": [
                    {"type": "text", "text": "Checking"},
                    {"type": "tool_use", "id": "toolu_abc", "name": "read_slide", "input": {"slide_number": 2}},
                    {"type": "thinking", "thinking": "hmm"},
                    {"type": "text", "text": "Done"}
                ],
                "usage": {"input_tokens": 20, "output_tokens": 10},
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();

        let pr = AnthropicProvider::response_to_provider_response(resp);
        assert_eq!(pr.content.len(), 3);
        assert_eq!(pr.content[0], ContentItem::Text { text: "Checking".into() });
        match &pr.content[1] {
            ContentItem::ToolUse { id, name, input } => {
                assert_eq!(id, "toolu_abc");
                assert_eq!(name, "read_slide");
                assert_eq!(input["slide_number"], 2);
            }
            other => panic!("Expected tool use, got {other:?}"),
        }
        assert_eq!(pr.usage.unwrap().total_tokens, 30);
        assert_eq!(pr.stop_reason.as_deref(), Some("tool_use"));
    }

    /// Answer one HTTP request with `status` and return the raw request text.
    async fn serve_once(status: u16) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let body = r#"{"type":"error"}"#;
            let response = format!(
                "HTTP/1.1 {status} Status\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).to_string()
        });
        (base_url, handle)
    }

    #[tokio::test]
    async fn health_check_uses_the_configured_model() {
        let (base_url, server) = serve_once(200).await;
        let provider = AnthropicProvider::new("sk-ant-test").with_base_url(base_url);

        assert!(provider.health_check("claude-3-7-sonnet-latest").await.unwrap());
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/messages"));
        assert!(request.contains("x-api-key: sk-ant-test"));
        assert!(request.contains(r#""model":"claude-3-7-sonnet-latest""#));
    }

    #[tokio::test]
    async fn health_check_reports_rejected_key() {
        let (base_url, server) = serve_once(401).await;
        let provider = AnthropicProvider::new("sk-ant-bad").with_base_url(base_url);

        assert!(!provider.health_check("claude-3-7-sonnet-latest").await.unwrap());
        server.await.unwrap();
    }
}
