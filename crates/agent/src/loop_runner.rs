//! The agent reasoning loop implementation.

use std::sync::Arc;
use std::time::Duration;

use slidepilot_audit::AuditKind;
use slidepilot_config::AppConfig;
use slidepilot_core::error::{Error, ProviderError};
use slidepilot_core::event::LiveEvent;
use slidepilot_core::message::Conversation;
use slidepilot_core::provider::{ContentItem, Provider, ProviderRequest};
use slidepilot_core::tool::ToolCall;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::executor::Executor;

/// How a loop invocation ended. Provider failures are returned as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model answered without requesting tools.
    Completed { text: String, rounds: u32 },

    /// The cancellation token fired before the next inference call.
    Cancelled { rounds: u32 },

    /// The configured round cap was hit while the model still wanted tools.
    RoundLimitReached { rounds: u32 },
}

impl LoopOutcome {
    pub fn rounds(&self) -> u32 {
        match self {
            Self::Completed { rounds, .. }
            | Self::Cancelled { rounds }
            | Self::RoundLimitReached { rounds } => *rounds,
        }
    }
}

/// The core agent loop that orchestrates inference calls and tool execution.
pub struct AgentLoop {
    /// The inference provider
    provider: Arc<dyn Provider>,

    /// Runs tool calls and owns the audit log and live events
    executor: Arc<Executor>,

    /// The model to use
    model: String,

    system_prompt: Option<String>,

    /// Max output tokens per response
    max_tokens: u32,

    temperature: Option<f32>,

    /// Round cap; `None` means unbounded
    max_rounds: Option<u32>,

    /// Bound on a single inference call
    inference_timeout: Duration,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(provider: Arc<dyn Provider>, executor: Arc<Executor>, model: impl Into<String>) -> Self {
        Self {
            provider,
            executor,
            model: model.into(),
            system_prompt: None,
            max_tokens: 2048,
            temperature: None,
            max_rounds: None,
            inference_timeout: Duration::from_secs(120),
        }
    }

    /// Create a loop with model, limits, and prompt taken from configuration.
    pub fn from_config(provider: Arc<dyn Provider>, executor: Arc<Executor>, config: &AppConfig) -> Self {
        let mut agent = Self::new(provider, executor, &config.model)
            .with_max_tokens(config.max_tokens)
            .with_inference_timeout(config.agent.inference_timeout());
        agent.temperature = config.temperature;
        if let Some(max) = config.agent.max_rounds {
            agent = agent.with_max_rounds(max);
        }
        if let Some(prompt) = &config.agent.system_prompt {
            agent = agent.with_system_prompt(prompt);
        }
        agent
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the max tokens per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    /// Stop after this many inference rounds.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = Some(max);
        self
    }

    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = timeout;
        self
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    /// Drive rounds until the model stops requesting tools.
    ///
    /// The caller has already appended the user turn. Each round sends the
    /// full conversation and the full tool catalogue, then runs the
    /// requested tools strictly in order.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome, Error> {
        info!(
            conversation_id = %conversation.id,
            turns = conversation.len(),
            "Processing conversation"
        );

        let audit = self.executor.audit();
        let events = self.executor.events();
        let tool_definitions = self.executor.registry().definitions();
        let mut rounds = 0;

        loop {
            if cancel.is_cancelled() {
                info!(conversation_id = %conversation.id, rounds, "Agent loop cancelled");
                audit.record(AuditKind::Debug, "Agent loop cancelled", None);
                return Ok(LoopOutcome::Cancelled { rounds });
            }

            if self.max_rounds.is_some_and(|max| rounds >= max) {
                warn!(conversation_id = %conversation.id, rounds, "Round limit reached");
                audit.record(
                    AuditKind::Debug,
                    format!("Round limit reached after {rounds} rounds"),
                    None,
                );
                return Ok(LoopOutcome::RoundLimitReached { rounds });
            }

            rounds += 1;
            debug!(conversation_id = %conversation.id, round = rounds, "Agent loop round");

            let request = ProviderRequest {
                model: self.model.clone(),
                system: self.system_prompt.clone(),
                turns: conversation.snapshot().to_vec(),
                tools: tool_definitions.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };

            let completion = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(conversation_id = %conversation.id, rounds, "Agent loop cancelled during inference");
                    audit.record(AuditKind::Debug, "Agent loop cancelled during inference", None);
                    return Ok(LoopOutcome::Cancelled { rounds });
                }
                result = tokio::time::timeout(self.inference_timeout, self.provider.complete(request)) => result,
            };

            let response = match completion {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(self.provider_failure(e)),
                Err(_) => {
                    return Err(self.provider_failure(ProviderError::Timeout(
                        self.inference_timeout.as_secs(),
                    )));
                }
            };

            debug!(
                items = response.content.len(),
                tool_uses = response.tool_use_count(),
                stop_reason = ?response.stop_reason,
                "Response received"
            );

            conversation.push_assistant(response.content.iter().map(ContentItem::to_turn));

            let mut results = Vec::new();
            for item in &response.content {
                match item {
                    ContentItem::Text { text } => {
                        if text.is_empty() {
                            continue;
                        }
                        audit.record(AuditKind::Assistant, text.clone(), None);
                        events.emit(LiveEvent::AssistantMessage { text: text.clone() });
                    }
                    ContentItem::ToolUse { id, name, input } => {
                        events.emit(LiveEvent::ToolStatus {
                            tool: name.clone(),
                            label: self.executor.status_label(name),
                        });
                        let call = ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            arguments: input.clone(),
                        };
                        results.push(self.executor.execute(&call).await);
                    }
                }
            }

            if results.is_empty() {
                info!(conversation_id = %conversation.id, rounds, "Agent loop completed");
                return Ok(LoopOutcome::Completed {
                    text: response.text(),
                    rounds,
                });
            }

            debug!(count = results.len(), "Appending tool results");
            conversation.push_tool_results(results);
        }
    }

    fn provider_failure(&self, error: ProviderError) -> Error {
        warn!(provider = self.provider.name(), error = %error, "Inference failed");
        let message = format!("AI request failed: {error}");
        self.executor
            .audit()
            .record(AuditKind::Error, message.clone(), None);
        self.executor.events().emit(LiveEvent::Error { message });
        Error::Provider(error)
    }
}
