//! Chat session: one conversation driven through the agent loop.

use std::path::{Path, PathBuf};

use slidepilot_audit::AuditKind;
use slidepilot_core::error::{Error, ToolError};
use slidepilot_core::event::LiveEvent;
use slidepilot_core::message::Conversation;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::loop_runner::{AgentLoop, LoopOutcome};

/// Owns the conversation history for one logical chat.
///
/// `send` takes `&mut self`, so a session never has two inference loops in
/// flight at once.
pub struct ChatSession {
    agent: AgentLoop,
    conversation: Conversation,
    include_document_context: bool,
}

impl ChatSession {
    pub fn new(agent: AgentLoop) -> Self {
        Self {
            agent,
            conversation: Conversation::new(),
            include_document_context: true,
        }
    }

    /// Toggle the "Current presentation loaded" prefix on user messages.
    pub fn with_document_context(mut self, enabled: bool) -> Self {
        self.include_document_context = enabled;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// File name of the active presentation, or empty.
    pub fn document_name(&self) -> String {
        self.agent.executor().session().document_name()
    }

    /// The latest rendered slide images.
    pub fn slides(&self) -> Vec<PathBuf> {
        self.agent.executor().session().artifacts()
    }

    /// Send one user message and run the loop to completion.
    ///
    /// The cached image data is dropped afterwards whatever the outcome.
    pub async fn send(
        &mut self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome, Error> {
        let executor = self.agent.executor().clone();
        executor
            .audit()
            .record(AuditKind::User, message.to_string(), None);

        let text = match executor.session().active_path() {
            Some(path) if self.include_document_context => format!(
                "Current presentation loaded: {}\n\nUser request: {message}",
                path.display()
            ),
            _ => message.to_string(),
        };
        self.conversation.push_user(text);

        let outcome = self.agent.run(&mut self.conversation, cancel).await;
        executor.session().clear_artifact_cache();
        outcome
    }

    /// Render every slide of `path`, then make it the active presentation.
    pub async fn open_document(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>, Error> {
        let executor = self.agent.executor();
        let absolute = std::path::absolute(path.as_ref())
            .map_err(|e| ToolError::DocumentNotFound(format!("{}: {e}", path.as_ref().display())))?;
        if !absolute.is_file() {
            return Err(ToolError::DocumentNotFound(absolute.display().to_string()).into());
        }

        let slides = match executor.renderer().render(&absolute, executor.output_dir()).await {
            Ok(slides) => slides,
            Err(e) => {
                let message = format!("Failed to load presentation: {e}");
                executor.audit().record(AuditKind::Error, message.clone(), None);
                executor.events().emit(LiveEvent::Error { message });
                return Err(e.into());
            }
        };

        let loaded = executor
            .session()
            .load(&absolute)
            .map_err(|e| ToolError::DocumentNotFound(e.to_string()))?;
        executor.session().set_artifacts(slides.clone());
        info!(document = %loaded.display(), slides = slides.len(), "Presentation opened");
        executor.audit().record(
            AuditKind::Debug,
            format!("Loaded presentation {}", loaded.display()),
            Some(format!("{} slide image(s)", slides.len())),
        );
        executor.events().emit(LiveEvent::SlidesUpdated {
            slides: slides.iter().map(|p| p.display().to_string()).collect(),
        });
        Ok(slides)
    }
}
