//! Operation executor: runs one tool call and normalises the outcome.
//!
//! Every failure a tool can hit becomes a [`ToolResult`] with `is_error`
//! set; nothing escapes to the agent loop. Successful mutations trigger one
//! re-render of the slides so observers see the change.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidepilot_audit::{AuditKind, AuditLogger};
use slidepilot_core::backend::{Renderer, select_slides};
use slidepilot_core::error::ToolError;
use slidepilot_core::event::{EventBus, LiveEvent};
use slidepilot_core::session::DocumentSession;
use slidepilot_core::tool::{RefreshScope, ToolCall, ToolOutput, ToolRegistry, ToolResult};
use tracing::{debug, info, warn};

pub struct Executor {
    registry: Arc<ToolRegistry>,
    session: Arc<DocumentSession>,
    renderer: Arc<dyn Renderer>,
    output_dir: PathBuf,
    audit: Arc<AuditLogger>,
    events: EventBus,
}

impl Executor {
    pub fn new(
        registry: Arc<ToolRegistry>,
        session: Arc<DocumentSession>,
        renderer: Arc<dyn Renderer>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            session,
            renderer,
            output_dir: output_dir.into(),
            audit: Arc::new(AuditLogger::new()),
            events: EventBus::default(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Arc<DocumentSession> {
        &self.session
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.audit
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Progress label for a tool, falling back to "Executing <name>".
    pub fn status_label(&self, name: &str) -> String {
        self.registry
            .get(name)
            .map(|d| d.status_label().to_string())
            .unwrap_or_else(|| format!("Executing {name}"))
    }

    /// Execute one tool call. Never fails: errors come back as `is_error` results.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        self.audit.record(
            AuditKind::ToolCall,
            format!("Calling tool: {}", call.name),
            Some(format!("ID: {}, Input: {}", call.id, call.arguments)),
        );

        let Some(descriptor) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return self.fail(call, ToolError::NotFound(call.name.clone()));
        };

        let invocation = match descriptor
            .invoke(call.arguments.clone(), self.session.clone())
            .await
        {
            Ok(invocation) => invocation,
            Err(e) => return self.fail(call, e),
        };

        let mut output = invocation.output;
        if let Some(scope) = invocation.refresh.filter(|_| output.succeeded()) {
            self.refresh(&call.name, &invocation.document, scope, &mut output)
                .await;
        }

        let rendered = output.render();
        info!(tool = %call.name, success = output.succeeded(), "Tool completed");
        self.audit.record(
            AuditKind::ToolResult,
            format!("Tool {} completed", call.name),
            Some(rendered.clone()),
        );
        ToolResult::ok(&call.id, rendered)
    }

    fn fail(&self, call: &ToolCall, error: ToolError) -> ToolResult {
        let stage = match &error {
            ToolError::NotFound(_) => "Unknown tool",
            ToolError::InvalidArguments(_) | ToolError::InvalidIndex { .. } => "Invalid input",
            ToolError::NoDocument | ToolError::DocumentNotFound(_) => "Precondition failed",
            _ => "Execution failed",
        };
        debug!(tool = %call.name, stage, error = %error, "Tool call rejected");
        self.audit.record(
            AuditKind::ToolError,
            format!("{stage}: {}", call.name),
            Some(error.to_string()),
        );
        let output = match error {
            ToolError::NotFound(_) => "tool not found".to_string(),
            other => other.to_string(),
        };
        ToolResult::error(&call.id, output)
    }

    /// Re-render after a successful mutation. Failure only warns.
    async fn refresh(&self, tool: &str, document: &Path, scope: RefreshScope, output: &mut ToolOutput) {
        debug!(tool, document = %document.display(), ?scope, "Auto-refreshing slides");
        match self.renderer.render(document, &self.output_dir).await {
            Ok(all) => {
                self.session.set_artifacts(all.clone());
                self.events.emit(LiveEvent::SlidesUpdated {
                    slides: all.iter().map(|p| p.display().to_string()).collect(),
                });

                let exported = match scope {
                    RefreshScope::Slides(numbers) => select_slides(all, &numbers),
                    RefreshScope::All => all,
                };
                self.audit.record(
                    AuditKind::ToolDebug,
                    format!("Auto-refreshed slides after {tool}"),
                    Some(format!("{} image(s) in {}", exported.len(), self.output_dir.display())),
                );
                output.annotate("exported_slides", serde_json::json!(exported));
                output.annotate("slides_directory", serde_json::json!(self.output_dir));
            }
            Err(e) => {
                warn!(tool, error = %e, "Auto-refresh failed; keeping the tool result");
                self.audit.record(
                    AuditKind::ToolDebug,
                    format!("Auto-refresh after {tool} failed"),
                    Some(e.to_string()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use slidepilot_tools::default_registry;

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: format!("toolu_{name}"),
            name: name.into(),
            arguments: args,
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result() {
        let fx = Fixture::new(serde_json::json!({"success": true}), FakeRenderer::ok(2));
        let result = fx.executor.execute(&call("format_disk", serde_json::json!({}))).await;

        assert!(result.is_error);
        assert_eq!(result.output, "tool not found");
        assert_eq!(result.call_id, "toolu_format_disk");
        assert!(fx.backend.calls().is_empty());
        let errors = fx.audit.entries_by_kind(AuditKind::ToolError);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unknown tool: format_disk");
        assert!(errors[0].details.as_deref().unwrap().contains("format_disk"));
    }

    #[tokio::test]
    async fn read_success_passes_payload_through() {
        let fx = Fixture::new(
            serde_json::json!({"success": true, "shapes": [{"index": 0, "text": "Hello"}]}),
            FakeRenderer::ok(2),
        );
        let result = fx
            .executor
            .execute(&call("read_slide", serde_json::json!({"slide_number": 1})))
            .await;

        assert!(!result.is_error);
        let payload: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(payload["shapes"][0]["text"], "Hello");
        assert_eq!(fx.renderer.count(), 0);
    }

    #[tokio::test]
    async fn slide_zero_fails_before_the_handler() {
        let fx = Fixture::new(serde_json::json!({"success": true}), FakeRenderer::ok(2));
        let result = fx
            .executor
            .execute(&call("delete_slide", serde_json::json!({"slide_number": 0})))
            .await;

        assert!(result.is_error);
        assert!(result.output.contains("slide_number must be 1 or greater"));
        assert!(fx.backend.calls().is_empty());
        assert_eq!(fx.renderer.count(), 0);
    }

    #[tokio::test]
    async fn successful_edit_refreshes_exactly_once() {
        let fx = Fixture::new(serde_json::json!({"success": true}), FakeRenderer::ok(3));
        let mut events = fx.events.subscribe();

        let result = fx
            .executor
            .execute(&call(
                "edit_slide_text",
                serde_json::json!({
                    "slide_number": 2,
                    "target_type": "shape_type",
                    "target_value": "title",
                    "new_text": "Quarterly Review"
                }),
            ))
            .await;

        assert!(!result.is_error);
        assert_eq!(fx.renderer.count(), 1);

        let payload: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        let exported = payload["exported_slides"].as_array().unwrap();
        assert_eq!(exported.len(), 1);
        assert!(exported[0].as_str().unwrap().ends_with("slide-002.jpg"));
        assert!(payload["slides_directory"].is_string());

        assert_eq!(fx.session.artifacts().len(), 3);
        let event = events.recv().await.unwrap();
        assert_eq!(event.name(), "slides-updated");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_success() {
        let fx = Fixture::new(serde_json::json!({"success": true}), FakeRenderer::failing());
        let result = fx
            .executor
            .execute(&call("add_slide", serde_json::json!({"title": "Appendix"})))
            .await;

        assert!(!result.is_error);
        assert_eq!(fx.renderer.count(), 1);
        let payload: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(payload["success"], true);
        assert!(payload.get("exported_slides").is_none());
        assert!(
            fx.audit
                .entries_by_kind(AuditKind::ToolDebug)
                .iter()
                .any(|e| e.message.contains("failed"))
        );
    }

    #[tokio::test]
    async fn unsuccessful_mutation_does_not_refresh() {
        let fx = Fixture::new(
            serde_json::json!({"success": false, "error": "Slide 7 does not exist"}),
            FakeRenderer::ok(3),
        );
        let result = fx
            .executor
            .execute(&call("delete_slide", serde_json::json!({"slide_number": 7})))
            .await;

        assert!(!result.is_error);
        assert_eq!(fx.renderer.count(), 0);
    }

    #[tokio::test]
    async fn no_document_short_circuits() {
        let fx = Fixture::without_document(serde_json::json!({"success": true}), FakeRenderer::ok(1));
        let result = fx
            .executor
            .execute(&call(
                "edit_slide_text",
                serde_json::json!({
                    "slide_number": 1,
                    "target_type": "shape_type",
                    "target_value": "title",
                    "new_text": "Hello"
                }),
            ))
            .await;

        assert!(result.is_error);
        assert!(result.output.contains("no document loaded"));
        assert!(fx.backend.calls().is_empty());
        let errors = fx.audit.entries_by_kind(AuditKind::ToolError);
        assert!(errors[0].message.starts_with("Precondition failed"));
    }

    #[test]
    fn status_labels() {
        let fx = Fixture::new(serde_json::json!({}), FakeRenderer::ok(1));
        assert_eq!(fx.executor.status_label("list_slides"), "Listing slides");
        assert_eq!(fx.executor.status_label("delete_slide"), "Deleting slide");
        assert_eq!(fx.executor.status_label("summon"), "Executing summon");
    }

    #[test]
    fn registry_builds_for_fixture() {
        let backend = RecordingBackend::new(serde_json::json!({}));
        assert_eq!(
            default_registry(backend, FakeRenderer::ok(1), "slides").unwrap().len(),
            6
        );
    }
}
