//! `edit_slide_text`: change text on one slide.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use slidepilot_core::backend::DocumentBackend;
use slidepilot_core::error::ToolError;
use slidepilot_core::tool::{RefreshScope, Tool, ToolContext, ToolInput, ToolOutput};
use tracing::debug;

use crate::{one_based, required};

/// How the edit locates its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    ShapeIndex,
    ShapeType,
    TextReplace,
    BulletPoint,
    BulletList,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShapeIndex => "shape_index",
            Self::ShapeType => "shape_type",
            Self::TextReplace => "text_replace",
            Self::BulletPoint => "bullet_point",
            Self::BulletList => "bullet_list",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditSlideTextInput {
    /// Path to the PowerPoint (.pptx) file. Defaults to the loaded presentation.
    #[serde(default)]
    pub presentation_path: Option<String>,

    /// Slide number to edit (1-based indexing)
    pub slide_number: i64,

    /// How to target: 'shape_index', 'shape_type', 'bullet_point', 'bullet_list', or 'text_replace'
    pub target_type: TargetType,

    /// Shape index (0,1,2...), shape type ('title','content','text_box'), bullet index, or text to find
    pub target_value: String,

    /// New text content to set
    pub new_text: String,

    /// For text_replace only: the exact text to replace
    #[serde(default)]
    pub old_text: Option<String>,
}

impl ToolInput for EditSlideTextInput {
    fn document_path(&self) -> Option<&str> {
        self.presentation_path.as_deref()
    }

    fn validate(&self) -> Result<(), ToolError> {
        one_based("slide_number", self.slide_number)?;
        required("target_value", &self.target_value)?;
        required("new_text", &self.new_text)?;
        if self.target_type == TargetType::TextReplace {
            required(
                "old_text (for text_replace mode)",
                self.old_text.as_deref().unwrap_or_default(),
            )?;
        }
        Ok(())
    }
}

pub struct EditSlideTextTool {
    backend: Arc<dyn DocumentBackend>,
}

impl EditSlideTextTool {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for EditSlideTextTool {
    type Input = EditSlideTextInput;

    fn name(&self) -> &'static str {
        "edit_slide_text"
    }

    fn description(&self) -> &'static str {
        "Edit text on a slide by targeting a specific shape or element.\n\n\
         Target types:\n\
         - \"shape_index\": edit the shape at an index (0, 1, 2, ...)\n\
         - \"shape_type\": edit by type (\"title\", \"content\", \"text_box\")\n\
         - \"text_replace\": replace the exact text given in old_text\n\
         - \"bullet_point\": edit one bullet point by index\n\
         - \"bullet_list\": turn the whole shape into a bullet list\n\n\
         For bullet_list, put one bullet per line WITHOUT bullet characters (•, *, -); \
         LibreOffice adds the bullets itself. Example: \"First point\\nSecond point\"."
    }

    fn status_label(&self) -> &'static str {
        "Editing slide text"
    }

    fn is_mutating(&self) -> bool {
        true
    }

    fn refresh_scope(&self, input: &EditSlideTextInput) -> RefreshScope {
        match u32::try_from(input.slide_number) {
            Ok(slide) => RefreshScope::Slides(vec![slide]),
            Err(_) => RefreshScope::All,
        }
    }

    async fn call(&self, ctx: &ToolContext, input: EditSlideTextInput) -> Result<ToolOutput, ToolError> {
        let slide = one_based("slide_number", input.slide_number)?;
        debug!(
            slide,
            target_type = input.target_type.as_str(),
            target_value = %input.target_value,
            "Editing slide text"
        );

        let mut args = vec![
            crate::document_arg(ctx),
            slide.to_string(),
            input.target_type.as_str().to_string(),
            input.target_value,
            input.new_text,
        ];
        if let Some(old) = input.old_text.filter(|t| !t.is_empty()) {
            args.push(old);
        }

        let data = self.backend.invoke("edit_slide", &args).await?;
        Ok(ToolOutput::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingBackend, loaded_session};
    use slidepilot_core::session::DocumentSession;
    use slidepilot_core::tool::ToolRegistry;

    fn registry(backend: Arc<RecordingBackend>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(EditSlideTextTool::new(backend)).unwrap();
        registry
    }

    #[tokio::test]
    async fn passes_positional_arguments_and_scopes_refresh() {
        let (_dir, session, deck) = loaded_session();
        let backend = RecordingBackend::new(serde_json::json!({"success": true}));
        let registry = registry(backend.clone());

        let invocation = registry
            .get("edit_slide_text")
            .unwrap()
            .invoke(
                serde_json::json!({
                    "slide_number": 2,
                    "target_type": "text_replace",
                    "target_value": "Q3",
                    "new_text": "Q4",
                    "old_text": "Q3"
                }),
                session,
            )
            .await
            .unwrap();

        assert_eq!(invocation.refresh, Some(RefreshScope::Slides(vec![2])));
        let calls = backend.calls();
        assert_eq!(calls[0].0, "edit_slide");
        assert_eq!(
            calls[0].1,
            vec![
                deck.to_string_lossy().into_owned(),
                "2".into(),
                "text_replace".into(),
                "Q3".into(),
                "Q4".into(),
                "Q3".into()
            ]
        );
    }

    #[tokio::test]
    async fn text_replace_requires_old_text() {
        let (_dir, session, _deck) = loaded_session();
        let backend = RecordingBackend::new(serde_json::json!({"success": true}));
        let registry = registry(backend.clone());

        let err = registry
            .get("edit_slide_text")
            .unwrap()
            .invoke(
                serde_json::json!({
                    "slide_number": 1,
                    "target_type": "text_replace",
                    "target_value": "old",
                    "new_text": "new"
                }),
                session,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("old_text"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_target_type_is_a_decode_error() {
        let (_dir, session, _deck) = loaded_session();
        let backend = RecordingBackend::new(serde_json::json!({"success": true}));
        let registry = registry(backend.clone());

        let err = registry
            .get("edit_slide_text")
            .unwrap()
            .invoke(
                serde_json::json!({
                    "slide_number": 1,
                    "target_type": "everything",
                    "target_value": "0",
                    "new_text": "x"
                }),
                session,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn no_document_short_circuits() {
        let backend = RecordingBackend::new(serde_json::json!({"success": true}));
        let registry = registry(backend.clone());

        let err = registry
            .get("edit_slide_text")
            .unwrap()
            .invoke(
                serde_json::json!({
                    "slide_number": 1,
                    "target_type": "shape_type",
                    "target_value": "title",
                    "new_text": "Welcome"
                }),
                Arc::new(DocumentSession::new()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NoDocument));
        assert!(err.to_string().contains("no document loaded"));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn schema_lists_target_types() {
        let schema = slidepilot_core::tool::input_schema::<EditSlideTextInput>().unwrap();
        let variants = schema["properties"]["target_type"]["enum"].as_array().unwrap();
        assert_eq!(variants.len(), 5);
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "new_text"));
        assert!(!required.iter().any(|r| r == "old_text"));
    }
}
