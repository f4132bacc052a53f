//! Shared test helpers: scripted provider, recording backend, fake renderer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use slidepilot_audit::AuditLogger;
use slidepilot_core::backend::{DocumentBackend, Renderer};
use slidepilot_core::error::{ProviderError, ToolError};
use slidepilot_core::event::EventBus;
use slidepilot_core::provider::{ContentItem, Provider, ProviderRequest, ProviderResponse, Usage};
use slidepilot_core::session::DocumentSession;

use crate::executor::Executor;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and keeps
/// a copy of the request. Running out of responses is an API error.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        let responses = self.responses.lock().unwrap();
        responses.get(index).cloned().unwrap_or_else(|| {
            Err(ProviderError::ApiError {
                status_code: 500,
                message: format!("no scripted response for call #{index}"),
            })
        })
    }
}

/// Create a response from content items.
pub fn response(content: Vec<ContentItem>) -> ProviderResponse {
    ProviderResponse {
        content,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
        stop_reason: None,
    }
}

pub fn text(t: &str) -> ContentItem {
    ContentItem::Text { text: t.into() }
}

pub fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ContentItem {
    ContentItem::ToolUse {
        id: id.into(),
        name: name.into(),
        input,
    }
}

/// Backend that records every call and replies with a fixed payload.
pub struct RecordingBackend {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    reply: serde_json::Value,
}

impl RecordingBackend {
    pub fn new(reply: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply,
        })
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentBackend for RecordingBackend {
    async fn invoke(&self, operation: &str, args: &[String]) -> Result<serde_json::Value, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), args.to_vec()));
        Ok(self.reply.clone())
    }
}

/// Renderer that counts calls and either fakes `slides` images or fails.
pub struct FakeRenderer {
    slides: Option<usize>,
    calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn ok(slides: usize) -> Arc<Self> {
        Arc::new(Self {
            slides: Some(slides),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            slides: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, _document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.slides {
            Some(n) => Ok((1..=n)
                .map(|i| output_dir.join(format!("slide-{i:03}.jpg")))
                .collect()),
            None => Err(ToolError::Backend {
                operation: "export_slides".into(),
                reason: "LibreOffice conversion failed".into(),
                output: String::new(),
            }),
        }
    }
}

/// An executor over the real slide tools with recording collaborators.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub deck: PathBuf,
    pub executor: Arc<Executor>,
    pub backend: Arc<RecordingBackend>,
    pub renderer: Arc<FakeRenderer>,
    pub session: Arc<DocumentSession>,
    pub audit: Arc<AuditLogger>,
    pub events: EventBus,
}

impl Fixture {
    /// A fixture with `deck.pptx` loaded.
    pub fn new(reply: serde_json::Value, renderer: Arc<FakeRenderer>) -> Self {
        let fx = Self::without_document(reply, renderer);
        fx.session.load(&fx.deck).unwrap();
        fx
    }

    /// A fixture whose deck exists on disk but is not loaded.
    pub fn without_document(reply: serde_json::Value, renderer: Arc<FakeRenderer>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("deck.pptx");
        std::fs::write(&deck, b"pptx").unwrap();
        let output_dir = dir.path().join("slides");

        let backend = RecordingBackend::new(reply);
        let registry = slidepilot_tools::default_registry(
            backend.clone(),
            renderer.clone(),
            output_dir.clone(),
        )
        .unwrap();
        let session = Arc::new(DocumentSession::new());
        let audit = Arc::new(AuditLogger::new());
        let events = EventBus::new(64);
        let executor = Arc::new(
            Executor::new(Arc::new(registry), session.clone(), renderer.clone(), output_dir)
                .with_audit(audit.clone())
                .with_events(events.clone()),
        );

        Self {
            dir,
            deck,
            executor,
            backend,
            renderer,
            session,
            audit,
            events,
        }
    }
}
