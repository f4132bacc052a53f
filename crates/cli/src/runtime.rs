//! Wiring shared by the subcommands: backend, renderer, registry, executor.

use std::sync::Arc;

use slidepilot_agent::Executor;
use slidepilot_audit::{AuditLogger, AuditSink, FileSink, TracingSink};
use slidepilot_config::AppConfig;
use slidepilot_core::backend::{DocumentBackend, Renderer};
use slidepilot_core::event::EventBus;
use slidepilot_core::session::DocumentSession;
use slidepilot_core::tool::ToolRegistry;
use slidepilot_tools::{LibreOfficeRenderer, ScriptBackend};

pub struct Runtime {
    pub executor: Arc<Executor>,
    pub events: EventBus,
}

pub fn audit_logger(config: &AppConfig) -> AuditLogger {
    let mut sinks: Vec<Box<dyn AuditSink>> = Vec::new();
    if config.audit.enabled {
        sinks.push(Box::new(FileSink::new(&config.audit.path)));
    }
    if config.audit.mirror_to_tracing {
        sinks.push(Box::new(TracingSink));
    }
    AuditLogger::with_sinks(sinks).with_retention(config.audit.retain_entries)
}

pub fn renderer(config: &AppConfig) -> Arc<dyn Renderer> {
    Arc::new(LibreOfficeRenderer::from_config(&config.render))
}

pub fn registry(config: &AppConfig) -> Result<ToolRegistry, Box<dyn std::error::Error>> {
    let backend: Arc<dyn DocumentBackend> = Arc::new(ScriptBackend::from_config(&config.backend));
    Ok(slidepilot_tools::default_registry(
        backend,
        renderer(config),
        &config.render.output_dir,
    )?)
}

pub fn build(config: &AppConfig) -> Result<Runtime, Box<dyn std::error::Error>> {
    let events = EventBus::default();
    let executor = Executor::new(
        Arc::new(registry(config)?),
        Arc::new(DocumentSession::new()),
        renderer(config),
        &config.render.output_dir,
    )
    .with_audit(Arc::new(audit_logger(config)))
    .with_events(events.clone());

    Ok(Runtime {
        executor: Arc::new(executor),
        events,
    })
}
