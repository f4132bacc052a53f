//! `slidepilot agent`: Interactive or single-message chat mode.

use std::io::Write;
use std::path::PathBuf;

use slidepilot_agent::{AgentLoop, ChatSession, LoopOutcome};
use slidepilot_config::AppConfig;
use slidepilot_core::event::LiveEvent;
use slidepilot_tools::OfficeService;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::runtime;

pub async fn run(message: Option<String>, deck: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail early with setup instructions
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    SLIDEPILOT_API_KEY=sk-ant-...");
        eprintln!("    ANTHROPIC_API_KEY=sk-ant-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = slidepilot_providers::build_from_config(&config)?;

    let office = OfficeService::from_config(&config.backend);
    if let Err(e) = office.ensure_running().await {
        tracing::warn!(error = %e, "Office service unavailable; slide operations will fail");
    }

    let rt = runtime::build(&config)?;
    let stop_printer = CancellationToken::new();
    let printer = tokio::spawn(print_events(rt.events.subscribe(), stop_printer.clone()));

    let agent = AgentLoop::from_config(provider, rt.executor.clone(), &config);
    let mut chat = ChatSession::new(agent).with_document_context(config.agent.include_document_context);

    if let Some(path) = deck {
        open(&chat, path).await;
    }

    if let Some(msg) = message {
        // Single message mode
        let outcome = send(&mut chat, &msg).await;
        stop_printer.cancel();
        printer.await?;
        return outcome;
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║       SlidePilot Agent — Interactive Mode    ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", config.model);
    println!("  Tools:     {}", rt.executor.registry().names().join(", "));
    println!("  Deck:      {}", display_name(&chat));
    println!();
    println!("  Type your message and press Enter.");
    println!("  Commands: :open <file.pptx>, :slides, :quit");
    println!("  Ctrl+C cancels a running request, or quits at the prompt.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    loop {
        // Ctrl+C at the idle prompt quits.
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };
        let line = line.trim();
        match line {
            "" => {}
            ":quit" | ":q" | "exit" => break,
            ":slides" => {
                let slides = chat.slides();
                if slides.is_empty() {
                    println!("  No slides rendered.");
                }
                for slide in slides {
                    println!("  {}", slide.display());
                }
            }
            _ if line.starts_with(":open ") => {
                open(&chat, PathBuf::from(line[":open ".len()..].trim())).await;
            }
            _ => {
                if let Err(e) = send(&mut chat, line).await {
                    eprintln!("  [Error] {e}");
                }
                println!();
            }
        }
        prompt()?;
    }

    stop_printer.cancel();
    printer.await?;
    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

async fn open(chat: &ChatSession, path: PathBuf) {
    match chat.open_document(&path).await {
        Ok(slides) => println!("  Loaded {} ({} slides)", display_name(chat), slides.len()),
        Err(e) => eprintln!("  [Error] could not open {}: {e}", path.display()),
    }
}

/// Run one message with Ctrl+C wired to the cancellation token.
async fn send(chat: &mut ChatSession, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let outcome = chat.send(message, &cancel).await;
    watcher.abort();

    match outcome? {
        LoopOutcome::Completed { .. } => {}
        LoopOutcome::Cancelled { rounds } => println!("  (cancelled after {rounds} round(s))"),
        LoopOutcome::RoundLimitReached { rounds } => {
            println!("  (stopped after {rounds} round(s); the round limit was reached)")
        }
    }
    Ok(())
}

/// Print live events as they arrive until `stop` fires.
///
/// Assistant text is printed here rather than from the loop outcome, so
/// multi-round answers show up as they happen.
async fn print_events(mut rx: broadcast::Receiver<std::sync::Arc<LiveEvent>>, stop: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            received = rx.recv() => match received {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "Event printer lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = stop.cancelled() => {
                while let Ok(event) = rx.try_recv() {
                    print_event(&event);
                }
                break;
            }
        }
    }
}

fn print_event(event: &LiveEvent) {
    match event {
        LiveEvent::AssistantMessage { text } => {
            for line in text.lines() {
                println!("  Assistant > {line}");
            }
        }
        LiveEvent::ToolStatus { .. } => eprintln!("  {}", event.payload()),
        LiveEvent::SlidesUpdated { slides } => {
            eprintln!("  [{} slide image(s) refreshed]", slides.len())
        }
        LiveEvent::Error { message } => eprintln!("  [Error] {message}"),
    }
}

fn display_name(chat: &ChatSession) -> String {
    let name = chat.document_name();
    if name.is_empty() { "(none)".into() } else { name }
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
