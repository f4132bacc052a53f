//! `slidepilot export`: Render a deck to slide images without the agent.

use std::path::PathBuf;

use slidepilot_config::AppConfig;
use tracing::info;

use crate::runtime;

pub async fn run(deck: PathBuf, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let output_dir = output.unwrap_or_else(|| config.render.output_dir.clone());
    let deck = std::path::absolute(&deck)?;
    if !deck.is_file() {
        return Err(format!("presentation file not found: {}", deck.display()).into());
    }

    info!(deck = %deck.display(), output = %output_dir.display(), "Exporting slides");
    let slides = runtime::renderer(&config).render(&deck, &output_dir).await?;

    for slide in &slides {
        println!("{}", slide.display());
    }
    eprintln!("  Exported {} slide(s) to {}", slides.len(), output_dir.display());
    Ok(())
}
