//! `slidepilot tools`: Print the tool catalogue exactly as the model sees it.

use slidepilot_config::AppConfig;

use crate::runtime;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = runtime::registry(&config)?;
    println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
    Ok(())
}
