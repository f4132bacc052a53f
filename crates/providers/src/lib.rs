//! Inference provider implementations for SlidePilot.
//!
//! All providers implement the `slidepilot_core::Provider` trait.

pub mod anthropic;

pub use anthropic::AnthropicProvider;

use std::sync::Arc;

use slidepilot_config::AppConfig;
use slidepilot_core::error::ProviderError;
use slidepilot_core::provider::Provider;

/// Build the configured provider.
///
/// Fails with `NotConfigured` when no API key is available.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(
                "no API key; set SLIDEPILOT_API_KEY or ANTHROPIC_API_KEY, or add api_key to config.toml".into(),
            )
        })?;

    let mut provider = AnthropicProvider::new(api_key);
    if let Some(url) = &config.api_url {
        provider = provider.with_base_url(url);
    }
    Ok(Arc::new(provider))
}
