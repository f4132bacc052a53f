//! `slidepilot doctor`: Diagnose system health.

use slidepilot_config::AppConfig;
use slidepilot_tools::{OfficeService, ScriptBackend};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 SlidePilot Doctor: System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    let config = match AppConfig::load() {
        Ok(config) => {
            if config_path.exists() {
                println!("  ✅ Config file valid");
            } else {
                println!("  ℹ️  No config file at {}; using defaults", config_path.display());
            }
            config
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            return Ok(());
        }
    };

    // Check API key
    if config.has_api_key() {
        println!("  ✅ API key configured");
        let provider = slidepilot_providers::build_from_config(&config)?;
        match provider.health_check(&config.model).await {
            Ok(true) => println!("  ✅ {} accepted the key for {}", provider.name(), config.model),
            Ok(false) => {
                println!("  ❌ {} rejected the API key", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ⚠️  Could not reach {}: {e}", provider.name());
                issues += 1;
            }
        }
    } else {
        println!("  ⚠️  No API key; set SLIDEPILOT_API_KEY or ANTHROPIC_API_KEY");
        issues += 1;
    }

    // Check operation scripts
    let backend = ScriptBackend::from_config(&config.backend);
    let missing: Vec<_> = ["list_slides", "read_slide", "edit_slide", "add_slide", "delete_slide"]
        .into_iter()
        .filter(|op| !backend.script_path(op).is_file())
        .collect();
    if missing.is_empty() {
        println!("  ✅ Operation scripts found in {}", config.backend.scripts_dir.display());
    } else {
        println!("  ❌ Missing scripts for: {}", missing.join(", "));
        issues += 1;
    }

    // Check interpreter
    match tokio::process::Command::new(backend.interpreter())
        .arg("--version")
        .output()
        .await
    {
        Ok(out) if out.status.success() => println!("  ✅ Interpreter {} available", backend.interpreter()),
        _ => {
            println!("  ❌ Interpreter {} not found", backend.interpreter());
            issues += 1;
        }
    }

    // Check office service
    let office = OfficeService::from_config(&config.backend);
    if office.is_running().await {
        println!("  ✅ Office service listening on {}", office.address());
    } else {
        println!("  ⚠️  Office service not running on {}; starting it", office.address());
        match office.ensure_running().await {
            Ok(()) => println!("  ✅ Office service started"),
            Err(e) => {
                println!("  ❌ {e}");
                issues += 1;
            }
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
