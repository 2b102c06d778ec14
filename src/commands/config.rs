use anyhow::Result;
use colored::Colorize;
use guard_gateway::config::{self, Config};
use tracing::info;

/// Execute the config show command
///
/// Displays the current configuration with secrets masked
pub fn show() -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    let cfg = config::load_config()?;
    let sanitized = sanitize_secrets(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    Ok(())
}

/// Execute the config validate command
pub fn validate() -> Result<()> {
    println!("{}", "Validating configuration...".yellow());

    let cfg = config::load_config()?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Input rules: {}", cfg.guardrails.input_patterns.len());
    println!("  Output rules: {}", cfg.guardrails.output_patterns.len());
    println!(
        "  Rate limit: {} requests / {}s",
        cfg.rate_limit.max_requests, cfg.rate_limit.window_seconds
    );
    println!("  Allowed origins: {}", cfg.cors.allowed_origins.len());
    println!("  Upstream model: {}", cfg.upstream.model);

    Ok(())
}

/// Sanitize secrets in configuration for safe display
fn sanitize_secrets(cfg: &Config) -> Config {
    let mut sanitized = cfg.clone();
    sanitized.auth.api_key = mask_api_key(&sanitized.auth.api_key);
    sanitized.upstream.api_key = mask_api_key(&sanitized.upstream.api_key);
    sanitized
}

/// Mask an API key for safe display
///
/// Shows first 7 and last 4 characters with an ellipsis in between
/// Example: "sk-1234567890abcdef" -> "sk-1234...cdef"
fn mask_api_key(key: &str) -> String {
    if key.len() <= 11 {
        // Too short to mask meaningfully
        return "***".to_string();
    }

    let prefix = &key[..7];
    let suffix = &key[key.len() - 4..];

    format!("{}...{}", prefix, suffix)
}
