use serde::{Deserialize, Serialize};

use crate::guardrails;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub upstream: UpstreamConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub guardrails: GuardrailsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8088,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret presented by callers in the `x-api-key` header.
    pub api_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // Dev fallback. Production deployments set GUARD_GATEWAY__AUTH__API_KEY.
            api_key: "super-secret-dev-key".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Provider credential. Empty means "not configured"; the answer
    /// pipeline surfaces that as an upstream failure at call time.
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum allowed calls per window per client identity.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:5500".to_string(),
                "http://127.0.0.1:5500".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardrailsConfig {
    /// Patterns screened against `question + " " + context` before the
    /// upstream call.
    pub input_patterns: Vec<String>,
    /// Patterns screened against the model answer before serving it.
    pub output_patterns: Vec<String>,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            input_patterns: guardrails::default_input_patterns(),
            output_patterns: guardrails::default_output_patterns(),
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("GUARD_GATEWAY").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.auth.api_key.is_empty() {
        anyhow::bail!("auth.api_key must not be empty");
    }

    if cfg.rate_limit.max_requests == 0 {
        anyhow::bail!("rate_limit.max_requests must be at least 1");
    }

    if cfg.rate_limit.window_seconds == 0 {
        anyhow::bail!("rate_limit.window_seconds must be at least 1");
    }

    if cfg.upstream.timeout_seconds == 0 {
        anyhow::bail!("upstream.timeout_seconds must be at least 1");
    }

    // Guardrail patterns must compile; surface bad patterns at startup
    // instead of at first request.
    guardrails::Guardrails::from_config(&cfg.guardrails)
        .map_err(|e| anyhow::anyhow!("invalid guardrail pattern: {}", e))?;

    Ok(())
}
