use crate::{
    config::UpstreamConfig,
    error::AppError,
    models::openai::{ChatCompletionRequest, ChatMessage},
};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Fixed sampling temperature for every upstream call.
const TEMPERATURE: f32 = 0.2;

/// Fixed output-length cap for every upstream call.
const MAX_TOKENS: u32 = 800;

/// Client for the upstream chat-completions provider.
///
/// Wraps a shared `reqwest::Client`; per-call settings come from the
/// current `UpstreamConfig` so a config reload takes effect immediately.
#[derive(Debug, Clone)]
pub struct ModelClient {
    http: Client,
}

impl ModelClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Call the provider with the configured timeout.
    pub async fn complete(
        &self,
        config: &UpstreamConfig,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, AppError> {
        self.complete_with_timeout(
            config,
            system_prompt,
            user_prompt,
            Duration::from_secs(config.timeout_seconds),
        )
        .await
    }

    /// Call the provider with an explicit timeout.
    ///
    /// Fails with an upstream error when the credential is missing, the
    /// call fails or times out, the provider returns non-2xx, or the body
    /// is not JSON. An unexpected-but-valid JSON shape is not an error;
    /// see [`normalize_answer`].
    pub async fn complete_with_timeout(
        &self,
        config: &UpstreamConfig,
        system_prompt: &str,
        user_prompt: &str,
        timeout: Duration,
    ) -> Result<String, AppError> {
        if config.api_key.is_empty() {
            return Err(AppError::Upstream(
                "upstream api key not configured".to_string(),
            ));
        }

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        let request = ChatCompletionRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
        };

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::Upstream(format!(
                "upstream returned {}: {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid response body: {}", e)))?;

        Ok(normalize_answer(&body))
    }
}

/// Extract the answer text from a provider response envelope.
///
/// Prefers `choices[0].message.content`, then `choices[0].text`, and falls
/// back to the serialized raw body for nonstandard providers.
fn normalize_answer(body: &Value) -> String {
    if let Some(first_choice) = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
    {
        if let Some(content) = first_choice
            .pointer("/message/content")
            .and_then(Value::as_str)
        {
            return content.to_string();
        }
        if let Some(text) = first_choice.get("text").and_then(Value::as_str) {
            return text.to_string();
        }
    }

    body.to_string()
}
