//! The LLM enhancer capability.
//!
//! Strictly best-effort: every failure is logged and the caller keeps the
//! rule-based transcript. The providers speak plain HTTP: an
//! OpenAI-compatible chat completion for `openai` and `ollama`, and the
//! `generateContent` shape for `gemini`.

use async_trait::async_trait;
use murmur_core::ServiceError;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Instruction template sent with every transcript.
const ENHANCE_PROMPT: &str = "You are a transcription editor. Clean up the voice transcript below so it reads naturally while keeping the speaker's meaning and tone. Fix obvious grammar slips, remove stutters and leftover filler, and keep proper nouns, numbers, and technical terms exactly as spoken. Do not add information, commentary, or headings. Output only the cleaned text.";

/// Request timeout for provider calls.
const ENHANCE_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors internal to enhancement. Never surfaced to clients.
#[derive(Debug, Error)]
pub enum EnhancerError {
    /// Transport-level failure.
    #[error("http error: {0}")]
    Http(String),

    /// Provider returned an error or an unusable body.
    #[error("provider error: {0}")]
    Provider(String),
}

/// The enhancer capability: rewrite a draft transcript for fluency.
#[async_trait]
pub trait Enhancer: Send + Sync {
    /// Provider tag (`openai`, `gemini`, `ollama`, ...).
    fn provider(&self) -> &str;

    /// Rewrite `text`. `profile_hint` names the active post-process profile
    /// so the provider can match register (e.g. `chat` vs `writing`).
    async fn enhance(&self, text: &str, profile_hint: &str) -> Result<String, EnhancerError>;
}

/// Boot-time enhancer selection.
#[derive(Clone, Debug, Default)]
pub struct EnhancerConfig {
    /// Provider tag: `openai | gemini | ollama | none`.
    pub provider: String,
    /// API key, required for `openai` and `gemini`.
    pub api_key: Option<String>,
    /// Base URL override (proxy deployments, ollama host).
    pub base_url: Option<String>,
    /// Model name override.
    pub model: Option<String>,
}

/// Build the configured enhancer, or `None` for the `none` provider.
pub fn build_enhancer(config: &EnhancerConfig) -> Result<Option<Arc<dyn Enhancer>>, ServiceError> {
    let client = reqwest::Client::builder()
        .timeout(ENHANCE_TIMEOUT)
        .build()
        .map_err(|e| ServiceError::Internal(format!("http client: {e}")))?;

    match config.provider.as_str() {
        "" | "none" => Ok(None),
        "openai" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ServiceError::InvalidInput("openai enhancer requires an API key".into())
            })?;
            Ok(Some(Arc::new(OpenAiEnhancer {
                client,
                api_key,
                base_url: config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1".into()),
                model: config.model.clone().unwrap_or_else(|| "gpt-4o-mini".into()),
            })))
        }
        "gemini" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ServiceError::InvalidInput("gemini enhancer requires an API key".into())
            })?;
            Ok(Some(Arc::new(GeminiEnhancer {
                client,
                api_key,
                base_url: config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".into()),
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| "gemini-2.0-flash".into()),
            })))
        }
        "ollama" => Ok(Some(Arc::new(OllamaEnhancer {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "http://127.0.0.1:11434".into()),
            model: config.model.clone().unwrap_or_else(|| "qwen2.5:7b".into()),
        }))),
        other => Err(ServiceError::InvalidInput(format!(
            "unknown enhancer provider: {other:?}"
        ))),
    }
}

fn user_message(text: &str, profile_hint: &str) -> String {
    format!("{ENHANCE_PROMPT}\n\nContext: text will be inserted into a {profile_hint} application.\n\nTranscript:\n{text}")
}

/// Pull `choices[0].message.content` out of an OpenAI-shaped response.
fn chat_completion_text(body: &Value) -> Result<String, EnhancerError> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_owned())
        .ok_or_else(|| EnhancerError::Provider("response missing message content".into()))
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &Value,
) -> Result<Value, EnhancerError> {
    let mut req = client.post(url).json(body);
    if let Some(key) = bearer {
        req = req.header("Authorization", format!("Bearer {key}"));
    }
    let resp = req.send().await.map_err(|e| EnhancerError::Http(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(EnhancerError::Provider(format!("status {status}")));
    }
    resp.json::<Value>()
        .await
        .map_err(|e| EnhancerError::Provider(format!("bad json: {e}")))
}

/// OpenAI-compatible chat completions.
struct OpenAiEnhancer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[async_trait]
impl Enhancer for OpenAiEnhancer {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn enhance(&self, text: &str, profile_hint: &str) -> Result<String, EnhancerError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": user_message(text, profile_hint)}],
            "temperature": 0.3,
            "max_tokens": 4096,
        });
        debug!(model = %self.model, "calling openai enhancer");
        let resp = post_json(&self.client, &url, Some(&self.api_key), &body).await?;
        chat_completion_text(&resp)
    }
}

/// Gemini `generateContent`.
struct GeminiEnhancer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[async_trait]
impl Enhancer for GeminiEnhancer {
    fn provider(&self) -> &str {
        "gemini"
    }

    async fn enhance(&self, text: &str, profile_hint: &str) -> Result<String, EnhancerError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );
        let body = json!({
            "contents": [{"parts": [{"text": user_message(text, profile_hint)}]}],
            "generationConfig": {"temperature": 0.3, "maxOutputTokens": 4096},
        });
        debug!(model = %self.model, "calling gemini enhancer");
        let resp = post_json(&self.client, &url, None, &body).await?;
        resp.get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(Value::as_str)
            .map(|s| s.trim().to_owned())
            .ok_or_else(|| EnhancerError::Provider("response missing candidate text".into()))
    }
}

/// Local ollama over its OpenAI-compatible endpoint.
struct OllamaEnhancer {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[async_trait]
impl Enhancer for OllamaEnhancer {
    fn provider(&self) -> &str {
        "ollama"
    }

    async fn enhance(&self, text: &str, profile_hint: &str) -> Result<String, EnhancerError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": user_message(text, profile_hint)}],
            "temperature": 0.3,
            "max_tokens": 4096,
        });
        debug!(model = %self.model, url = %url, "calling ollama enhancer");
        let resp = post_json(&self.client, &url, None, &body).await?;
        chat_completion_text(&resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_provider_builds_nothing() {
        let cfg = EnhancerConfig {
            provider: "none".into(),
            ..EnhancerConfig::default()
        };
        assert!(build_enhancer(&cfg).unwrap().is_none());
        let cfg = EnhancerConfig::default();
        assert!(build_enhancer(&cfg).unwrap().is_none());
    }

    #[test]
    fn openai_requires_key() {
        let cfg = EnhancerConfig {
            provider: "openai".into(),
            ..EnhancerConfig::default()
        };
        assert!(build_enhancer(&cfg).is_err());

        let cfg = EnhancerConfig {
            provider: "openai".into(),
            api_key: Some("sk-test".into()),
            ..EnhancerConfig::default()
        };
        let enhancer = build_enhancer(&cfg).unwrap().unwrap();
        assert_eq!(enhancer.provider(), "openai");
    }

    #[test]
    fn ollama_needs_no_key() {
        let cfg = EnhancerConfig {
            provider: "ollama".into(),
            ..EnhancerConfig::default()
        };
        let enhancer = build_enhancer(&cfg).unwrap().unwrap();
        assert_eq!(enhancer.provider(), "ollama");
    }

    #[test]
    fn unknown_provider_rejected() {
        let cfg = EnhancerConfig {
            provider: "skynet".into(),
            ..EnhancerConfig::default()
        };
        assert!(build_enhancer(&cfg).is_err());
    }

    #[test]
    fn chat_completion_extraction() {
        let body = json!({
            "choices": [{"message": {"content": "  cleaned text  "}}]
        });
        assert_eq!(chat_completion_text(&body).unwrap(), "cleaned text");

        let body = json!({"choices": []});
        assert!(chat_completion_text(&body).is_err());
    }

    #[test]
    fn prompt_embeds_transcript_and_profile() {
        let msg = user_message("hello there", "coding");
        assert!(msg.contains("hello there"));
        assert!(msg.contains("coding"));
        assert!(msg.contains("Output only the cleaned text"));
    }
}
