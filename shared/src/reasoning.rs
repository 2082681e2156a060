//! Client for the external reasoning (LLM) endpoint.
//!
//! The service is treated as an opaque text-completion endpoint with an
//! optional JSON-structured mode. Callers own all interpretation of the
//! returned text; this adapter only moves bytes and flattens the candidate
//! envelope.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::{Error, Result};

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Seam for the reasoning service so components can be exercised without the
/// network. One call per invocation; retries are the caller's concern.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Send one prompt and return the raw text of the first candidate.
    async fn generate(&self, prompt: &str, json_mode: bool) -> Result<String>;
}

/// Reasoning-service client backed by the Gemini `generateContent` API.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build a client from config, or `None` when no API key is set so the
    /// caller can run in degraded mode instead of failing the pipeline.
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .gemini_api_key
            .as_ref()
            .map(|key| Self::new(config.gemini_base_url.clone(), config.gemini_model.clone(), key.clone()))
    }
}

#[async_trait]
impl ReasoningService for GeminiClient {
    async fn generate(&self, prompt: &str, json_mode: bool) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if json_mode {
            body["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ReasoningUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ReasoningUnavailable(format!(
                "endpoint returned {status}"
            )));
        }

        let envelope: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::ReasoningUnavailable(format!("unreadable response: {e}")))?;

        let text = envelope
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::ReasoningUnavailable("response had no candidates".into()))?;

        debug!(chars = text.len(), "reasoning service replied");
        Ok(text)
    }
}
