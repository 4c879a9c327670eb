//! Gemini client for the search pipeline
//!
//! Thin HTTP client for the `generateContent` endpoint of the Gemini
//! API. The two consumers are the question analyzer
//! ([`analysis::GeminiAnalyzer`]) and the SPARQL generator
//! ([`transformer::SparqlTransformer`]); both degrade to deterministic
//! fallbacks when the API is not configured or a call fails.

pub mod analysis;
pub mod transformer;

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::GeminiConfig;

/// Errors from the generative API layer.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured; callers switch to their fallback.
    #[error("GEMINI_API_KEY not configured")]
    NotConfigured,

    /// Transport-level failure.
    #[error("Gemini request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the API.
    #[error("Gemini request failed: {status}: {body}")]
    Status { status: u16, body: String },

    /// The API answered but produced no candidate text.
    #[error("Gemini returned an empty response")]
    EmptyResponse,

    /// The response body could not be decoded.
    #[error("Gemini response unreadable: {0}")]
    Decode(#[from] serde_json::Error),
}

impl LlmError {
    /// Transport and status errors may succeed on a later request;
    /// a missing key never will.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. } | Self::EmptyResponse)
    }
}

/// Generation parameters for one call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 1000,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
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

/// HTTP client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a client from a configuration section. Succeeds even
    /// without an API key; calls then fail with [`LlmError::NotConfigured`].
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Whether an API key is present.
    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Model name used for generation.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Generate text for a prompt.
    pub async fn generate(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, LlmError> {
        let api_key = self.config.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
                max_output_tokens: options.max_output_tokens,
            },
        };

        tracing::debug!(model = %self.config.model, prompt_len = prompt.len(), "calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Gemini call rejected");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;

        let text: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        tracing::debug!(response_len = text.len(), "Gemini response received");
        Ok(text)
    }
}

/// Extract a JSON object from free-form model output: fenced
/// ` ```json ` blocks first, then any fenced block, then the outermost
/// brace span.
pub(crate) fn extract_json_block(text: &str) -> String {
    if let Some(start) = text.find("```json") {
        let after = &text[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let content_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        if let Some(end) = after[content_start..].find("```") {
            return after[content_start..content_start + end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return text[start..=end].to_string();
        }
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(key: Option<&str>) -> GeminiConfig {
        GeminiConfig {
            api_key: key.map(String::from),
            model: String::from("gemini-2.0-flash"),
            endpoint: String::from("https://generativelanguage.googleapis.com/v1beta"),
            timeout_secs: 60,
        }
    }

    #[test]
    fn test_client_without_key_is_unconfigured() {
        let client = GeminiClient::new(test_config(None)).unwrap();
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_fast() {
        let client = GeminiClient::new(test_config(None)).unwrap();
        let result = client.generate("hello", GenerationOptions::default()).await;
        assert!(matches!(result, Err(LlmError::NotConfigured)));
    }

    #[test]
    fn test_extract_json_from_fence() {
        let text = "Voici le résultat :\n```json\n{\"entities\": []}\n```\n";
        assert_eq!(extract_json_block(text), "{\"entities\": []}");
    }

    #[test]
    fn test_extract_json_from_generic_fence() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_block(text), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_brace_span() {
        let text = "prefix {\"a\": {\"b\": 2}} suffix";
        assert_eq!(extract_json_block(text), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(!LlmError::NotConfigured.is_recoverable());
        assert!(LlmError::EmptyResponse.is_recoverable());
    }
}
