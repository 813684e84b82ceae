//! Google Gemini `generateContent` client
//!
//! One POST per summary, no retry, no streaming.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{prepare_prompt, Summarizer};
use crate::config::is_usable_api_key;
use crate::document::SummaryOptions;
use crate::error::{Error, Result};
use crate::progress::{ProgressReporter, ProgressStage};

pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

const TEMPERATURE: f32 = 0.7;
const TOP_K: u32 = 40;
const TOP_P: f32 = 0.95;

/// Gemini summarization client
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a client against the public endpoint with the default model.
    ///
    /// A missing or placeholder key is accepted here and reported as a
    /// configuration error when a summary is requested.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_API_BASE_URL.to_string(),
            model: GEMINI_DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(is_usable_api_key)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn usable_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if is_usable_api_key(key) => Ok(key),
            _ => Err(Error::configuration(
                "No valid Gemini API key detected. Set your key via SUMMARIF_GEMINI_API_KEY or `summarif set-key`.",
            )),
        }
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(
        &self,
        text: &str,
        options: &SummaryOptions,
        progress: &ProgressReporter,
    ) -> Result<String> {
        let api_key = self.usable_key()?;
        let prompt = prepare_prompt(text, options)?;

        progress.report(ProgressStage::AiProcessing, 10, "Connecting to Gemini AI...");

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: options.length.max_output_tokens(),
            },
        };

        progress.report(ProgressStage::AiProcessing, 30, "Generating summary...");

        debug!(model = %self.model, length = %options.length, style = %options.style, "Sending summarization request");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // The URL carries the key
                tracing::warn!(error = %e.without_url(), "Gemini request failed");
                Error::network()
            })?;

        progress.report(ProgressStage::AiProcessing, 70, "Processing AI response...");

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let server_message = server_message(&body, status.canonical_reason());
            tracing::warn!(status = status.as_u16(), message = %server_message, "Gemini API error");
            return Err(Error::from_status(status.as_u16(), &server_message));
        }

        let body = response.text().await.map_err(|_| Error::network())?;
        let data: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|_| Error::empty_response())?;

        progress.report(ProgressStage::AiProcessing, 90, "Finalizing summary...");

        let summary = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(Error::empty_response)?;

        progress.report(ProgressStage::AiProcessing, 100, "Summary generated successfully");

        Ok(summary)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// Pick the most specific message from an error body: `error.message`, then
/// a top-level `message`, then the HTTP reason phrase.
fn server_message(body: &str, reason: Option<&str>) -> String {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    parsed
        .and_then(|b| b.error.and_then(|e| e.message).or(b.message))
        .filter(|m| !m.is_empty())
        .or_else(|| reason.map(str::to_string))
        .unwrap_or_else(|| "Unknown error".to_string())
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_precedence() {
        assert_eq!(
            server_message(r#"{"error":{"message":"API key not valid"},"message":"outer"}"#, Some("Bad Request")),
            "API key not valid"
        );
        assert_eq!(
            server_message(r#"{"message":"outer"}"#, Some("Bad Request")),
            "outer"
        );
        assert_eq!(server_message("<html>oops</html>", Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(server_message("", None), "Unknown error");
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "prompt".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: 150,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 150);
    }

    #[test]
    fn test_endpoint_uses_base_url_and_model() {
        let client = GeminiClient::new(Some("AIzaTest".to_string()))
            .with_base_url("http://localhost:1234/")
            .with_model("gemini-test");
        assert_eq!(
            client.endpoint(),
            "http://localhost:1234/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn test_has_api_key() {
        assert!(GeminiClient::new(Some("AIzaTest".to_string())).has_api_key());
        assert!(!GeminiClient::new(None).has_api_key());
        assert!(!GeminiClient::new(Some("  ".to_string())).has_api_key());
        assert!(!GeminiClient::new(Some("PUT_YOUR_KEY_HERE".to_string())).has_api_key());
    }
}
