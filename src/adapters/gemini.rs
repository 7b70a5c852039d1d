//! Gemini adapter for media analysis.
//!
//! Endpoint: POST {base}/v1beta/models/{model}:generateContent
//! Auth: `x-goog-api-key` header

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Analyzer, AnalyzerError, MediaPayload};
use crate::config::AiConfig;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Gemini REST client
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
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
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Create a new client against the public endpoint
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different host (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create from config. Fails when no API key is configured.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("Gemini API key not configured (GEMINI_API_KEY)")?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Build the generateContent URL
    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Request body: media first, then the prompt
fn build_request<'a>(media: &'a MediaPayload, prompt: &'a str) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                RequestPart::Inline {
                    inline_data: InlineData {
                        mime_type: &media.mime_type,
                        data: &media.data,
                    },
                },
                RequestPart::Text { text: prompt },
            ],
        }],
    }
}

/// Join the text parts of the first candidate
fn response_text(body: &str) -> Result<String, AnalyzerError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| AnalyzerError::Decode(e.to_string()))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AnalyzerError::Empty);
    }

    Ok(text)
}

/// Map a non-success reply, singling out quota exhaustion
fn classify_failure(status: u16, body: String) -> AnalyzerError {
    let lower = body.to_lowercase();
    if status == 429 || lower.contains("quota") || lower.contains("resource_exhausted") {
        AnalyzerError::QuotaExceeded(body)
    } else {
        AnalyzerError::Http { status, body }
    }
}

#[async_trait]
impl Analyzer for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn analyze(&self, media: &MediaPayload, prompt: &str) -> Result<String, AnalyzerError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(media, prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), body));
        }

        response_text(&body)
    }
}
