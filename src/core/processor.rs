//! Request-scoped submission pipeline.
//!
//! One submission flows through:
//! credentials check -> media resolution and limits -> AI call -> parse ->
//! reconcile -> report.
//!
//! The processor is immutable once built and is shared behind an `Arc`, so
//! concurrent submissions never touch common mutable state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::limits::SubmissionLimits;
use super::parser::parse_analysis;
use super::prompts::extraction_prompt;
use super::reconcile::{ReconcileError, ReconcileSettings, Reconciler};
use crate::adapters::{
    Analyzer, AnalyzerError, GeminiClient, JiraClient, MediaPayload, Tracker, TrackerError,
};
use crate::config::{Config, DEFAULT_RESPONSE_LANGUAGE};
use crate::domain::{
    Analysis, CreatedIssue, ItemOutcome, MediaKind, ReconciliationResult, SessionContext,
    UpdatedIssue,
};

/// A media submission, as posted by a capture client.
///
/// The media field is accepted under the name each route historically used
/// (`audioData`, `imageData`, `videoData`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    /// Base64 media, optionally as a `data:` URL
    #[serde(default, alias = "audioData", alias = "imageData", alias = "videoData")]
    pub data: Option<String>,

    /// Remote recording to download (audio only)
    #[serde(default)]
    pub audio_url: Option<String>,

    #[serde(default)]
    pub mime_type: Option<String>,

    /// Meeting or capture session id, for traceability only
    #[serde(default, alias = "meetingId")]
    pub session_id: Option<String>,
}

/// Submission failures, each mapped to an HTTP status
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("{0} not configured")]
    NotConfigured(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("AI quota exceeded, please wait a minute and try again")]
    QuotaExceeded,

    #[error("analysis failed: {0}")]
    Analysis(AnalyzerError),

    #[error("no accessible tracker project")]
    NoAccessibleProject,

    #[error(transparent)]
    Tracker(TrackerError),
}

impl SubmissionError {
    pub fn status_code(&self) -> u16 {
        match self {
            SubmissionError::NotConfigured(_) => 503,
            SubmissionError::InvalidRequest(_) => 400,
            SubmissionError::QuotaExceeded => 429,
            SubmissionError::Tracker(e) if e.is_auth_failure() => e.status().unwrap_or(500),
            _ => 500,
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, SubmissionError::QuotaExceeded)
    }
}

impl From<AnalyzerError> for SubmissionError {
    fn from(e: AnalyzerError) -> Self {
        match e {
            AnalyzerError::QuotaExceeded(body) => {
                warn!(%body, "AI quota exceeded");
                SubmissionError::QuotaExceeded
            }
            other => SubmissionError::Analysis(other),
        }
    }
}

impl From<ReconcileError> for SubmissionError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::NoAccessibleProject => SubmissionError::NoAccessibleProject,
            ReconcileError::Tracker(e) => SubmissionError::Tracker(e),
        }
    }
}

/// JSON report returned for a processed submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    pub success: bool,
    pub analysis: Analysis,
    /// The model's reply held no usable JSON
    pub analysis_degraded: bool,
    pub created_tasks: Vec<CreatedIssue>,
    pub updated_tasks: Vec<UpdatedIssue>,
    pub outcomes: Vec<ItemOutcome>,
    pub total_processed: usize,
    pub session_id: String,
    pub message: String,
}

impl SubmissionReport {
    fn new(
        session: &SessionContext,
        analysis: Analysis,
        degraded: bool,
        result: ReconciliationResult,
    ) -> Self {
        let message = format!(
            "{} processed successfully. {}",
            session.kind.noun(),
            result.summary()
        );

        Self {
            success: true,
            created_tasks: result.created().into_iter().cloned().collect(),
            updated_tasks: result.updated().into_iter().cloned().collect(),
            total_processed: result.total_processed(),
            outcomes: result.outcomes,
            analysis,
            analysis_degraded: degraded,
            session_id: session.session_id.clone(),
            message,
        }
    }
}

/// Split a `data:<mime>;base64,` URL into its MIME type and payload.
/// Plain base64 comes back unchanged with no MIME type.
fn split_data_url(data: &str) -> (Option<&str>, &str) {
    let Some(rest) = data.strip_prefix("data:") else {
        return (None, data);
    };
    match rest.split_once(',') {
        Some((header, body)) => {
            let mime = header.split(';').next().map(str::trim).filter(|m| !m.is_empty());
            (mime, body)
        }
        None => (None, rest),
    }
}

/// Runs submissions end to end
pub struct Processor {
    analyzer: Option<Arc<dyn Analyzer>>,
    tracker: Option<Arc<dyn Tracker>>,
    settings: ReconcileSettings,
    limits: SubmissionLimits,
    language: String,
    http: reqwest::Client,
}

impl Processor {
    /// Create a processor from ready-made clients
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        tracker: Arc<dyn Tracker>,
        settings: ReconcileSettings,
        limits: SubmissionLimits,
    ) -> Self {
        Self {
            analyzer: Some(analyzer),
            tracker: Some(tracker),
            settings,
            limits,
            language: DEFAULT_RESPONSE_LANGUAGE.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Language the model writes free text in
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Build clients from config.
    ///
    /// Missing credentials are not an error here: each submission reports
    /// `NotConfigured` instead, so the server can still start and answer
    /// health checks.
    pub fn from_config(config: &Config) -> Result<Self> {
        let analyzer: Option<Arc<dyn Analyzer>> = match config.ai.api_key {
            Some(_) => Some(Arc::new(GeminiClient::from_config(&config.ai)?)),
            None => {
                warn!("GEMINI_API_KEY not set, submissions will be rejected");
                None
            }
        };

        let tracker: Option<Arc<dyn Tracker>> = match config.tracker.credentials() {
            Some(_) => Some(Arc::new(JiraClient::from_config(&config.tracker)?)),
            None => {
                warn!("Jira credentials not set, tracker calls will be rejected");
                None
            }
        };

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.ai.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            analyzer,
            tracker,
            settings: config.reconcile.clone(),
            limits: config.limits.clone(),
            language: config.ai.response_language.clone(),
            http,
        })
    }

    pub fn limits(&self) -> &SubmissionLimits {
        &self.limits
    }

    /// The tracker client, or `NotConfigured`
    pub fn tracker(&self) -> Result<Arc<dyn Tracker>, SubmissionError> {
        self.tracker.clone().ok_or_else(|| {
            SubmissionError::NotConfigured(
                "Jira credentials (JIRA_BASE_URL, JIRA_EMAIL, JIRA_API_TOKEN)".to_string(),
            )
        })
    }

    /// A reconciler over the configured tracker
    pub fn reconciler(&self) -> Result<Reconciler, SubmissionError> {
        Ok(Reconciler::new(self.tracker()?, self.settings.clone()))
    }

    fn analyzer(&self) -> Result<Arc<dyn Analyzer>, SubmissionError> {
        self.analyzer
            .clone()
            .ok_or_else(|| SubmissionError::NotConfigured("Gemini API key (GEMINI_API_KEY)".to_string()))
    }

    /// Process one submission
    #[instrument(skip(self, request))]
    pub async fn process(
        &self,
        kind: MediaKind,
        request: SubmissionRequest,
    ) -> Result<SubmissionReport, SubmissionError> {
        // Credentials first, before any other work
        let analyzer = self.analyzer()?;
        let reconciler = self.reconciler()?;

        let session_id = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let session = SessionContext::new(session_id, kind);

        let media = self.resolve_media(kind, &request).await?;
        info!(
            session = %session.session_id,
            mime = %media.mime_type,
            encoded_len = media.data.len(),
            analyzer = analyzer.name(),
            "Sending media for analysis"
        );

        let prompt = extraction_prompt(kind, &self.language);
        let text = analyzer.analyze(&media, &prompt).await?;
        info!(reply_len = text.len(), "Model reply received");

        let parsed = parse_analysis(&text, kind);
        let result = reconciler.reconcile(&parsed.analysis, &session).await?;

        let report = SubmissionReport::new(&session, parsed.analysis, parsed.degraded, result);
        info!(message = %report.message, "Submission processed");
        Ok(report)
    }

    /// Inline base64 media, or a downloaded recording
    async fn resolve_media(
        &self,
        kind: MediaKind,
        request: &SubmissionRequest,
    ) -> Result<MediaPayload, SubmissionError> {
        let inline = request
            .data
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let url = request
            .audio_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        let (bytes, encoded, embedded_mime) = match (inline, url) {
            (Some(data), _) => {
                let (mime, encoded) = split_data_url(data);
                let bytes = STANDARD.decode(encoded).map_err(|e| {
                    SubmissionError::InvalidRequest(format!("media is not valid base64: {}", e))
                })?;
                (bytes, Some(encoded), mime)
            }
            (None, Some(url)) if kind == MediaKind::Audio => {
                (self.download(url).await?, None, None)
            }
            _ => {
                return Err(SubmissionError::InvalidRequest(format!(
                    "no {} data provided",
                    kind
                )))
            }
        };

        self.limits
            .validate_media(&bytes)
            .map_err(|e| SubmissionError::InvalidRequest(e.to_string()))?;

        let mime_type = request
            .mime_type
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .or(embedded_mime)
            .unwrap_or(kind.default_mime())
            .to_string();

        Ok(MediaPayload {
            mime_type,
            data: match encoded {
                Some(encoded) => encoded.to_string(),
                None => STANDARD.encode(&bytes),
            },
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SubmissionError> {
        info!(%url, "Downloading recording");
        let invalid = |e: reqwest::Error| {
            SubmissionError::InvalidRequest(format!("could not download recording: {}", e))
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(invalid)?;
        let bytes = response.bytes().await.map_err(invalid)?;
        Ok(bytes.to_vec())
    }
}
