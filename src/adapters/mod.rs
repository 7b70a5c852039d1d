//! Adapter interfaces for external systems.
//!
//! Two vendors sit behind these traits: the generative-AI model that reads
//! captured media, and the issue tracker that owns every task. The core only
//! talks to the traits, so tests swap in in-memory fakes.

pub mod gemini;
pub mod jira;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    CreatedIssueRef, IssueDraft, IssueType, Project, TrackedIssue, TrackerUser, Transition,
};

// Re-export the concrete adapters
pub use gemini::GeminiClient;
pub use jira::JiraClient;

/// Captured media ready to send inline to the model
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

/// Errors from the AI model boundary
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("AI quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("AI request failed ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("AI request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI response could not be decoded: {0}")]
    Decode(String),

    #[error("AI response contained no text")]
    Empty,
}

/// Errors from the issue-tracker boundary
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("tracker request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("tracker response could not be decoded: {0}")]
    Decode(String),
}

impl TrackerError {
    /// HTTP status, when the tracker answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            TrackerError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the credentials were rejected
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Trait for generative-AI models that read media
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Send one inline-media-plus-prompt request, returning the raw reply text
    async fn analyze(&self, media: &MediaPayload, prompt: &str) -> Result<String, AnalyzerError>;
}

/// Trait for issue trackers.
///
/// Each call is an independent authenticated request; implementations hold
/// no session state beyond static credentials.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Validate credentials by fetching the current user
    async fn current_user(&self) -> Result<TrackerUser, TrackerError>;

    /// Projects visible to the credentials
    async fn list_projects(&self) -> Result<Vec<Project>, TrackerError>;

    /// Issue types allowed for creation in a project
    async fn issue_types(&self, project_key: &str) -> Result<Vec<IssueType>, TrackerError>;

    /// Distinct status names used by a project's workflows
    async fn project_statuses(&self, project_key: &str) -> Result<Vec<String>, TrackerError>;

    async fn create_issue(&self, draft: &IssueDraft) -> Result<CreatedIssueRef, TrackerError>;

    /// Run a query-language search
    async fn search_issues(
        &self,
        jql: &str,
        max_results: u32,
    ) -> Result<Vec<TrackedIssue>, TrackerError>;

    /// Transitions available from the issue's current status
    async fn transitions(&self, issue_key: &str) -> Result<Vec<Transition>, TrackerError>;

    async fn apply_transition(
        &self,
        issue_key: &str,
        transition_id: &str,
    ) -> Result<(), TrackerError>;
}
