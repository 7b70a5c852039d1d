//! Jira Cloud REST v3 adapter.
//!
//! Auth: `Basic base64(email:api_token)` on every request.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Tracker, TrackerError};
use crate::config::TrackerConfig;
use crate::domain::{
    CreatedIssueRef, IssueDraft, IssueType, Project, TrackedIssue, TrackerUser, Transition,
};

/// Fields requested from search
const SEARCH_FIELDS: &str = "summary,description,status,priority,assignee,created";

/// Jira REST client
pub struct JiraClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CreateMetaResponse {
    #[serde(default)]
    projects: Vec<CreateMetaProject>,
}

#[derive(Debug, Deserialize)]
struct CreateMetaProject {
    #[serde(default)]
    issuetypes: Vec<IssueType>,
}

#[derive(Debug, Deserialize)]
struct StatusesByIssueType {
    #[serde(default)]
    statuses: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<IssueWire>,
}

#[derive(Debug, Deserialize)]
struct IssueWire {
    key: String,
    fields: IssueFieldsWire,
}

#[derive(Debug, Deserialize)]
struct IssueFieldsWire {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    status: Option<Named>,
    #[serde(default)]
    priority: Option<Named>,
    #[serde(default)]
    assignee: Option<AssigneeWire>,
    #[serde(default)]
    created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssigneeWire {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<TransitionWire>,
}

#[derive(Debug, Deserialize)]
struct TransitionWire {
    id: String,
    #[serde(default)]
    name: String,
    to: Named,
}

impl JiraClient {
    /// Create a new client
    pub fn new(base_url: &str, email: &str, api_token: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            auth_header: basic_auth_header(email, api_token),
            client: reqwest::Client::new(),
        }
    }

    /// Create from config. Fails when any credential is missing.
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        let (base_url, email, token) = config
            .credentials()
            .context("Jira credentials not configured (JIRA_BASE_URL, JIRA_EMAIL, JIRA_API_TOKEN)")?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            ..Self::new(base_url, email, token)
        })
    }

    /// Build API URL
    fn api_url(&self, path: &str) -> String {
        format!("{}/rest/api/3/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TrackerError> {
        let response = self
            .client
            .get(self.api_url(path))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?;

        decode(ensure_success(response).await?).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<reqwest::Response, TrackerError> {
        let response = self
            .client
            .post(self.api_url(path))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        ensure_success(response).await
    }
}

/// `Basic` header value for email + API token
pub fn basic_auth_header(email: &str, api_token: &str) -> String {
    let raw = format!("{}:{}", email.trim(), api_token.trim());
    format!("Basic {}", STANDARD.encode(raw))
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TrackerError::Http {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TrackerError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| TrackerError::Decode(e.to_string()))
}

/// Single-paragraph Atlassian Document Format body
pub fn adf_document(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{ "type": "text", "text": text }],
        }],
    })
}

/// Flatten an ADF document (or a legacy plain string) to text
pub fn adf_plain_text(value: &Value) -> String {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.push(s.clone()),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    out.push(text.clone());
                }
                if let Some(content) = map.get("content") {
                    collect(content, out);
                }
            }
            Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
            _ => {}
        }
    }

    let mut out = Vec::new();
    collect(value, &mut out);
    out.join(" ")
}

/// Request body for issue creation
pub fn issue_payload(draft: &IssueDraft) -> Value {
    let mut fields = json!({
        "project": { "key": draft.project_key },
        "summary": draft.summary,
        "issuetype": { "name": draft.issue_type },
    });

    if let Some(description) = &draft.description {
        fields["description"] = adf_document(description);
    }
    if let Some(priority) = draft.priority {
        fields["priority"] = json!({ "name": priority.tracker_name() });
    }

    json!({ "fields": fields })
}

/// Parse Jira timestamps (`2024-03-01T10:15:30.000+0000`)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}

impl From<IssueWire> for TrackedIssue {
    fn from(wire: IssueWire) -> Self {
        let fields = wire.fields;
        Self {
            key: wire.key,
            summary: fields.summary.unwrap_or_default(),
            description: fields
                .description
                .as_ref()
                .map(adf_plain_text)
                .filter(|d| !d.is_empty()),
            status: fields.status.map(|s| s.name).unwrap_or_default(),
            priority: fields.priority.map(|p| p.name),
            assignee: fields.assignee.and_then(|a| a.display_name),
            created: fields.created.as_deref().and_then(parse_timestamp),
        }
    }
}

#[async_trait]
impl Tracker for JiraClient {
    async fn current_user(&self) -> Result<TrackerUser, TrackerError> {
        self.get_json("myself", &[]).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>, TrackerError> {
        self.get_json("project", &[]).await
    }

    async fn issue_types(&self, project_key: &str) -> Result<Vec<IssueType>, TrackerError> {
        let meta: CreateMetaResponse = self
            .get_json(
                "issue/createmeta",
                &[
                    ("projectKeys", project_key.to_string()),
                    ("expand", "projects.issuetypes".to_string()),
                ],
            )
            .await?;

        Ok(meta
            .projects
            .into_iter()
            .next()
            .map(|p| p.issuetypes)
            .unwrap_or_default())
    }

    async fn project_statuses(&self, project_key: &str) -> Result<Vec<String>, TrackerError> {
        let path = format!("project/{}/statuses", urlencoding::encode(project_key));
        let by_type: Vec<StatusesByIssueType> = self.get_json(&path, &[]).await?;

        let mut names: Vec<String> = Vec::new();
        for status in by_type.into_iter().flat_map(|t| t.statuses) {
            if !names.contains(&status.name) {
                names.push(status.name);
            }
        }
        Ok(names)
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Result<CreatedIssueRef, TrackerError> {
        let response = self.post_json("issue", &issue_payload(draft)).await?;
        decode(response).await
    }

    async fn search_issues(
        &self,
        jql: &str,
        max_results: u32,
    ) -> Result<Vec<TrackedIssue>, TrackerError> {
        let result: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("jql", jql.to_string()),
                    ("maxResults", max_results.to_string()),
                    ("fields", SEARCH_FIELDS.to_string()),
                ],
            )
            .await?;

        Ok(result.issues.into_iter().map(TrackedIssue::from).collect())
    }

    async fn transitions(&self, issue_key: &str) -> Result<Vec<Transition>, TrackerError> {
        let path = format!("issue/{}/transitions", urlencoding::encode(issue_key));
        let result: TransitionsResponse = self.get_json(&path, &[]).await?;

        Ok(result
            .transitions
            .into_iter()
            .map(|t| Transition::new(t.id, t.name, t.to.name))
            .collect())
    }

    async fn apply_transition(
        &self,
        issue_key: &str,
        transition_id: &str,
    ) -> Result<(), TrackerError> {
        let path = format!("issue/{}/transitions", urlencoding::encode(issue_key));
        self.post_json(&path, &json!({ "transition": { "id": transition_id } }))
            .await?;
        Ok(())
    }
}
