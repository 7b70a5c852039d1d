//! Tracker-owned entities, as seen through the tracker's REST API.
//!
//! None of these are persisted locally; they are fetched per run.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::vocabulary::{Priority, TaskStatus};

/// Authenticated tracker account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerUser {
    pub account_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

/// A tracker project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type_key: Option<String>,
}

/// An issue type allowed for creation in a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueType {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

/// An issue as returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedIssue {
    pub key: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<FixedOffset>>,
}

/// A workflow edge available from an issue's current status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    /// Destination status name
    pub to: String,
}

impl Transition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            to: to.into(),
        }
    }
}

/// First transition whose destination denotes `target`
pub fn find_transition(transitions: &[Transition], target: TaskStatus) -> Option<&Transition> {
    transitions
        .iter()
        .find(|t| target.matches_tracker_status(&t.to))
}

/// Fields for a new issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub project_key: String,
    pub summary: String,
    pub description: Option<String>,
    pub issue_type: String,
    /// Omitted from the request when `None`
    pub priority: Option<Priority>,
}

/// Identifiers of a newly created issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssueRef {
    #[serde(default)]
    pub id: String,
    pub key: String,
}
