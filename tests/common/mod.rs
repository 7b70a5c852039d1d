//! In-memory fakes of the Analyzer and Tracker seams.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};

use taskmirror::adapters::{Analyzer, AnalyzerError, MediaPayload, Tracker, TrackerError};
use taskmirror::core::{ReconcileSettings, SubmissionLimits};
use taskmirror::domain::{
    CreatedIssueRef, IssueDraft, IssueType, Project, TrackedIssue, TrackerUser, Transition,
};
use taskmirror::Processor;

/// Analyzer that returns a canned reply
pub struct FakeAnalyzer {
    reply: Result<String, String>,
    quota: bool,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeAnalyzer {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            quota: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn quota_exhausted() -> Self {
        Self {
            reply: Err("RESOURCE_EXHAUSTED".to_string()),
            quota: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(body: &str) -> Self {
        Self {
            reply: Err(body.to_string()),
            quota: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// (mime type, prompt) of every request
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    fn name(&self) -> &str {
        "fake"
    }

    async fn analyze(&self, media: &MediaPayload, prompt: &str) -> Result<String, AnalyzerError> {
        self.requests
            .lock()
            .unwrap()
            .push((media.mime_type.clone(), prompt.to_string()));

        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(body) if self.quota => Err(AnalyzerError::QuotaExceeded(body.clone())),
            Err(body) => Err(AnalyzerError::Http {
                status: 500,
                body: body.clone(),
            }),
        }
    }
}

struct StoredIssue {
    project: String,
    issue: TrackedIssue,
}

#[derive(Default)]
struct TrackerState {
    projects: Vec<Project>,
    issue_types: Vec<IssueType>,
    issues: Vec<StoredIssue>,
    next_number: u32,
    fail_project_listing: bool,
    fail_issue_types: bool,
    fail_create_titles: Vec<String>,
    fail_search: bool,
    drafts: Vec<IssueDraft>,
    applied: Vec<(String, String)>,
    calls: Vec<String>,
}

/// Tracker with a fixed To Do / In Progress / Done workflow
pub struct FakeTracker {
    state: Mutex<TrackerState>,
    workflow: Vec<(&'static str, Vec<Transition>)>,
}

pub fn project(key: &str, name: &str) -> Project {
    Project {
        id: format!("{}-id", key),
        key: key.to_string(),
        name: name.to_string(),
        project_type_key: Some("software".to_string()),
    }
}

fn base_time() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-01-01T09:00:00+00:00").unwrap()
}

/// Default workflow, keyed by current status
fn english_workflow() -> Vec<(&'static str, Vec<Transition>)> {
    vec![
        (
            "To Do",
            vec![
                Transition::new("11", "Start Progress", "In Progress"),
                Transition::new("31", "Done", "Done"),
            ],
        ),
        (
            "In Progress",
            vec![
                Transition::new("31", "Done", "Done"),
                Transition::new("41", "Stop Progress", "To Do"),
            ],
        ),
        ("Done", vec![Transition::new("41", "Reopen", "To Do")]),
    ]
}

/// Quoted values following `~` in a query
fn jql_keywords(jql: &str) -> Vec<String> {
    jql.split("~ \"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(str::to_lowercase)
        .collect()
}

fn jql_project(jql: &str) -> Option<String> {
    let rest = jql.strip_prefix("project = \"")?;
    rest.split('"').next().map(str::to_string)
}

impl FakeTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                projects: vec![project("CRM", "Customer Relations")],
                issue_types: ["Bug", "Task", "Story"]
                    .iter()
                    .map(|name| IssueType {
                        id: String::new(),
                        name: name.to_string(),
                    })
                    .collect(),
                next_number: 100,
                ..Default::default()
            }),
            workflow: english_workflow(),
        }
    }

    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        self.state.lock().unwrap().projects = projects;
        self
    }

    pub fn with_workflow(mut self, workflow: Vec<(&'static str, Vec<Transition>)>) -> Self {
        self.workflow = workflow;
        self
    }

    /// Seed an issue; `age_days` counts back from a fixed base time
    pub fn with_issue(self, key: &str, summary: &str, status: &str, age_days: i64) -> Self {
        self.state.lock().unwrap().issues.push(StoredIssue {
            project: key.split('-').next().unwrap_or("CRM").to_string(),
            issue: TrackedIssue {
                key: key.to_string(),
                summary: summary.to_string(),
                description: None,
                status: status.to_string(),
                priority: None,
                assignee: None,
                created: Some(base_time() - Duration::days(age_days)),
            },
        });
        self
    }

    pub fn failing_create_for(self, title: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_create_titles
            .push(title.to_string());
        self
    }

    pub fn failing_project_listing(self) -> Self {
        self.state.lock().unwrap().fail_project_listing = true;
        self
    }

    pub fn failing_issue_types(self) -> Self {
        self.state.lock().unwrap().fail_issue_types = true;
        self
    }

    pub fn failing_search(self) -> Self {
        self.state.lock().unwrap().fail_search = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn drafts(&self) -> Vec<IssueDraft> {
        self.state.lock().unwrap().drafts.clone()
    }

    /// (issue key, transition id) of every applied transition
    pub fn applied(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn status_of(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .issues
            .iter()
            .find(|s| s.issue.key == key)
            .map(|s| s.issue.status.clone())
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn transitions_from(&self, status: &str) -> Vec<Transition> {
        self.workflow
            .iter()
            .find(|(from, _)| *from == status)
            .map(|(_, t)| t.clone())
            .unwrap_or_default()
    }
}

fn server_error() -> TrackerError {
    TrackerError::Http {
        status: 500,
        body: "Internal Server Error".to_string(),
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    async fn current_user(&self) -> Result<TrackerUser, TrackerError> {
        self.record("current_user".to_string());
        Ok(TrackerUser {
            account_id: "acc-1".to_string(),
            display_name: "Test Bot".to_string(),
            email_address: Some("bot@example.com".to_string()),
        })
    }

    async fn list_projects(&self) -> Result<Vec<Project>, TrackerError> {
        self.record("list_projects".to_string());
        let state = self.state.lock().unwrap();
        if state.fail_project_listing {
            return Err(server_error());
        }
        Ok(state.projects.clone())
    }

    async fn issue_types(&self, project_key: &str) -> Result<Vec<IssueType>, TrackerError> {
        self.record(format!("issue_types:{}", project_key));
        let state = self.state.lock().unwrap();
        if state.fail_issue_types {
            return Err(server_error());
        }
        Ok(state.issue_types.clone())
    }

    async fn project_statuses(&self, project_key: &str) -> Result<Vec<String>, TrackerError> {
        self.record(format!("project_statuses:{}", project_key));
        Ok(self
            .workflow
            .iter()
            .map(|(status, _)| status.to_string())
            .collect())
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Result<CreatedIssueRef, TrackerError> {
        self.record(format!("create:{}", draft.summary));
        let mut state = self.state.lock().unwrap();
        state.drafts.push(draft.clone());

        if state.fail_create_titles.contains(&draft.summary) {
            return Err(TrackerError::Http {
                status: 400,
                body: "Field 'summary' is invalid".to_string(),
            });
        }

        state.next_number += 1;
        let key = format!("{}-{}", draft.project_key, state.next_number);
        let created = Some(base_time() + Duration::days(state.next_number as i64));
        state.issues.push(StoredIssue {
            project: draft.project_key.clone(),
            issue: TrackedIssue {
                key: key.clone(),
                summary: draft.summary.clone(),
                description: draft.description.clone(),
                status: "To Do".to_string(),
                priority: draft.priority.map(|p| p.tracker_name().to_string()),
                assignee: None,
                created,
            },
        });

        Ok(CreatedIssueRef {
            id: state.next_number.to_string(),
            key,
        })
    }

    async fn search_issues(
        &self,
        jql: &str,
        max_results: u32,
    ) -> Result<Vec<TrackedIssue>, TrackerError> {
        self.record(format!("search:{}", jql));
        let state = self.state.lock().unwrap();
        if state.fail_search {
            return Err(server_error());
        }

        let project = jql_project(jql);
        let keywords = jql_keywords(jql);

        let mut hits: Vec<TrackedIssue> = state
            .issues
            .iter()
            .filter(|s| project.as_deref().map_or(true, |p| s.project == p))
            .filter(|s| {
                keywords.is_empty()
                    || keywords.iter().any(|k| {
                        s.issue.summary.to_lowercase().contains(k)
                            || s.issue
                                .description
                                .as_deref()
                                .is_some_and(|d| d.to_lowercase().contains(k))
                    })
            })
            .map(|s| s.issue.clone())
            .collect();

        hits.sort_by(|a, b| b.created.cmp(&a.created));
        hits.truncate(max_results as usize);
        Ok(hits)
    }

    async fn transitions(&self, issue_key: &str) -> Result<Vec<Transition>, TrackerError> {
        self.record(format!("transitions:{}", issue_key));
        let status = self
            .status_of(issue_key)
            .ok_or_else(|| TrackerError::Http {
                status: 404,
                body: "Issue does not exist".to_string(),
            })?;
        Ok(self.transitions_from(&status))
    }

    async fn apply_transition(
        &self,
        issue_key: &str,
        transition_id: &str,
    ) -> Result<(), TrackerError> {
        self.record(format!("apply:{}:{}", issue_key, transition_id));
        let current = self.status_of(issue_key).unwrap_or_default();
        let transition = self
            .transitions_from(&current)
            .into_iter()
            .find(|t| t.id == transition_id)
            .ok_or_else(|| TrackerError::Http {
                status: 400,
                body: "Transition is not valid".to_string(),
            })?;

        let mut state = self.state.lock().unwrap();
        state
            .applied
            .push((issue_key.to_string(), transition_id.to_string()));
        if let Some(stored) = state.issues.iter_mut().find(|s| s.issue.key == issue_key) {
            stored.issue.status = transition.to;
        }
        Ok(())
    }
}

/// A processor over the given fakes with default settings
pub fn processor(analyzer: Arc<FakeAnalyzer>, tracker: Arc<FakeTracker>) -> Processor {
    Processor::new(
        analyzer,
        tracker,
        ReconcileSettings::default(),
        SubmissionLimits::default(),
    )
}
