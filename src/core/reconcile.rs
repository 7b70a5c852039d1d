//! Task reconciliation against the issue tracker.
//!
//! One run takes a parsed [`Analysis`] and mirrors it into the tracker:
//! - Update pass: each directive searches for an existing issue and moves it
//!   through its workflow
//! - Create pass: each new task becomes an issue, optionally transitioned out
//!   of the initial status
//!
//! Every item yields one [`ItemOutcome`]. Tracker failures affect only the
//! item being processed; the only run-level failure is a tracker with no
//! accessible project.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{Tracker, TrackerError};
use crate::domain::{
    find_transition, Analysis, CreatedIssue, ExtractedTask, IssueDraft, IssueType, ItemOutcome,
    ItemRef, MediaKind, Project, ReconciliationResult, SessionContext, TaskStatus, TrackedIssue,
    Transition, UpdateDirective, UpdatedIssue,
};

/// Issue type used when discovery fails or offers nothing preferred
pub const FALLBACK_ISSUE_TYPE: &str = "Task";

/// Issue types we create, most preferred first
const PREFERRED_ISSUE_TYPES: &[&str] = &["Task", "Story", "Bug"];

/// How a directive picks its target among several search hits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Newest issue by creation time
    #[default]
    MostRecent,

    /// Skip the directive unless exactly one issue matches
    RequireUnique,
}

/// Reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSettings {
    /// Project searched by directives and preferred for new issues
    pub project_key: String,

    /// Substring of a key or name to fall back to when the preferred project
    /// is not accessible
    pub project_hint: Option<String>,

    /// Search result cap per directive
    pub search_max_results: u32,

    pub match_policy: MatchPolicy,

    /// Cap on created issues per submission (none by default)
    pub max_tasks_per_submission: Option<usize>,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            project_key: "CRM".to_string(),
            project_hint: Some("LEARN".to_string()),
            search_max_results: 5,
            match_policy: MatchPolicy::MostRecent,
            max_tasks_per_submission: None,
        }
    }
}

/// Run-level reconciliation failures
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("no accessible tracker project")]
    NoAccessibleProject,

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Outcome of picking an update target among search hits
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSelection<'a> {
    Found(&'a TrackedIssue),
    NoMatch,
    Ambiguous(usize),
}

/// Escape a value for use inside a double-quoted query string
fn escape_jql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Characters Jira's text search treats as query syntax
const TEXT_SEARCH_RESERVED: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '[', ']', '{', '}', '^', '~', '*', '?', ':', '\\', '/',
    '"',
];

/// Replace text-search operators with spaces and collapse whitespace
fn sanitize_keyword(keyword: &str) -> String {
    keyword
        .replace(TEXT_SEARCH_RESERVED, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keyword search over summary and description, newest first.
///
/// Returns `None` when no usable keyword remains after sanitizing.
pub fn build_search_jql(project_key: &str, keywords: &[&str]) -> Option<String> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| sanitize_keyword(k))
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return None;
    }

    let clauses = keywords
        .iter()
        .map(|k| format!("summary ~ \"{k}\" OR description ~ \"{k}\""))
        .collect::<Vec<_>>()
        .join(" OR ");

    Some(format!(
        "project = \"{}\" AND ({}) ORDER BY created DESC",
        escape_jql(project_key),
        clauses
    ))
}

/// Every issue in a project, newest first
pub fn recent_issues_jql(project_key: &str) -> String {
    format!(
        "project = \"{}\" ORDER BY created DESC",
        escape_jql(project_key)
    )
}

/// Preferred key, then hint match on key or name, then the first project
pub fn choose_project<'a>(
    projects: &'a [Project],
    preferred_key: &str,
    hint: Option<&str>,
) -> Option<&'a Project> {
    if let Some(project) = projects.iter().find(|p| p.key == preferred_key) {
        return Some(project);
    }

    if let Some(hint) = hint.map(str::to_lowercase).filter(|h| !h.is_empty()) {
        let hinted = projects.iter().find(|p| {
            p.key.to_lowercase().contains(&hint) || p.name.to_lowercase().contains(&hint)
        });
        if hinted.is_some() {
            return hinted;
        }
    }

    projects.first()
}

/// First available of Task, Story, Bug; "Task" otherwise
pub fn choose_issue_type(types: &[IssueType]) -> String {
    PREFERRED_ISSUE_TYPES
        .iter()
        .find(|preferred| types.iter().any(|t| t.name == **preferred))
        .unwrap_or(&FALLBACK_ISSUE_TYPE)
        .to_string()
}

/// Pick the directive's target among search hits
pub fn select_update_target(issues: &[TrackedIssue], policy: MatchPolicy) -> TargetSelection<'_> {
    match (issues.len(), policy) {
        (0, _) => TargetSelection::NoMatch,
        (n, MatchPolicy::RequireUnique) if n > 1 => TargetSelection::Ambiguous(n),
        _ => {
            // Strictly newer wins, so ties keep tracker order
            let mut best = &issues[0];
            for issue in &issues[1..] {
                if issue.created > best.created {
                    best = issue;
                }
            }
            TargetSelection::Found(best)
        }
    }
}

/// Issue description: the task's own text, then provenance lines
pub fn compose_description(
    task: &ExtractedTask,
    session: &SessionContext,
    project_key: &str,
    interface_type: Option<&str>,
) -> String {
    let mut lines = vec![
        format!("Source: {}", session.kind.origin_label()),
        format!("Session: {}", session.session_id),
    ];

    if session.kind != MediaKind::Audio {
        if let Some(interface) = interface_type.filter(|i| !i.trim().is_empty() && *i != "unknown")
        {
            lines.push(format!("Interface: {}", interface));
        }
    }

    lines.push(format!(
        "Project: {}",
        task.project.as_deref().unwrap_or(project_key)
    ));
    lines.push(format!(
        "Assignee: {}",
        task.assignee.as_deref().unwrap_or("Unassigned")
    ));
    if let Some(deadline) = task.deadline.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(format!("Deadline: {}", deadline));
    }
    lines.push(format!(
        "Status: {}",
        task.status
            .as_deref()
            .unwrap_or(TaskStatus::ToDo.label())
    ));

    let provenance = lines.join("\n");
    match task.description.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!("{}\n\n{}", text, provenance),
        _ => provenance,
    }
}

/// Mirrors analyses into the tracker
pub struct Reconciler {
    tracker: Arc<dyn Tracker>,
    settings: ReconcileSettings,
}

impl Reconciler {
    pub fn new(tracker: Arc<dyn Tracker>, settings: ReconcileSettings) -> Self {
        Self { tracker, settings }
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Run the update pass, then the create pass
    #[instrument(skip(self, analysis, session), fields(session = %session.session_id, kind = %session.kind))]
    pub async fn reconcile(
        &self,
        analysis: &Analysis,
        session: &SessionContext,
    ) -> Result<ReconciliationResult, ReconcileError> {
        info!(
            tasks = analysis.tasks.len(),
            updates = analysis.task_updates.len(),
            "Starting reconciliation"
        );

        let mut result = ReconciliationResult::default();

        for (index, directive) in analysis.task_updates.iter().enumerate() {
            let outcome = self.apply_directive(index, directive).await;
            result.push(outcome);
        }

        let mut attempted = 0usize;
        for (index, task) in analysis.tasks.iter().enumerate() {
            let item = ItemRef::task(index, &task.title);

            if task.is_update {
                debug!(title = %task.title, "Task flagged as update, not creating");
                result.push(ItemOutcome::Skipped {
                    item,
                    reason: "flagged as an update to existing work".to_string(),
                });
                continue;
            }

            if let Some(cap) = self.settings.max_tasks_per_submission {
                if attempted >= cap {
                    result.push(ItemOutcome::Skipped {
                        item,
                        reason: format!("task cap of {} reached", cap),
                    });
                    continue;
                }
            }
            attempted += 1;

            let outcome = self
                .create_task(item, task, session, analysis.interface_type.as_deref())
                .await?;
            result.push(outcome);
        }

        info!(
            created = result.created().len(),
            updated = result.updated().len(),
            skipped = result.skipped_count(),
            failed = result.failed_count(),
            "Reconciliation finished"
        );

        Ok(result)
    }

    /// Create an issue from a bare title and description
    #[instrument(skip(self, description))]
    pub async fn create_plain_issue(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<CreatedIssue, ReconcileError> {
        let project = self.resolve_project().await?;
        let issue_type = self.resolve_issue_type(&project.key).await;

        let draft = IssueDraft {
            project_key: project.key.clone(),
            summary: title.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            issue_type,
            priority: None,
        };

        let created = self.tracker.create_issue(&draft).await?;
        info!(key = %created.key, "Created issue");

        Ok(CreatedIssue {
            key: created.key,
            title: title.to_string(),
            status: TaskStatus::ToDo.label().to_string(),
            source: "Manual".to_string(),
            project: project.key,
        })
    }

    /// Project new issues go to
    pub async fn resolve_project(&self) -> Result<Project, ReconcileError> {
        let projects = self.tracker.list_projects().await?;
        choose_project(
            &projects,
            &self.settings.project_key,
            self.settings.project_hint.as_deref(),
        )
        .cloned()
        .ok_or(ReconcileError::NoAccessibleProject)
    }

    async fn resolve_issue_type(&self, project_key: &str) -> String {
        match self.tracker.issue_types(project_key).await {
            Ok(types) => choose_issue_type(&types),
            Err(e) => {
                warn!(project = %project_key, error = %e, "Issue type discovery failed, using Task");
                FALLBACK_ISSUE_TYPE.to_string()
            }
        }
    }

    /// Move an issue to `target` if its workflow allows it.
    ///
    /// Returns the transition taken, or `None` when no transition leads to
    /// the target from the issue's current status.
    pub async fn transition_to(
        &self,
        issue_key: &str,
        target: TaskStatus,
    ) -> Result<Option<Transition>, TrackerError> {
        let transitions = self.tracker.transitions(issue_key).await?;

        let Some(transition) = find_transition(&transitions, target).cloned() else {
            return Ok(None);
        };

        self.tracker
            .apply_transition(issue_key, &transition.id)
            .await?;
        info!(issue = %issue_key, to = %transition.to, "Transitioned issue");

        Ok(Some(transition))
    }

    async fn apply_directive(&self, index: usize, directive: &UpdateDirective) -> ItemOutcome {
        let item = ItemRef::directive(index, &directive.search_keywords);
        let skip = |reason: String| ItemOutcome::Skipped {
            item: item.clone(),
            reason,
        };
        let fail = |e: TrackerError| ItemOutcome::Failed {
            item: item.clone(),
            reason: e.to_string(),
        };

        let keywords = directive.keywords();
        let Some(jql) = build_search_jql(&self.settings.project_key, &keywords) else {
            return skip("no search keywords".to_string());
        };

        let Some(target) = directive.target_status() else {
            return skip(format!("unrecognized status '{}'", directive.new_status));
        };

        debug!(%jql, "Searching for update target");
        let issues = match self
            .tracker
            .search_issues(&jql, self.settings.search_max_results)
            .await
        {
            Ok(issues) => issues,
            Err(e) => {
                warn!(keywords = ?keywords, error = %e, "Search failed");
                return fail(e);
            }
        };

        let issue = match select_update_target(&issues, self.settings.match_policy) {
            TargetSelection::Found(issue) => issue,
            TargetSelection::NoMatch => {
                info!(keywords = ?keywords, "No existing issue matches directive");
                return skip("no matching issue".to_string());
            }
            TargetSelection::Ambiguous(n) => {
                info!(keywords = ?keywords, matches = n, "Directive matches several issues");
                return skip(format!("{} issues match, expected one", n));
            }
        };

        match self.transition_to(&issue.key, target).await {
            Ok(Some(transition)) => ItemOutcome::Updated {
                issue: UpdatedIssue {
                    key: issue.key.clone(),
                    title: issue.summary.clone(),
                    old_status: issue.status.clone(),
                    new_status: transition.to,
                    reason: directive.reason.clone(),
                },
                item: item.clone(),
            },
            Ok(None) => {
                info!(issue = %issue.key, %target, "No transition to target status");
                skip(format!(
                    "no transition to {} from '{}'",
                    target, issue.status
                ))
            }
            Err(e) => {
                warn!(issue = %issue.key, error = %e, "Transition failed");
                fail(e)
            }
        }
    }

    async fn create_task(
        &self,
        item: ItemRef,
        task: &ExtractedTask,
        session: &SessionContext,
        interface_type: Option<&str>,
    ) -> Result<ItemOutcome, ReconcileError> {
        let project = match self.resolve_project().await {
            Ok(project) => project,
            Err(ReconcileError::Tracker(e)) => {
                warn!(title = %task.title, error = %e, "Project listing failed");
                return Ok(ItemOutcome::Failed {
                    item,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let issue_type = self.resolve_issue_type(&project.key).await;
        let draft = IssueDraft {
            project_key: project.key.clone(),
            summary: task.title.clone(),
            description: Some(compose_description(
                task,
                session,
                &project.key,
                interface_type,
            )),
            issue_type,
            priority: task.tracker_priority(),
        };

        let created = match self.tracker.create_issue(&draft).await {
            Ok(created) => created,
            Err(e) => {
                warn!(title = %task.title, error = %e, "Issue creation failed");
                return Ok(ItemOutcome::Failed {
                    item,
                    reason: e.to_string(),
                });
            }
        };
        info!(key = %created.key, title = %task.title, "Created issue");

        let status = task.parsed_status();
        if !status.is_initial() {
            match self.transition_to(&created.key, status).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    warn!(issue = %created.key, %status, "No transition for inferred status")
                }
                Err(e) => {
                    warn!(issue = %created.key, error = %e, "Post-create transition failed")
                }
            }
        }

        Ok(ItemOutcome::Created {
            item,
            issue: CreatedIssue {
                key: created.key,
                title: task.title.clone(),
                status: task
                    .status
                    .clone()
                    .unwrap_or_else(|| TaskStatus::ToDo.label().to_string()),
                source: task
                    .source
                    .clone()
                    .unwrap_or_else(|| session.kind.origin_label().to_string()),
                project: project.key,
            },
        })
    }
}
