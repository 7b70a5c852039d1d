//! Per-item results of a reconciliation run.
//!
//! Every task and directive yields exactly one `ItemOutcome`, so a batch is
//! fully inspectable without reading logs.

use serde::{Deserialize, Serialize};

/// Which input an outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Task,
    Directive,
}

/// Identifies the input item an outcome refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    /// Position within its input list
    pub index: usize,
    /// Task title, or the joined search keywords of a directive
    pub label: String,
}

impl ItemRef {
    pub fn task(index: usize, title: &str) -> Self {
        Self {
            kind: ItemKind::Task,
            index,
            label: title.to_string(),
        }
    }

    pub fn directive(index: usize, keywords: &[String]) -> Self {
        Self {
            kind: ItemKind::Directive,
            index,
            label: keywords.join(", "),
        }
    }
}

/// An issue created from an extracted task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub key: String,
    pub title: String,
    /// Status label inferred by the model
    pub status: String,
    /// Where the task came from (interface or medium)
    pub source: String,
    /// Project the issue was created in
    pub project: String,
}

/// An existing issue moved through its workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedIssue {
    pub key: String,
    pub title: String,
    pub old_status: String,
    pub new_status: String,
    pub reason: String,
}

/// Result of processing one task or directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Created {
        item: ItemRef,
        issue: CreatedIssue,
    },
    Updated {
        item: ItemRef,
        issue: UpdatedIssue,
    },
    /// Nothing to do (no match, no transition, flagged as update, ...)
    Skipped { item: ItemRef, reason: String },
    /// A tracker call failed for this item
    Failed { item: ItemRef, reason: String },
}

impl ItemOutcome {
    pub fn item(&self) -> &ItemRef {
        match self {
            ItemOutcome::Created { item, .. }
            | ItemOutcome::Updated { item, .. }
            | ItemOutcome::Skipped { item, .. }
            | ItemOutcome::Failed { item, .. } => item,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed { .. })
    }
}

/// Everything a reconciliation run did, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub outcomes: Vec<ItemOutcome>,
}

impl ReconciliationResult {
    pub fn push(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn created(&self) -> Vec<&CreatedIssue> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ItemOutcome::Created { issue, .. } => Some(issue),
                _ => None,
            })
            .collect()
    }

    pub fn updated(&self) -> Vec<&UpdatedIssue> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ItemOutcome::Updated { issue, .. } => Some(issue),
                _ => None,
            })
            .collect()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Skipped { .. }))
            .count()
    }

    /// Created plus updated
    pub fn total_processed(&self) -> usize {
        self.created().len() + self.updated().len()
    }

    /// Human-readable count summary
    pub fn summary(&self) -> String {
        format!(
            "Created tasks: {}, updated: {}",
            self.created().len(),
            self.updated().len()
        )
    }
}
