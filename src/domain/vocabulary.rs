//! Status and priority vocabularies.
//!
//! The AI model answers in free text (often Russian), and tracker workflows
//! use their own, sometimes localized, status names. Every label that crosses
//! either boundary is resolved through the tables in this module.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Workflow status of an extracted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Planned, not started. The tracker's initial status.
    ToDo,

    /// Started, currently being worked on
    InProgress,

    /// Finished
    Done,
}

/// Severity of an extracted task, in the tracker's three-level vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Synonyms per status, lowercase and whitespace-normalized.
///
/// Used both to parse AI labels (exact match) and to recognise transition
/// destinations (substring match).
const STATUS_SYNONYMS: &[(TaskStatus, &[&str])] = &[
    (
        TaskStatus::ToDo,
        &["to do", "todo", "к выполнению", "сделать"],
    ),
    (
        TaskStatus::InProgress,
        &["in progress", "inprogress", "в работе", "в процессе"],
    ),
    (
        TaskStatus::Done,
        &[
            "done",
            "completed",
            "finished",
            "готово",
            "выполнено",
            "завершено",
        ],
    ),
];

const PRIORITY_SYNONYMS: &[(Priority, &[&str])] = &[
    (Priority::High, &["high", "высокий"]),
    (Priority::Low, &["low", "низкий"]),
];

/// Lowercase, treat `_` and `-` as spaces, collapse runs of whitespace
pub fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl TaskStatus {
    /// Resolve a free-text label. Returns `None` for unrecognized labels.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = normalize_label(label);
        STATUS_SYNONYMS
            .iter()
            .find(|(_, synonyms)| synonyms.contains(&normalized.as_str()))
            .map(|(status, _)| *status)
    }

    /// All known spellings of this status
    pub fn synonyms(self) -> &'static [&'static str] {
        STATUS_SYNONYMS
            .iter()
            .find(|(status, _)| *status == self)
            .map(|(_, synonyms)| *synonyms)
            .unwrap_or(&[])
    }

    /// Whether a tracker status name denotes this status.
    ///
    /// Case-insensitive substring match against every synonym, so a
    /// destination named "In Progress", "IN PROGRESS (dev)" or "В работе"
    /// all satisfy `InProgress`.
    pub fn matches_tracker_status(self, tracker_status: &str) -> bool {
        let normalized = normalize_label(tracker_status);
        self.synonyms()
            .iter()
            .any(|synonym| normalized.contains(synonym))
    }

    /// Canonical English label, as narrated in issue descriptions
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    /// Whether newly created issues already sit in this status
    pub fn is_initial(self) -> bool {
        self == TaskStatus::ToDo
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Priority {
    /// Map a free-text label. Total: anything unrecognized is `Medium`.
    pub fn from_label(label: &str) -> Self {
        let normalized = normalize_label(label);
        PRIORITY_SYNONYMS
            .iter()
            .find(|(_, synonyms)| synonyms.contains(&normalized.as_str()))
            .map(|(priority, _)| *priority)
            .unwrap_or(Priority::Medium)
    }

    /// Map an optional label; an absent label is `Medium`
    pub fn from_optional(label: Option<&str>) -> Self {
        label.map(Self::from_label).unwrap_or(Priority::Medium)
    }

    /// Priority name as the tracker expects it
    pub fn tracker_name(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tracker_name())
    }
}
