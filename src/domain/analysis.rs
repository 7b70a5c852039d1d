//! Structured AI analysis of a captured medium.
//!
//! Field names follow the JSON schema the extraction prompts ask the model
//! for, so an `Analysis` decodes straight from the model's embedded object.

use serde::{Deserialize, Deserializer, Serialize};

use super::media::MediaKind;
use super::vocabulary::{Priority, TaskStatus};

/// Decodes an explicit `null` the same way as a missing field
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// An action item detected by the AI model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTask {
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,

    /// Free-text priority label ("Высокий", "high", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    /// Free-text status label ("To Do", "В работе", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Project name seen in the captured interface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Where the item was seen (Jira, Trello, chat, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, deserialize_with = "null_default")]
    pub is_update: bool,
}

impl ExtractedTask {
    /// Convenience constructor used by callers building tasks by hand
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Parsed status; unrecognized or absent labels count as `ToDo`
    pub fn parsed_status(&self) -> TaskStatus {
        self.status
            .as_deref()
            .and_then(TaskStatus::parse)
            .unwrap_or(TaskStatus::ToDo)
    }

    /// Tracker priority, or `None` when the model gave no priority at all
    pub fn tracker_priority(&self) -> Option<Priority> {
        self.priority.as_deref().map(Priority::from_label)
    }
}

/// A hint that an already-tracked item changed state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDirective {
    #[serde(default, deserialize_with = "null_default")]
    pub search_keywords: Vec<String>,

    #[serde(default, deserialize_with = "null_default")]
    pub new_status: String,

    #[serde(default, deserialize_with = "null_default")]
    pub reason: String,
}

impl UpdateDirective {
    /// Keywords with surrounding whitespace removed and blanks dropped
    pub fn keywords(&self) -> Vec<&str> {
        self.search_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Target status, if the label is recognized
    pub fn target_status(&self) -> Option<TaskStatus> {
        TaskStatus::parse(&self.new_status)
    }
}

/// The structured analysis returned by the AI model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Full transcription (audio submissions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,

    /// Visible or spoken text (screen and video submissions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,

    #[serde(default, deserialize_with = "null_default")]
    pub tasks: Vec<ExtractedTask>,

    #[serde(default, deserialize_with = "null_default")]
    pub task_updates: Vec<UpdateDirective>,

    #[serde(default, deserialize_with = "null_default")]
    pub decisions: Vec<String>,

    #[serde(default, deserialize_with = "null_default")]
    pub participants: Vec<String>,

    #[serde(
        default,
        rename = "interface_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub interface_type: Option<String>,

    #[serde(
        default,
        rename = "project_context",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

impl Analysis {
    /// Degraded analysis used when the model's reply holds no usable JSON.
    ///
    /// Keeps the raw reply so nothing the model said is lost.
    pub fn degraded(raw_text: &str, kind: MediaKind) -> Self {
        match kind {
            MediaKind::Audio => Self {
                transcription: Some(raw_text.to_string()),
                ..Default::default()
            },
            MediaKind::Screen | MediaKind::Video => Self {
                extracted_text: Some(raw_text.to_string()),
                interface_type: Some("unknown".to_string()),
                project_context: Some("Could not determine context".to_string()),
                confidence: Some("low".to_string()),
                ..Default::default()
            },
        }
    }

    /// The transcription or extracted text, whichever the model filled in
    pub fn text(&self) -> Option<&str> {
        self.transcription
            .as_deref()
            .or(self.extracted_text.as_deref())
    }
}
