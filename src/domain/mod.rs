//! Domain types for taskmirror.
//!
//! This module contains the core data structures:
//! - Vocabulary: closed status/priority enums and their synonym tables
//! - Analysis: what the AI model extracted (tasks, update directives)
//! - Issue: tracker-owned entities (projects, issues, transitions)
//! - Outcome: per-item results of a reconciliation run

pub mod analysis;
pub mod issue;
pub mod media;
pub mod outcome;
pub mod vocabulary;

// Re-export commonly used types
pub use analysis::{Analysis, ExtractedTask, UpdateDirective};
pub use issue::{
    find_transition, CreatedIssueRef, IssueDraft, IssueType, Project, TrackedIssue, TrackerUser,
    Transition,
};
pub use media::{guess_mime, MediaKind, SessionContext};
pub use outcome::{CreatedIssue, ItemKind, ItemOutcome, ItemRef, ReconciliationResult, UpdatedIssue};
pub use vocabulary::{Priority, TaskStatus};
