//! taskmirror - meeting-to-tracker task reconciliation
//!
//! Accepts meeting audio, screenshots and short screen recordings, has a
//! generative-AI model (Gemini) extract action items, and mirrors them into
//! an issue tracker (Jira Cloud): new items become issues, status changes
//! move existing issues through their workflow.
//!
//! # Architecture
//!
//! Nothing is persisted locally. Every submission is one request-scoped run:
//! - The model's free-form reply is parsed into a structured analysis
//! - Update directives search for existing issues and transition them
//! - New tasks are created, then transitioned if already in progress or done
//! - Every item yields an explicit outcome, so partial failures are visible
//!
//! # Modules
//!
//! - `adapters`: External system integrations (Gemini, Jira)
//! - `core`: Parsing, reconciliation and the submission pipeline
//! - `domain`: Data structures (Analysis, TrackedIssue, ItemOutcome)
//! - `server`: HTTP API
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve the HTTP API
//! taskmirror serve --address 0.0.0.0:3000
//!
//! # Process a recording once
//! taskmirror process standup.webm --kind audio --session weekly-sync
//!
//! # Inspect the tracker
//! taskmirror tasks --limit 20
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;

// Re-export main types at crate root for convenience
pub use adapters::{Analyzer, GeminiClient, JiraClient, Tracker};
pub use config::Config;
pub use core::{Processor, Reconciler, SubmissionError, SubmissionReport, SubmissionRequest};
pub use domain::{Analysis, ItemOutcome, MediaKind, ReconciliationResult, TaskStatus};
