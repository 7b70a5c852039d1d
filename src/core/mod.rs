//! Core processing logic.
//!
//! This module contains:
//! - Limits: media size ceilings
//! - Prompts: per-medium extraction prompts
//! - Parser: model reply to structured analysis
//! - Reconcile: mirroring an analysis into the tracker
//! - Processor: the end-to-end submission pipeline

pub mod limits;
pub mod parser;
pub mod processor;
pub mod prompts;
pub mod reconcile;

// Re-export commonly used types
pub use limits::{LimitViolation, SubmissionLimits};
pub use parser::{extract_json_span, parse_analysis, ParsedAnalysis};
pub use processor::{Processor, SubmissionError, SubmissionReport, SubmissionRequest};
pub use prompts::extraction_prompt;
pub use reconcile::{MatchPolicy, ReconcileError, ReconcileSettings, Reconciler};
