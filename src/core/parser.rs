//! Parsing of free-form model replies.
//!
//! The model is asked for JSON but usually wraps it in prose or a code fence.
//! We take everything from the first `{` to the last `}` and decode that.
//! This is a greedy span, not a balanced scan: a reply holding two separate
//! objects yields a span that fails to decode and falls back.

use tracing::{debug, warn};

use crate::domain::{Analysis, MediaKind};

/// A parsed reply plus whether it fell back to raw text
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnalysis {
    pub analysis: Analysis,
    pub degraded: bool,
}

/// Leftmost `{` through rightmost `}`, if they appear in that order
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Decode the embedded object, or degrade to a text-only analysis
pub fn parse_analysis(text: &str, kind: MediaKind) -> ParsedAnalysis {
    let Some(span) = extract_json_span(text) else {
        warn!("No JSON object in model reply, using raw text");
        return ParsedAnalysis {
            analysis: Analysis::degraded(text, kind),
            degraded: true,
        };
    };

    match serde_json::from_str::<Analysis>(span) {
        Ok(analysis) => {
            debug!(
                tasks = analysis.tasks.len(),
                updates = analysis.task_updates.len(),
                "Parsed model reply"
            );
            ParsedAnalysis {
                analysis,
                degraded: false,
            }
        }
        Err(e) => {
            warn!(error = %e, "Model reply JSON did not decode, using raw text");
            ParsedAnalysis {
                analysis: Analysis::degraded(text, kind),
                degraded: true,
            }
        }
    }
}
