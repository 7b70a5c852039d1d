//! Size limits for submitted media.
//!
//! Two ceilings apply to every submission:
//! - Request body size (enforced by the HTTP layer)
//! - Decoded media size (enforced before anything is sent to the model)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size limits for one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionLimits {
    /// Maximum decoded media size in bytes (default: 20MB)
    #[serde(default = "default_max_media_bytes")]
    pub max_media_bytes: u64,

    /// Maximum HTTP request body size in bytes (default: 30MB)
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

fn default_max_media_bytes() -> u64 {
    20 * 1024 * 1024
} // 20MB
fn default_max_request_bytes() -> usize {
    30 * 1024 * 1024
} // 30MB, base64 inflates by a third

impl Default for SubmissionLimits {
    fn default() -> Self {
        Self {
            max_media_bytes: default_max_media_bytes(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

impl SubmissionLimits {
    /// Validate decoded media against the size ceiling
    pub fn validate_media(&self, media: &[u8]) -> Result<(), LimitViolation> {
        let size = media.len() as u64;
        if size == 0 {
            return Err(LimitViolation::EmptyMedia);
        }
        if size > self.max_media_bytes {
            return Err(LimitViolation::MediaTooLarge {
                actual: size,
                limit: self.max_media_bytes,
            });
        }
        Ok(())
    }
}

/// Limit violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitViolation {
    #[error("Media is empty")]
    EmptyMedia,

    #[error("Media too large: {actual} > {limit} bytes")]
    MediaTooLarge { actual: u64, limit: u64 },
}
