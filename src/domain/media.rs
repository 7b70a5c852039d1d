//! Captured media kinds and session context.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// The medium a submission was captured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Meeting audio recording
    Audio,

    /// Single screenshot
    Screen,

    /// Short video clip
    Video,
}

impl MediaKind {
    /// MIME type assumed when the submitter does not send one
    pub fn default_mime(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/webm",
            MediaKind::Screen => "image/png",
            MediaKind::Video => "video/webm",
        }
    }

    /// Provenance label narrated in created issues
    pub fn origin_label(self) -> &'static str {
        match self {
            MediaKind::Audio => "Meeting recording",
            MediaKind::Screen => "Screen capture analysis",
            MediaKind::Video => "Video analysis",
        }
    }

    /// Noun used in user-facing summary messages
    pub fn noun(self) -> &'static str {
        match self {
            MediaKind::Audio => "Meeting",
            MediaKind::Screen => "Screenshot",
            MediaKind::Video => "Video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Audio => "audio",
            MediaKind::Screen => "screen",
            MediaKind::Video => "video",
        };
        f.write_str(name)
    }
}

/// Guess a MIME type from a file extension, falling back to the kind's default
pub fn guess_mime(path: &Path, kind: MediaKind) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mime = match (ext.as_str(), kind) {
        ("mp3", _) => "audio/mpeg",
        ("wav", _) => "audio/wav",
        ("m4a", _) => "audio/mp4",
        ("ogg", _) => "audio/ogg",
        ("flac", _) => "audio/flac",
        ("png", _) => "image/png",
        ("jpg" | "jpeg", _) => "image/jpeg",
        ("webp", _) => "image/webp",
        ("mp4", _) => "video/mp4",
        ("mov", _) => "video/quicktime",
        ("webm", MediaKind::Video) => "video/webm",
        ("webm", _) => "audio/webm",
        _ => kind.default_mime(),
    };

    mime.to_string()
}

/// Per-submission context threaded through reconciliation.
///
/// The session id is only used for traceability text inside created issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub kind: MediaKind,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            session_id: session_id.into(),
            kind,
        }
    }
}
