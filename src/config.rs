//! Configuration for taskmirror.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (GEMINI_API_KEY, JIRA_BASE_URL, JIRA_EMAIL, ...)
//! 2. Config file (.taskmirror/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - An explicit path (`--config` / TASKMIRROR_CONFIG) wins
//! - Otherwise searches current directory and parents for .taskmirror/config.yaml
//! - Finally falls back to the user config dir (~/.config/taskmirror/config.yaml)
//!
//! The resolved [`Config`] is built once at startup and handed to the client
//! constructors. Nothing reads the environment while handling a request.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::core::limits::SubmissionLimits;
use crate::core::reconcile::{MatchPolicy, ReconcileSettings};

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub tracker: TrackerSection,
    #[serde(default)]
    pub reconcile: ReconcileSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Language the model should write task text in
    pub response_language: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackerSection {
    pub base_url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcileSection {
    pub project_key: Option<String>,
    pub project_hint: Option<String>,
    pub search_max_results: Option<u32>,
    pub match_policy: Option<MatchPolicy>,
    pub max_tasks_per_submission: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitsSection {
    pub max_media_bytes: Option<u64>,
    pub max_request_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub bind: Option<String>,
}

/// Resolved AI settings
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub response_language: String,
    pub request_timeout_secs: Option<u64>,
}

/// Resolved tracker settings
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub base_url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl TrackerConfig {
    /// Base URL, email and token, if all three are set
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.base_url.as_deref()?,
            self.email.as_deref()?,
            self.api_token.as_deref()?,
        ))
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub ai: AiConfig,
    pub tracker: TrackerConfig,
    pub reconcile: ReconcileSettings,
    pub limits: SubmissionLimits,
    /// Address the HTTP server binds to
    pub bind: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_RESPONSE_LANGUAGE: &str = "English";

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".taskmirror").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let user_config = dirs::config_dir()?.join("taskmirror").join("config.yaml");
    user_config.exists().then_some(user_config)
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Trim a value, treating blank strings as absent
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from all sources
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config_file = match explicit_path {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };

        let file = match &config_file {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        let mut config = Self::resolve(file, |name| std::env::var(name).ok());
        config.config_file = config_file;
        Ok(config)
    }

    /// Merge a parsed file with environment lookups and defaults
    pub fn resolve(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |var: &str, from_file: Option<String>| clean(env(var)).or(clean(from_file));

        let ai = AiConfig {
            api_key: pick("GEMINI_API_KEY", file.ai.api_key),
            model: pick("GEMINI_MODEL", file.ai.model).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: clean(file.ai.base_url).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            response_language: clean(file.ai.response_language)
                .unwrap_or_else(|| DEFAULT_RESPONSE_LANGUAGE.to_string()),
            request_timeout_secs: file.ai.request_timeout_secs,
        };

        let tracker = TrackerConfig {
            base_url: pick("JIRA_BASE_URL", file.tracker.base_url),
            email: pick("JIRA_EMAIL", file.tracker.email),
            api_token: pick("JIRA_API_TOKEN", file.tracker.api_token),
            request_timeout_secs: file.tracker.request_timeout_secs,
        };

        let defaults = ReconcileSettings::default();
        let reconcile = ReconcileSettings {
            project_key: pick("JIRA_PROJECT_KEY", file.reconcile.project_key)
                .unwrap_or(defaults.project_key),
            project_hint: match file.reconcile.project_hint {
                Some(hint) => clean(Some(hint)),
                None => defaults.project_hint,
            },
            search_max_results: file
                .reconcile
                .search_max_results
                .unwrap_or(defaults.search_max_results),
            match_policy: file.reconcile.match_policy.unwrap_or(defaults.match_policy),
            max_tasks_per_submission: file.reconcile.max_tasks_per_submission,
        };

        let default_limits = SubmissionLimits::default();
        let limits = SubmissionLimits {
            max_media_bytes: file
                .limits
                .max_media_bytes
                .unwrap_or(default_limits.max_media_bytes),
            max_request_bytes: file
                .limits
                .max_request_bytes
                .unwrap_or(default_limits.max_request_bytes),
        };

        Self {
            ai,
            tracker,
            reconcile,
            limits,
            bind: pick("TASKMIRROR_BIND", file.server.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            config_file: None,
        }
    }
}

/// Show the first and last few characters of a secret
pub fn redact(secret: Option<&str>) -> String {
    match secret {
        None => "(not set)".to_string(),
        Some(s) if s.chars().count() <= 8 => "****".to_string(),
        Some(s) => {
            let chars: Vec<char> = s.chars().collect();
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }
}
