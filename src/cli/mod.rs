//! Command-line interface for taskmirror.
//!
//! Provides commands for running the HTTP server, processing a media file
//! once, and inspecting the configured tracker.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{redact, Config};
use crate::core::reconcile::recent_issues_jql;
use crate::core::{Processor, SubmissionRequest};
use crate::domain::{guess_mime, MediaKind};
use crate::server;

/// taskmirror - mirror meeting action items into the issue tracker
#[derive(Parser, Debug)]
#[command(name = "taskmirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .taskmirror/config.yaml, searched upward)
    #[arg(long, global = true, env = "TASKMIRROR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind to (overrides config)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Analyze one media file and mirror its tasks into the tracker
    Process {
        /// Audio, image or video file
        file: PathBuf,

        /// What the file contains
        #[arg(short, long, value_enum)]
        kind: KindArg,

        /// Meeting or session id recorded in created issues
        #[arg(short, long)]
        session: Option<String>,

        /// MIME type (guessed from the extension if not given)
        #[arg(long)]
        mime: Option<String>,
    },

    /// List tracker projects visible to the credentials
    Projects,

    /// List recent issues of the resolved project
    Tasks {
        /// Maximum number of issues to show
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },

    /// List status names of the resolved project
    Statuses,

    /// Create an issue by hand
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Check credentials against both services
    Check,

    /// Show resolved configuration
    Config,
}

/// Media kind for the `process` command
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
    Audio,
    Screen,
    Video,
}

impl From<KindArg> for MediaKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Audio => MediaKind::Audio,
            KindArg::Screen => MediaKind::Screen,
            KindArg::Video => MediaKind::Video,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match self.command {
            Commands::Serve { address } => serve(&config, address).await,
            Commands::Process {
                file,
                kind,
                session,
                mime,
            } => process_file(&config, &file, kind.into(), session, mime).await,
            Commands::Projects => list_projects(&config).await,
            Commands::Tasks { limit } => list_tasks(&config, limit).await,
            Commands::Statuses => list_statuses(&config).await,
            Commands::Create { title, description } => {
                create_issue(&config, &title, description.as_deref()).await
            }
            Commands::Check => check(&config).await,
            Commands::Config => show_config(&config),
        }
    }
}

async fn serve(config: &Config, address: Option<String>) -> Result<()> {
    let processor = Arc::new(Processor::from_config(config)?);
    let address = address.unwrap_or_else(|| config.bind.clone());
    server::serve(processor, &address).await
}

async fn process_file(
    config: &Config,
    file: &std::path::Path,
    kind: MediaKind,
    session: Option<String>,
    mime: Option<String>,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read media file: {}", file.display()))?;

    let request = SubmissionRequest {
        data: Some(STANDARD.encode(&bytes)),
        audio_url: None,
        mime_type: Some(mime.unwrap_or_else(|| guess_mime(file, kind))),
        session_id: session,
    };

    eprintln!("Processing {} ({} bytes) as {}", file.display(), bytes.len(), kind);

    let processor = Processor::from_config(config)?;
    let report = processor.process(kind, request).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    eprintln!("\n{}", report.message);
    Ok(())
}

async fn list_projects(config: &Config) -> Result<()> {
    let tracker = Processor::from_config(config)?.tracker()?;
    let projects = tracker.list_projects().await?;

    if projects.is_empty() {
        println!("No accessible projects");
        return Ok(());
    }

    println!("{:<12} {:<40} {:<15}", "KEY", "NAME", "TYPE");
    println!("{}", "-".repeat(70));
    for project in &projects {
        println!(
            "{:<12} {:<40} {:<15}",
            project.key,
            truncate(&project.name, 40),
            project.project_type_key.as_deref().unwrap_or("-")
        );
    }
    println!("\nTotal: {} projects", projects.len());

    Ok(())
}

async fn list_tasks(config: &Config, limit: u32) -> Result<()> {
    let processor = Processor::from_config(config)?;
    let tracker = processor.tracker()?;
    let project = processor.reconciler()?.resolve_project().await?;

    let issues = tracker
        .search_issues(&recent_issues_jql(&project.key), limit)
        .await?;

    if issues.is_empty() {
        println!("No issues in {}", project.key);
        return Ok(());
    }

    println!("{:<12} {:<18} {:<50}", "KEY", "STATUS", "SUMMARY");
    println!("{}", "-".repeat(80));
    for issue in &issues {
        println!(
            "{:<12} {:<18} {:<50}",
            issue.key,
            truncate(&issue.status, 18),
            truncate(&issue.summary, 50)
        );
    }
    println!("\nTotal: {} issues in {}", issues.len(), project.key);

    Ok(())
}

async fn list_statuses(config: &Config) -> Result<()> {
    let processor = Processor::from_config(config)?;
    let tracker = processor.tracker()?;
    let project = processor.reconciler()?.resolve_project().await?;

    let statuses = tracker.project_statuses(&project.key).await?;
    println!("Statuses in {}:", project.key);
    for status in statuses {
        println!("  {}", status);
    }

    Ok(())
}

async fn create_issue(config: &Config, title: &str, description: Option<&str>) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        anyhow::bail!("Title must not be empty");
    }

    let created = Processor::from_config(config)?
        .reconciler()?
        .create_plain_issue(title, description)
        .await?;

    println!("Created {} in {}: {}", created.key, created.project, created.title);
    Ok(())
}

/// Verify that both services accept the configured credentials
async fn check(config: &Config) -> Result<()> {
    let processor = Processor::from_config(config)?;

    match &config.ai.api_key {
        Some(_) => println!("Gemini:  key configured (model {})", config.ai.model),
        None => println!("Gemini:  GEMINI_API_KEY not set"),
    }

    match processor.tracker() {
        Ok(tracker) => match tracker.current_user().await {
            Ok(user) => println!("Jira:    authenticated as {}", user.display_name),
            Err(e) => println!("Jira:    {}", e),
        },
        Err(e) => println!("Jira:    {}", e),
    }

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config(config: &Config) -> Result<()> {
    println!("taskmirror configuration");
    println!("{}", "-".repeat(40));
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("AI:");
    println!("  API key:   {}", redact(config.ai.api_key.as_deref()));
    println!("  Model:     {}", config.ai.model);
    println!("  Endpoint:  {}", config.ai.base_url);
    println!("  Language:  {}", config.ai.response_language);
    println!();
    println!("Tracker:");
    println!(
        "  Base URL:  {}",
        config.tracker.base_url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  Email:     {}",
        config.tracker.email.as_deref().unwrap_or("(not set)")
    );
    println!("  API token: {}", redact(config.tracker.api_token.as_deref()));
    println!();
    println!("Reconciliation:");
    println!("  Project key:   {}", config.reconcile.project_key);
    println!(
        "  Project hint:  {}",
        config.reconcile.project_hint.as_deref().unwrap_or("(none)")
    );
    println!("  Search limit:  {}", config.reconcile.search_max_results);
    println!("  Match policy:  {:?}", config.reconcile.match_policy);
    if let Some(cap) = config.reconcile.max_tasks_per_submission {
        println!("  Task cap:      {}", cap);
    }
    println!();
    println!("Limits:");
    println!("  Max media size:   {} bytes", config.limits.max_media_bytes);
    println!("  Max request size: {} bytes", config.limits.max_request_bytes);
    println!();
    println!("Server bind: {}", config.bind);

    Ok(())
}

/// Truncate for table output, on a char boundary
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
