//! HTTP API.
//!
//! Routes:
//! - `POST /api/transcribe`, `/api/analyze-screen`, `/api/analyze-video`
//! - `GET /api/tracker/projects`, `GET|POST /api/tracker/tasks`,
//!   `GET /api/tracker/statuses`
//! - `GET /health`
//!
//! Every handler is a thin shell over [`Processor`]; no state is kept
//! between requests.

mod error;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::core::reconcile::recent_issues_jql;
use crate::core::{Processor, SubmissionReport, SubmissionRequest};
use crate::domain::MediaKind;

pub use error::ApiError;

/// Default page size for the task list
pub const DEFAULT_TASK_LIMIT: u32 = 50;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<Processor>,
}

/// Build the router
pub fn router(processor: Arc<Processor>) -> Router {
    let body_limit = processor.limits().max_request_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/api/transcribe", post(transcribe))
        .route("/api/analyze-screen", post(analyze_screen))
        .route("/api/analyze-video", post(analyze_video))
        .route("/api/tracker/projects", get(list_projects))
        .route("/api/tracker/tasks", get(list_tasks).post(create_task))
        .route("/api/tracker/statuses", get(list_statuses))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(AppState { processor })
}

/// Bind and serve until the process exits
pub async fn serve(processor: Arc<Processor>, address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!(%address, "taskmirror listening");
    axum::serve(listener, router(processor))
        .await
        .context("HTTP server error")
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn submit(
    state: AppState,
    kind: MediaKind,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<Json<SubmissionReport>, ApiError> {
    let Json(request) = payload?;
    let report = state.processor.process(kind, request).await?;
    Ok(Json(report))
}

pub async fn transcribe(
    State(state): State<AppState>,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<Json<SubmissionReport>, ApiError> {
    submit(state, MediaKind::Audio, payload).await
}

pub async fn analyze_screen(
    State(state): State<AppState>,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<Json<SubmissionReport>, ApiError> {
    submit(state, MediaKind::Screen, payload).await
}

pub async fn analyze_video(
    State(state): State<AppState>,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<Json<SubmissionReport>, ApiError> {
    submit(state, MediaKind::Video, payload).await
}

/// Validate credentials, then list visible projects
#[instrument(skip_all)]
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let tracker = state.processor.tracker()?;

    let user = tracker.current_user().await?;
    let projects = tracker.list_projects().await?;
    info!(user = %user.display_name, count = projects.len(), "Listed projects");

    Ok(Json(json!({
        "success": true,
        "user": user,
        "projects": projects,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub limit: Option<u32>,
}

/// Most recent issues of the resolved project
#[instrument(skip_all)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Value>, ApiError> {
    let tracker = state.processor.tracker()?;
    let project = state.processor.reconciler()?.resolve_project().await?;

    let limit = query.limit.unwrap_or(DEFAULT_TASK_LIMIT);
    let issues = tracker
        .search_issues(&recent_issues_jql(&project.key), limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "project": project.key,
        "tasks": issues,
    })))
}

#[derive(Debug, Deserialize)]
pub struct NewTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Create one issue by hand
#[instrument(skip_all)]
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<NewTaskRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }

    let created = state
        .processor
        .reconciler()?
        .create_plain_issue(title, request.description.as_deref())
        .await?;

    Ok(Json(json!({ "success": true, "task": created })))
}

/// Status names used by the resolved project
#[instrument(skip_all)]
pub async fn list_statuses(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let tracker = state.processor.tracker()?;
    let project = state.processor.reconciler()?.resolve_project().await?;
    let statuses = tracker.project_statuses(&project.key).await?;

    Ok(Json(json!({
        "success": true,
        "project": project.key,
        "statuses": statuses,
    })))
}
