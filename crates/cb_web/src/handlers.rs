use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use cb_core::{Article, Error, JobRecord, NewsletterEntry};
use cb_pipeline::TriggerReport;

use crate::AppState;

/// Error surface of the HTTP API: a status code plus a JSON error body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::NoArticlesForWeek { .. } => StatusCode::NOT_FOUND,
            Error::InvalidWeek(_) => StatusCode::BAD_REQUEST,
            Error::DuplicateWeek { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub job_id: String,
    pub report: TriggerReport,
}

/// Run one trigger evaluation and record it as a persisted job, so the
/// outcome can be fetched again after the response is gone.
pub async fn trigger(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let job_id = Uuid::new_v4().to_string();
    let pending = JobRecord::pending(job_id.clone(), state.clock.now_utc());
    state.jobs.put_job(&pending).await?;
    info!("🔔 Trigger received, job {}", job_id);

    let report = state.scheduler.tick().await;

    let detail = serde_json::to_value(&report).map_err(Error::from)?;
    let done = pending.complete(detail, state.clock.now_utc());
    state.jobs.put_job(&done).await?;

    Ok(Json(TriggerResponse { job_id, report }))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    match state.jobs.get_job(&id).await? {
        Some(job) => Ok(Json(job)),
        None => Err(ApiError::not_found(format!("No job with id {}", id))),
    }
}

#[derive(Debug, Deserialize)]
pub struct ArticlesQuery {
    pub date: Option<NaiveDate>,
    pub source: Option<String>,
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticlesQuery>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let date = query
        .date
        .unwrap_or_else(|| state.clock.now_utc().date_naive());
    let articles = state
        .store
        .get_by_fetch_date(date, query.source.as_deref())
        .await?;
    Ok(Json(articles))
}

pub async fn get_newsletter(
    State(state): State<Arc<AppState>>,
    Path((year, week)): Path<(i32, u32)>,
) -> Result<Json<NewsletterEntry>, ApiError> {
    match state.archive.find_newsletter(week, year).await? {
        Some(entry) => Ok(Json(entry)),
        None => Err(ApiError::not_found(format!(
            "No newsletter archived for week {}/{}",
            week, year
        ))),
    }
}
