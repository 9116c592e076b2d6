//! HTTP request surface: claim, create, report, lookup.

use crate::dispatcher::Dispatcher;
use crate::error::{ApiError, ApiResult, DispatchError};
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use common::api::{GET_JOB_PATH, JOB_PATH, JOB_RESULT_PATH, TASK_PATH};
use common::{Job, JobId, JobRecord, NewJob, ResultInfo};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

/// Only the id of the reported job matters; the rest of the echoed job is ignored.
#[derive(Debug, Deserialize)]
struct ReportedJob {
    id: JobId,
}

/// Run a dispatcher call off the async runtime.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, DispatchError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("dispatcher task failed: {}", e)))?;
    Ok(result?)
}

/// GET get_job: claim the oldest new job, or `{}` when there is none.
async fn claim_job(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<serde_json::Value>> {
    let host = peer.ip().to_string();
    let dispatcher = state.dispatcher.clone();
    let job = blocking(move || dispatcher.claim(&host)).await?;

    let body = match job {
        Some(job) => serde_json::to_value(job).map_err(|e| ApiError::Internal(e.to_string()))?,
        None => serde_json::json!({}),
    };
    Ok(Json(body))
}

/// POST task: queue a job and echo the request body.
async fn create_task(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let new_job: NewJob = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid task body: {}", e)))?;
    let host = peer.ip().to_string();
    let dispatcher = state.dispatcher.clone();
    blocking(move || dispatcher.create(&new_job.job_type, new_job.job_arg.as_deref(), &host)).await?;

    Ok((StatusCode::CREATED, [(header::CONTENT_TYPE, "application/json")], body))
}

/// PUT job_result: the body is `[job, result]`.
async fn report_result(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Job>> {
    let (job, outcome): (ReportedJob, ResultInfo) = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid job result body: {}", e)))?;
    let dispatcher = state.dispatcher.clone();
    let job = blocking(move || dispatcher.report(job.id, &outcome)).await?;
    Ok(Json(job))
}

async fn get_job(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<JobRecord>> {
    let dispatcher = state.dispatcher.clone();
    let record = blocking(move || dispatcher.get(JobId(id))).await?;
    Ok(Json(record))
}

pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route(GET_JOB_PATH, get(claim_job))
        .route(TASK_PATH, post(create_task))
        .route(JOB_RESULT_PATH, put(report_result))
        .route(&format!("{}/{{id}}", JOB_PATH), get(get_job))
        .with_state(AppState { dispatcher })
}
