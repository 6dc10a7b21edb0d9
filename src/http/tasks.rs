use crate::application::commands::{
    change_task_status_impl, create_task_impl, delete_task_impl, get_task_impl, list_tasks_impl,
    list_times_impl, record_effort_impl, task_report_impl, tasks_by_day_impl, update_task_impl,
    ScheduledTime,
};
use crate::application::reports::TaskReport;
use crate::domain::models::Task;
use crate::http::SharedState;
use crate::http::auth::authenticated_user;
use crate::http::error::ApiError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffortRequest {
    pub time: u64,
}

pub async fn list_tasks(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Task>>, ApiError> {
    let user = authenticated_user(&state, &headers)?;
    Ok(Json(list_tasks_impl(&state, &user.id).await?))
}

pub async fn create_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let user = authenticated_user(&state, &headers)?;
    let task = create_task_impl(&state, &user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let user = authenticated_user(&state, &headers)?;
    Ok(Json(get_task_impl(&state, &user.id, &task_id).await?))
}

pub async fn list_times(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ScheduledTime>>, ApiError> {
    let user = authenticated_user(&state, &headers)?;
    Ok(Json(list_times_impl(&state, &user.id).await?))
}

pub async fn tasks_by_day(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(day): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let user = authenticated_user(&state, &headers)?;
    Ok(Json(tasks_by_day_impl(&state, &user.id, &day).await?))
}

pub async fn report(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<TaskReport>, ApiError> {
    let user = authenticated_user(&state, &headers)?;
    Ok(Json(task_report_impl(&state, &user.id).await?))
}

pub async fn update_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Task>, ApiError> {
    let user = authenticated_user(&state, &headers)?;
    Ok(Json(update_task_impl(&state, &user.id, &task_id, patch).await?))
}

pub async fn change_status(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Task>, ApiError> {
    let user = authenticated_user(&state, &headers)?;
    let task = change_task_status_impl(&state, &user.id, &task_id, &request.status).await?;
    Ok(Json(task))
}

pub async fn record_effort(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
    Json(request): Json<EffortRequest>,
) -> Result<Json<Task>, ApiError> {
    let user = authenticated_user(&state, &headers)?;
    let task = record_effort_impl(&state, &user.id, &task_id, request.time).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = authenticated_user(&state, &headers)?;
    delete_task_impl(&state, &user.id, &task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
