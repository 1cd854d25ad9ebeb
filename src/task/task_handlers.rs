use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, Result},
    middleware::AuthUser,
    state::AppState,
};
use super::{
    task_dto::{CreateTaskRequest, UpdateTaskRequest, UpdateTaskStatusRequest},
    task_models::{Task, TaskStats},
    task_repository::TaskFilters,
    task_service::parse_status,
};

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    status: Option<String>,
    priority: Option<String>,
}

impl TaskQuery {
    fn into_filters(self) -> Result<TaskFilters> {
        let status = self
            .status
            .filter(|s| !s.is_empty())
            .map(|s| parse_status(&s))
            .transpose()?;
        let priority = self
            .priority
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.parse()
                    .map_err(|_| AppError::BadRequest("Invalid priority".to_string()))
            })
            .transpose()?;

        Ok(TaskFilters { status, priority })
    }
}

/// Get all tasks for the authenticated user
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(
        ("status" = Option<String>, Query, description = "Filter by status (pending, in_progress, completed)"),
        ("priority" = Option<String>, Query, description = "Filter by priority (low, medium, high)")
    ),
    responses(
        (status = 200, description = "List of tasks", body = Vec<Task>),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn get_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>> {
    let tasks = state.task_service.list_tasks(user_id, query.into_filters()?).await?;
    Ok(Json(tasks))
}

/// Count the authenticated user's tasks by status
#[utoipa::path(
    get,
    path = "/api/tasks/stats",
    responses(
        (status = 200, description = "Task counts", body = TaskStats),
        (status = 401, description = "Unauthorized")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn get_task_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TaskStats>> {
    let stats = state.task_service.get_stats(user_id).await?;
    Ok(Json(stats))
}

/// Get a single task by ID
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task found", body = Task),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>> {
    let task = state.task_service.get_task(user_id, task_id).await?;
    Ok(Json(task))
}

/// Create a new task
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let task = state.task_service.create_task(user_id, payload).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Replace a task's editable fields
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<Task>> {
    payload.validate()?;

    let task = state.task_service.update_task(user_id, task_id, payload).await?;

    Ok(Json(task))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.task_service.delete_task(user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change only the status of a task
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}/status",
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = UpdateTaskStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Task),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn update_task_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskStatusRequest>,
) -> Result<Json<Task>> {
    let task = state.task_service.update_status(user_id, task_id, payload).await?;
    Ok(Json(task))
}
