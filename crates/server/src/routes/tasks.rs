//! Routes for maintenance tasks: CRUD plus the explicit state transitions
//! (start, complete, reopen, cancel).

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::task::{CreateTask, Task, TaskDetails, TaskWithOverdue};
use services::services::task::{CompleteTaskRequest, CompletionOutcome};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn list_tasks(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskWithOverdue>>>, ApiError> {
    let tasks = state.tasks().list().await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<TaskDetails>>, ApiError> {
    let task = state.tasks().get(task_id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn create_task(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = state.tasks().create(payload).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn start_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = state.tasks().start(task_id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

/// Complete a task. For scheduled tasks the response carries the generated
/// next occurrence (absent when the schedule is paused).
pub async fn complete_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CompleteTaskRequest>,
) -> Result<ResponseJson<ApiResponse<CompletionOutcome>>, ApiError> {
    let outcome = state.tasks().complete(task_id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

pub async fn reopen_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = state.tasks().reopen(task_id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

/// "Delete" is a cancellation: the task stays on record with its status
/// set to cancelled.
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = state.tasks().cancel(task_id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/tasks",
        Router::new()
            .route("/", get(list_tasks).post(create_task))
            .route("/{task_id}", get(get_task).delete(cancel_task))
            .route("/{task_id}/start", post(start_task))
            .route("/{task_id}/complete", post(complete_task))
            .route("/{task_id}/reopen", post(reopen_task)),
    )
}
