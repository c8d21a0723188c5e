//! Routes for recurring maintenance schedules.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::schedule::Schedule;
use services::services::schedule::EditFrequencyRequest;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn list_schedules(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Schedule>>>, ApiError> {
    let schedules = state.schedules().list().await?;
    Ok(ResponseJson(ApiResponse::success(schedules)))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Schedule>>, ApiError> {
    let schedule = state.schedules().get(schedule_id).await?;
    Ok(ResponseJson(ApiResponse::success(schedule)))
}

/// Change a schedule's frequency; the next due date is recomputed from the
/// last completion (or creation) under the new frequency.
pub async fn edit_frequency(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
    axum::Json(payload): axum::Json<EditFrequencyRequest>,
) -> Result<ResponseJson<ApiResponse<Schedule>>, ApiError> {
    let schedule = state.schedules().edit_frequency(schedule_id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(schedule)))
}

/// Pause or resume task generation for a schedule.
pub async fn toggle_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Schedule>>, ApiError> {
    let schedule = state.schedules().toggle_active(schedule_id).await?;
    Ok(ResponseJson(ApiResponse::success(schedule)))
}

/// Soft removal: deactivates the schedule, existing tasks are untouched.
pub async fn remove_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Schedule>>, ApiError> {
    let schedule = state.schedules().remove(schedule_id).await?;
    Ok(ResponseJson(ApiResponse::success(schedule)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/schedules",
        Router::new()
            .route("/", get(list_schedules))
            .route("/{schedule_id}", get(get_schedule).delete(remove_schedule))
            .route("/{schedule_id}/frequency", put(edit_frequency))
            .route("/{schedule_id}/toggle", post(toggle_schedule)),
    )
}
