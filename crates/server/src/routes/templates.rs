//! Routes for maintenance templates and template application.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    schedule::Schedule,
    task::Task,
    template::{CreateTemplate, Template},
};
use serde::{Deserialize, Serialize};
use services::services::schedule::ApplyTemplateRequest;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ApplyTemplateResponse {
    pub schedule: Schedule,
    pub task: Task,
}

pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Template>>>, ApiError> {
    let templates = Template::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(templates)))
}

pub async fn create_template(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateTemplate>,
) -> Result<ResponseJson<ApiResponse<Template>>, ApiError> {
    let template = Template::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(template)))
}

/// Apply a template to an asset (or the whole home), creating a schedule
/// and its first task. Conflicts with an existing active schedule map to
/// 409.
pub async fn apply_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    axum::Json(payload): axum::Json<ApplyTemplateRequest>,
) -> Result<ResponseJson<ApiResponse<ApplyTemplateResponse>>, ApiError> {
    let (schedule, task) = state.schedules().apply_template(template_id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(ApplyTemplateResponse {
        schedule,
        task,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/templates",
        Router::new()
            .route("/", get(list_templates).post(create_template))
            .route("/{template_id}/apply", post(apply_template)),
    )
}
