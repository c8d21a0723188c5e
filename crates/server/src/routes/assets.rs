//! Routes for home assets.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::asset::{Asset, CreateAsset};
use services::services::schedule::ScheduleError;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn list_assets(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Asset>>>, ApiError> {
    let assets = Asset::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(assets)))
}

pub async fn get_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Asset>>, ApiError> {
    let asset = Asset::find_by_id(&state.db().pool, asset_id)
        .await?
        .ok_or(ScheduleError::NotFound("asset"))?;
    Ok(ResponseJson(ApiResponse::success(asset)))
}

pub async fn create_asset(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateAsset>,
) -> Result<ResponseJson<ApiResponse<Asset>>, ApiError> {
    let asset = Asset::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(asset)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/assets",
        Router::new()
            .route("/", get(list_assets).post(create_asset))
            .route("/{asset_id}", get(get_asset)),
    )
}
