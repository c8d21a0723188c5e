use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{schedule::ScheduleError, task::TaskError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn schedule_status(err: &ScheduleError) -> StatusCode {
    match err {
        ScheduleError::InvalidFrequency(_) => StatusCode::BAD_REQUEST,
        ScheduleError::DuplicateSchedule => StatusCode::CONFLICT,
        ScheduleError::NotFound(_) => StatusCode::NOT_FOUND,
        ScheduleError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Schedule(err) => schedule_status(err),
            ApiError::Task(TaskError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Task(TaskError::InvalidStateTransition { .. }) => StatusCode::CONFLICT,
            ApiError::Task(TaskError::PhotoRequired) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Task(TaskError::Schedule(err)) => schedule_status(err),
            ApiError::Task(TaskError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}
