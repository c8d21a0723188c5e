pub mod assets;
pub mod schedules;
pub mod tasks;
pub mod templates;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(templates::router())
        .merge(assets::router())
        .merge(schedules::router())
        .merge(tasks::router())
}
