mod error;
mod routes;

use std::sync::Arc;

use axum::Router;
use db::DBService;
use services::services::{schedule::ScheduleService, task::TaskService};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use utils::clock::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    schedules: ScheduleService,
    tasks: TaskService,
}

impl AppState {
    pub fn new(db: DBService, clock: Arc<dyn Clock>) -> Self {
        Self {
            schedules: ScheduleService::new(db.clone(), clock.clone()),
            tasks: TaskService::new(db.clone(), clock),
            db,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn schedules(&self) -> &ScheduleService {
        &self.schedules
    }

    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:helix.db".to_string());
    let db = DBService::new(&database_url).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(db, clock);

    let app = Router::new()
        .nest("/api", routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!("listening on {host}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
