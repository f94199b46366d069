use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tower_http::cors::CorsLayer;

use crate::{
    model::types::Snapshot,
    repository::QuestionRepository,
    server::{AppState, Console},
};

type Unavailable = (StatusCode, String);

/// Read-only endpoints for screens that poll instead of holding a socket.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/state", get(current_state))
        .route("/questions", get(questions))
        .with_state(app_state)
        .layer(CorsLayer::permissive())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn current_state(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Snapshot>, Unavailable> {
    match &*app_state.console.lock().await {
        Console::Ready(controller) => Ok(Json(controller.snapshot())),
        Console::Loading { reason, .. } => Err(unavailable(reason)),
    }
}

async fn questions(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<QuestionRepository>, Unavailable> {
    match &*app_state.console.lock().await {
        Console::Ready(controller) => Ok(Json(controller.repository().clone())),
        Console::Loading { reason, .. } => Err(unavailable(reason)),
    }
}

fn unavailable(reason: &str) -> Unavailable {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        format!("Questions unavailable: {reason}"),
    )
}
