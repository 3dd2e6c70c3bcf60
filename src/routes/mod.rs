pub mod corporate_routes;
pub mod ride_routes;

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_middleware_with_origins;
use crate::state::AppState;

/// Router completo de la API
pub fn create_router(state: AppState) -> Router {
    let cors = cors_middleware_with_origins(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/rides", ride_routes::create_ride_router())
        .nest("/api/corporates", corporate_routes::create_corporate_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "ride_dispatch",
        "environment": state.config.environment,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
