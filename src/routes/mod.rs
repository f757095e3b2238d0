pub mod auth;
pub mod community;
pub mod explore;
pub mod profile;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the router for the configured role. Every role answers /health.
pub fn router(state: AppState) -> Router {
    let role = state.config.server.role;
    let mut app = Router::new().route("/health", get(health));

    if role.serves_identity() {
        app = app.merge(auth::router());
    }
    if role.serves_social() {
        app = app
            .merge(profile::router())
            .merge(community::router())
            .merge(explore::router());
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
