use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::ExplorePost;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentAccount, IdPath};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/explore", get(list))
        .route("/explore/{post_id}", get(show))
}

async fn list(
    State(state): State<AppState>,
    _account: CurrentAccount,
) -> AppResult<Json<Vec<ExplorePost>>> {
    Ok(Json(state.explore.list().await?))
}

async fn show(
    State(state): State<AppState>,
    _account: CurrentAccount,
    IdPath(post_id): IdPath<i64>,
) -> AppResult<Json<ExplorePost>> {
    state
        .explore
        .get(post_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Post not found".into()))
}
