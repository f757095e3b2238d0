use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::community::LikeToggle;
use crate::db::models::{CommentView, FeedPost, PostId};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentAccount, IdPath};
use crate::state::AppState;
use crate::uploads;

#[derive(Debug, Default, Deserialize)]
pub struct EditPostBody {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentBody {
    #[serde(alias = "text")]
    pub comment: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/community/posts",
            get(feed).post(create_post).layer(uploads::body_limit()),
        )
        .route(
            "/community/posts/{post_id}",
            get(get_post).put(edit_post).delete(delete_post),
        )
        .route(
            "/community/posts/{post_id}/comments",
            get(list_comments).post(add_comment),
        )
        .route("/community/posts/{post_id}/like", post(toggle_like))
}

async fn feed(
    State(state): State<AppState>,
    account: CurrentAccount,
) -> AppResult<Json<Vec<FeedPost>>> {
    Ok(Json(state.social().feed(account.id).await?))
}

/// POST /community/posts - multipart with a `content` text field and an
/// optional `image` file.
async fn create_post(
    State(state): State<AppState>,
    account: CurrentAccount,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let social = state.social();
    social.resolve_profile(account.id).await?;

    let mut content = None;
    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(uploads::bad_upload)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("content") => {
                content = Some(field.text().await.map_err(uploads::bad_upload)?);
            }
            Some("image") => {
                image = Some(uploads::read_image(field).await?);
            }
            _ => {}
        }
    }

    // Validate the text before anything touches disk
    let has_content = content.as_deref().is_some_and(|c| !c.trim().is_empty());
    let image = match image {
        Some(upload) => Some(uploads::store_image(&state.config.uploads_path(), &upload).await?),
        None if has_content => None,
        None => {
            return Err(AppError::InvalidInput(
                "Post needs content or an image".into(),
            ))
        }
    };

    let post_id = social
        .create_post(account.id, content.as_deref(), image.as_deref())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Post created", "postId": post_id, "image": image })),
    )
        .into_response())
}

async fn get_post(
    State(state): State<AppState>,
    account: CurrentAccount,
    IdPath(post_id): IdPath<PostId>,
) -> AppResult<Json<FeedPost>> {
    Ok(Json(state.social().get_post(account.id, post_id).await?))
}

async fn edit_post(
    State(state): State<AppState>,
    account: CurrentAccount,
    IdPath(post_id): IdPath<PostId>,
    Json(body): Json<EditPostBody>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .social()
        .edit_post(account.id, post_id, body.content.as_deref())
        .await?;
    Ok(Json(json!({ "message": "Post updated" })))
}

async fn delete_post(
    State(state): State<AppState>,
    account: CurrentAccount,
    IdPath(post_id): IdPath<PostId>,
) -> AppResult<Json<serde_json::Value>> {
    state.social().delete_post(account.id, post_id).await?;
    Ok(Json(json!({ "message": "Post deleted" })))
}

async fn list_comments(
    State(state): State<AppState>,
    _account: CurrentAccount,
    IdPath(post_id): IdPath<PostId>,
) -> AppResult<Json<Vec<CommentView>>> {
    Ok(Json(state.social().list_comments(post_id).await?))
}

async fn add_comment(
    State(state): State<AppState>,
    account: CurrentAccount,
    IdPath(post_id): IdPath<PostId>,
    Json(body): Json<CommentBody>,
) -> AppResult<Response> {
    let comment_id = state
        .social()
        .add_comment(account.id, post_id, body.comment.as_deref())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment added", "commentId": comment_id })),
    )
        .into_response())
}

async fn toggle_like(
    State(state): State<AppState>,
    account: CurrentAccount,
    IdPath(post_id): IdPath<PostId>,
) -> AppResult<Json<serde_json::Value>> {
    let outcome = state.social().toggle_like(account.id, post_id).await?;
    let message = match outcome {
        LikeToggle::Liked => "Liked",
        LikeToggle::Unliked => "Unliked",
    };
    Ok(Json(json!({
        "message": message,
        "liked": outcome == LikeToggle::Liked,
    })))
}
