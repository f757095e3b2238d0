use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::db::models::{AccountId, Profile, ProfileId};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentAccount, IdPath};
use crate::profiles::{CreateProfileRequest, ProfileUpdate};
use crate::state::AppState;
use crate::uploads;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/create", post(create_profile))
        .route("/profile/me", get(my_profile).put(update_my_profile))
        .route(
            "/profile/me/photo",
            post(upload_photo).layer(uploads::body_limit()),
        )
        .route("/profile/account/{account_id}", get(profile_by_account))
        .route("/profile/{profile_id}", get(profile_by_id))
}

/// POST /profile/create - internal hook called by registration.
async fn create_profile(
    State(state): State<AppState>,
    Json(req): Json<CreateProfileRequest>,
) -> AppResult<Response> {
    let account_id = req
        .account_id
        .ok_or_else(|| AppError::InvalidInput("accountID is required".into()))?;
    let display_name = req
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let created = state
        .profiles
        .create_if_absent(account_id, display_name)
        .await?;

    if created {
        tracing::info!("Created profile for account {}", account_id);
        Ok((
            StatusCode::CREATED,
            Json(json!({ "message": "Profile created" })),
        )
            .into_response())
    } else {
        Ok(Json(json!({ "message": "Profile already exists" })).into_response())
    }
}

async fn my_profile(
    State(state): State<AppState>,
    account: CurrentAccount,
) -> AppResult<Json<Profile>> {
    let profile = state.social().resolve_profile(account.id).await?;
    Ok(Json(profile))
}

async fn update_my_profile(
    State(state): State<AppState>,
    account: CurrentAccount,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<Profile>> {
    if update.is_empty() {
        return Err(AppError::InvalidInput("No fields to update".into()));
    }
    if !state.profiles.update(account.id, &update).await? {
        return Err(AppError::ProfileNotFound);
    }
    let profile = state.social().resolve_profile(account.id).await?;
    Ok(Json(profile))
}

/// POST /profile/me/photo - multipart with an image in the `photo` field.
async fn upload_photo(
    State(state): State<AppState>,
    account: CurrentAccount,
    mut multipart: Multipart,
) -> AppResult<Response> {
    state.social().resolve_profile(account.id).await?;

    while let Some(field) = multipart.next_field().await.map_err(uploads::bad_upload)? {
        if field.name() != Some("photo") {
            continue;
        }

        let image = uploads::read_image(field).await?;
        let photo = uploads::store_image(&state.config.uploads_path(), &image).await?;
        if !state.profiles.set_photo(account.id, &photo).await? {
            return Err(AppError::ProfileNotFound);
        }
        tracing::info!("Account {} uploaded photo {}", account.id, photo);

        return Ok(Json(json!({ "message": "Photo updated", "photo": photo })).into_response());
    }

    Err(AppError::InvalidInput("Missing photo field".into()))
}

async fn profile_by_id(
    State(state): State<AppState>,
    _account: CurrentAccount,
    IdPath(profile_id): IdPath<ProfileId>,
) -> AppResult<Json<Profile>> {
    state
        .profiles
        .find_by_id(profile_id)
        .await?
        .map(Json)
        .ok_or(AppError::ProfileNotFound)
}

async fn profile_by_account(
    State(state): State<AppState>,
    _account: CurrentAccount,
    IdPath(account_id): IdPath<AccountId>,
) -> AppResult<Json<Profile>> {
    state
        .profiles
        .find_by_account(account_id)
        .await?
        .map(Json)
        .ok_or(AppError::ProfileNotFound)
}
