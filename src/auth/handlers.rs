use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::login::LoginRequest;
use crate::auth::registration::RegisterRequest;
use crate::db::models::AccountId;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub account_id: AccountId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let registration = state.registration().register(&req).await?;
    tracing::debug!(
        "Registration of account {} finished with {:?}",
        registration.account_id,
        registration.provisioning
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account registered".into(),
            account_id: registration.account_id,
        }),
    )
        .into_response())
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let issued = state.login_service().login(&req).await?;
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        token: issued.token,
        expires_in: state.tokens.ttl().num_seconds(),
    }))
}
