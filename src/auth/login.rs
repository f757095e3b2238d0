use serde::Deserialize;
use std::sync::Arc;

use crate::auth::accounts::DynCredentialStore;
use crate::auth::password::PasswordHasher;
use crate::auth::tokens::{IssuedToken, Subject, TokenService};
use crate::config::IdentityMode;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    pub identity: Option<String>,
    #[serde(default)]
    pub password: String,
}

pub struct LoginService {
    accounts: DynCredentialStore,
    hasher: PasswordHasher,
    tokens: Arc<TokenService>,
    mode: IdentityMode,
}

impl LoginService {
    pub fn new(
        accounts: DynCredentialStore,
        hasher: PasswordHasher,
        tokens: Arc<TokenService>,
        mode: IdentityMode,
    ) -> Self {
        Self {
            accounts,
            hasher,
            tokens,
            mode,
        }
    }

    /// Unknown identity and wrong password both yield `InvalidCredentials`;
    /// only a correct password reveals that an account is inactive.
    pub async fn login(&self, request: &LoginRequest) -> AppResult<IssuedToken> {
        let identity = request
            .identity
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::InvalidInput("Identity is required".into()))?;
        if request.password.is_empty() {
            return Err(AppError::InvalidInput("Password is required".into()));
        }

        let identity = match self.mode {
            IdentityMode::Email => identity.to_lowercase(),
            IdentityMode::Username => identity.to_string(),
        };

        let account = self
            .accounts
            .find_by_identity(&identity)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = self
            .hasher
            .verify_async(request.password.clone(), account.password_hash.clone())
            .await;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        if !account.is_active {
            return Err(AppError::AccountInactive);
        }

        let issued = self.tokens.issue(&Subject {
            account_id: account.id,
            handle: account.handle.clone(),
            identity: account.identity.clone(),
        })?;

        tracing::info!("Account {} logged in", account.id);
        Ok(issued)
    }
}
