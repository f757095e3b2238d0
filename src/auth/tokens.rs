//! Signed, time-limited bearer tokens shared by every service.
//!
//! Tokens are HS256 JWTs. All services must be configured with the same
//! secret; there is no revocation, so expiry is the only bound on a token's
//! lifetime.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::AccountId;
use crate::error::{AppError, AppResult};

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("signature does not match")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token could not be parsed")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Who the token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub account_id: AccountId,
    pub handle: String,
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(rename = "accountID")]
    pub account_id: AccountId,
    pub handle: String,
    pub identity: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn subject(&self) -> Subject {
        Subject {
            account_id: self.account_id,
            handle: self.handle.clone(),
            identity: self.identity.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> anyhow::Result<Self> {
        if secret.is_empty() {
            anyhow::bail!(
                "JWT secret is not configured (set auth.jwt_secret or {})",
                crate::config::JWT_SECRET_ENV
            );
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &Subject) -> AppResult<IssuedToken> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: &Subject, now: DateTime<Utc>) -> AppResult<IssuedToken> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            account_id: subject.account_id,
            handle: subject.handle.clone(),
            identity: subject.identity.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Signature and algorithm are checked by jsonwebtoken; expiry is
    /// checked here against `now` with no leeway.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}
