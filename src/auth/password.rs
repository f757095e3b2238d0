use crate::error::{AppError, AppResult};

/// bcrypt with a fixed work factor. Each call to `hash` draws a fresh salt.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plaintext: &str) -> AppResult<String> {
        bcrypt::hash(plaintext, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Malformed digests verify as false rather than erroring.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        bcrypt::verify(plaintext, digest).unwrap_or(false)
    }

    /// `hash` on the blocking pool, for async callers.
    pub async fn hash_async(&self, plaintext: String) -> AppResult<String> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
    }

    pub async fn verify_async(&self, plaintext: String, digest: String) -> bool {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .unwrap_or(false)
    }
}
