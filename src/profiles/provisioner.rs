// Client side of the profile-creation boundary used by registration.
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::db::models::AccountId;
use crate::db::StoreError;
use crate::profiles::repository::DynProfileStore;
use crate::profiles::CreateProfileRequest;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("profile service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("profile service responded with status {0}")]
    Status(u16),

    #[error("profile store failed: {0}")]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait ProfileProvisioner: Send + Sync {
    /// Ask the profile service to create a profile for a new account.
    /// Implementations must tolerate being called twice for one account.
    async fn provision(
        &self,
        account_id: AccountId,
        display_name: &str,
    ) -> Result<(), ProvisionError>;
}

pub type DynProfileProvisioner = Arc<dyn ProfileProvisioner>;

/// Calls `POST {base_url}/profile/create` on a remote social service.
pub struct HttpProfileProvisioner {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpProfileProvisioner {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/profile/create", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ProfileProvisioner for HttpProfileProvisioner {
    async fn provision(
        &self,
        account_id: AccountId,
        display_name: &str,
    ) -> Result<(), ProvisionError> {
        let body = CreateProfileRequest {
            account_id: Some(account_id),
            display_name: Some(display_name.to_string()),
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(ProvisionError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Writes straight to the profile store when both services share a process.
pub struct LocalProfileProvisioner {
    profiles: DynProfileStore,
}

impl LocalProfileProvisioner {
    pub fn new(profiles: DynProfileStore) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl ProfileProvisioner for LocalProfileProvisioner {
    async fn provision(
        &self,
        account_id: AccountId,
        display_name: &str,
    ) -> Result<(), ProvisionError> {
        let created = self
            .profiles
            .create_if_absent(account_id, Some(display_name))
            .await?;
        if !created {
            tracing::debug!("Profile for account {} already existed", account_id);
        }
        Ok(())
    }
}
