//! Account registration.
//!
//! Registration spans two boundaries: the account row is written to the
//! credential store, then a profile is requested from the profile service.
//! The second step is best effort. If it fails or times out the account is
//! kept and registration still succeeds; the account is left without a
//! profile until the profile service is asked again.

use serde::Deserialize;
use std::time::Duration;

use crate::auth::accounts::{DynCredentialStore, NewAccount};
use crate::auth::password::PasswordHasher;
use crate::config::IdentityMode;
use crate::db::models::AccountId;
use crate::db::StoreError;
use crate::error::{AppError, AppResult};
use crate::profiles::DynProfileProvisioner;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
}

/// A request that passed validation for the configured identity mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub identity: String,
    pub handle: String,
    pub email: Option<String>,
    pub password: String,
    pub display_name: String,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl RegisterRequest {
    pub fn validate(&self, mode: IdentityMode) -> AppResult<ValidRegistration> {
        let email = non_empty(&self.email);
        let username = non_empty(&self.username);

        if self.password.is_empty() {
            return Err(AppError::InvalidInput("Password is required".into()));
        }

        let (identity, handle) = match mode {
            IdentityMode::Email => {
                let email = email
                    .clone()
                    .ok_or_else(|| AppError::InvalidInput("Email is required".into()))?;
                let local_part = match email.split_once('@') {
                    Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                        local.to_string()
                    }
                    _ => return Err(AppError::InvalidInput("Email address is invalid".into())),
                };
                (email.to_lowercase(), username.clone().unwrap_or(local_part))
            }
            IdentityMode::Username => {
                let username = username
                    .clone()
                    .ok_or_else(|| AppError::InvalidInput("Username is required".into()))?;
                (username.clone(), username)
            }
        };

        let display_name = non_empty(&self.full_name).unwrap_or_else(|| handle.clone());

        Ok(ValidRegistration {
            identity,
            handle,
            email,
            password: self.password.clone(),
            display_name,
        })
    }
}

/// What happened to the profile step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    Provisioned,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub account_id: AccountId,
    pub provisioning: ProvisioningOutcome,
}

pub struct RegistrationSaga {
    accounts: DynCredentialStore,
    provisioner: DynProfileProvisioner,
    hasher: PasswordHasher,
    mode: IdentityMode,
    provision_timeout: Duration,
}

impl RegistrationSaga {
    pub fn new(
        accounts: DynCredentialStore,
        provisioner: DynProfileProvisioner,
        hasher: PasswordHasher,
        mode: IdentityMode,
        provision_timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            provisioner,
            hasher,
            mode,
            provision_timeout,
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> AppResult<Registration> {
        let valid = request.validate(self.mode)?;

        if self.accounts.find_by_identity(&valid.identity).await?.is_some() {
            return Err(AppError::DuplicateAccount);
        }

        let password_hash = self.hasher.hash_async(valid.password.clone()).await?;

        let account_id = self
            .accounts
            .insert(&NewAccount {
                identity: valid.identity.clone(),
                handle: valid.handle.clone(),
                email: valid.email.clone(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                StoreError::Conflict(_) => AppError::DuplicateAccount,
                other => other.into(),
            })?;

        tracing::info!("Registered account {} ({})", account_id, valid.handle);

        let provisioning = self.provision_profile(account_id, &valid.display_name).await;
        Ok(Registration {
            account_id,
            provisioning,
        })
    }

    /// Never fails: the account already exists and is not rolled back.
    async fn provision_profile(
        &self,
        account_id: AccountId,
        display_name: &str,
    ) -> ProvisioningOutcome {
        let attempt = tokio::time::timeout(
            self.provision_timeout,
            self.provisioner.provision(account_id, display_name),
        )
        .await;

        match attempt {
            Ok(Ok(())) => ProvisioningOutcome::Provisioned,
            Ok(Err(e)) => {
                let err = AppError::UpstreamUnavailable(e.to_string());
                tracing::warn!(
                    "Profile provisioning failed for account {}: {}",
                    account_id,
                    err
                );
                ProvisioningOutcome::Failed(err.to_string())
            }
            Err(_) => {
                tracing::warn!(
                    "Profile provisioning timed out for account {} after {:?}",
                    account_id,
                    self.provision_timeout
                );
                ProvisioningOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::accounts::{CredentialStore, SqliteCredentialStore};
    use crate::db;
    use crate::profiles::{
        DynProfileStore, LocalProfileProvisioner, ProfileProvisioner, ProvisionError,
        SqliteProfileStore,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FailingProvisioner;

    #[async_trait]
    impl ProfileProvisioner for FailingProvisioner {
        async fn provision(&self, _: AccountId, _: &str) -> Result<(), ProvisionError> {
            Err(ProvisionError::Status(503))
        }
    }

    struct HangingProvisioner;

    #[async_trait]
    impl ProfileProvisioner for HangingProvisioner {
        async fn provision(&self, _: AccountId, _: &str) -> Result<(), ProvisionError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    struct Fixture {
        accounts: Arc<SqliteCredentialStore>,
        profiles: DynProfileStore,
        _tmp: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let (pool, tmp) = db::test_pool();
        Fixture {
            accounts: Arc::new(SqliteCredentialStore::new(pool.clone())),
            profiles: Arc::new(SqliteProfileStore::new(pool)),
            _tmp: tmp,
        }
    }

    fn saga(f: &Fixture, provisioner: DynProfileProvisioner, mode: IdentityMode) -> RegistrationSaga {
        RegistrationSaga::new(
            f.accounts.clone(),
            provisioner,
            PasswordHasher::new(4),
            mode,
            Duration::from_millis(200),
        )
    }

    fn local(f: &Fixture) -> DynProfileProvisioner {
        Arc::new(LocalProfileProvisioner::new(f.profiles.clone()))
    }

    fn username_request(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.into()),
            password: "pw123456".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn registers_account_and_profile() {
        let f = fixture();
        let saga = saga(&f, local(&f), IdentityMode::Username);

        let registration = saga.register(&username_request("alice")).await.unwrap();
        assert_eq!(registration.provisioning, ProvisioningOutcome::Provisioned);

        let account = f.accounts.find_by_identity("alice").await.unwrap().unwrap();
        assert_eq!(account.id, registration.account_id);
        assert_ne!(account.password_hash, "pw123456");

        let profile = f
            .profiles
            .find_by_account(registration.account_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn duplicate_identity_is_rejected_without_new_row() {
        let f = fixture();
        let saga = saga(&f, local(&f), IdentityMode::Username);

        saga.register(&username_request("alice")).await.unwrap();
        let err = saga.register(&username_request("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateAccount));

        let second = f.accounts.find_by_id(AccountId(2)).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn provisioning_failure_does_not_fail_registration() {
        let f = fixture();
        let saga = saga(&f, Arc::new(FailingProvisioner), IdentityMode::Username);

        let registration = saga.register(&username_request("bob")).await.unwrap();
        assert!(matches!(
            registration.provisioning,
            ProvisioningOutcome::Failed(_)
        ));

        // Account is kept, profile is missing
        assert!(f.accounts.find_by_identity("bob").await.unwrap().is_some());
        assert!(f
            .profiles
            .find_by_account(registration.account_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn provisioning_timeout_is_treated_as_failure() {
        let f = fixture();
        let saga = saga(&f, Arc::new(HangingProvisioner), IdentityMode::Username);

        let started = std::time::Instant::now();
        let registration = saga.register(&username_request("carol")).await.unwrap();
        assert_eq!(registration.provisioning, ProvisioningOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(f.accounts.find_by_identity("carol").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn email_mode_keys_on_lowercased_email() {
        let f = fixture();
        let saga = saga(&f, local(&f), IdentityMode::Email);

        let request = RegisterRequest {
            email: Some("Dana@Example.com".into()),
            password: "pw".into(),
            full_name: Some("Dana Scully".into()),
            ..Default::default()
        };
        let registration = saga.register(&request).await.unwrap();

        let account = f
            .accounts
            .find_by_identity("dana@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.handle, "Dana");
        assert_eq!(account.email.as_deref(), Some("Dana@Example.com"));

        let profile = f
            .profiles
            .find_by_account(registration.account_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Dana Scully"));
    }

    #[test]
    fn validation_rules() {
        let no_password = RegisterRequest {
            username: Some("a".into()),
            ..Default::default()
        };
        assert!(matches!(
            no_password.validate(IdentityMode::Username),
            Err(AppError::InvalidInput(_))
        ));

        let blank_username = RegisterRequest {
            username: Some("   ".into()),
            password: "pw".into(),
            ..Default::default()
        };
        assert!(blank_username.validate(IdentityMode::Username).is_err());

        let username_only = username_request("eve");
        assert!(username_only.validate(IdentityMode::Email).is_err());

        let bad_email = RegisterRequest {
            email: Some("not-an-email".into()),
            password: "pw".into(),
            ..Default::default()
        };
        assert!(bad_email.validate(IdentityMode::Email).is_err());

        let with_handle = RegisterRequest {
            email: Some("f@x.io".into()),
            username: Some("frank".into()),
            password: "pw".into(),
            ..Default::default()
        };
        let valid = with_handle.validate(IdentityMode::Email).unwrap();
        assert_eq!(valid.identity, "f@x.io");
        assert_eq!(valid.handle, "frank");
        assert_eq!(valid.display_name, "frank");
    }
}
