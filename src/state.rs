use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::login::LoginService;
use crate::auth::registration::RegistrationSaga;
use crate::auth::{DynCredentialStore, PasswordHasher, SqliteCredentialStore, TokenService};
use crate::community::{DynCommunityStore, SocialService, SqliteCommunityStore};
use crate::config::Config;
use crate::explore::{DynExploreStore, SqliteExploreStore};
use crate::profiles::{
    DynProfileProvisioner, DynProfileStore, HttpProfileProvisioner, LocalProfileProvisioner,
    SqliteProfileStore,
};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: Arc<TokenService>,
    pub accounts: DynCredentialStore,
    pub profiles: DynProfileStore,
    pub community: DynCommunityStore,
    pub explore: DynExploreStore,
    pub provisioner: DynProfileProvisioner,
}

impl AppState {
    /// Wire the stores and services for one process. Fails when the token
    /// secret is missing.
    pub fn new(config: Config, db: DbPool) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenService::new(
            &config.auth.jwt_secret,
            config.token_ttl(),
        )?);
        let profiles: DynProfileStore = Arc::new(SqliteProfileStore::new(db.clone()));

        let provisioner: DynProfileProvisioner = match config.profile_service.url.as_deref() {
            Some(url) => {
                tracing::info!("Provisioning profiles through {}", url);
                Arc::new(HttpProfileProvisioner::new(
                    url,
                    config.provision_timeout(),
                )?)
            }
            None => Arc::new(LocalProfileProvisioner::new(profiles.clone())),
        };

        Ok(Self {
            accounts: Arc::new(SqliteCredentialStore::new(db.clone())),
            community: Arc::new(SqliteCommunityStore::new(db.clone())),
            explore: Arc::new(SqliteExploreStore::new(db.clone())),
            profiles,
            provisioner,
            tokens,
            config,
            db,
        })
    }

    pub fn with_provisioner(mut self, provisioner: DynProfileProvisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    fn hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.config.auth.bcrypt_cost)
    }

    pub fn registration(&self) -> RegistrationSaga {
        RegistrationSaga::new(
            self.accounts.clone(),
            self.provisioner.clone(),
            self.hasher(),
            self.config.identity.mode,
            self.config.provision_timeout(),
        )
    }

    pub fn login_service(&self) -> LoginService {
        LoginService::new(
            self.accounts.clone(),
            self.hasher(),
            self.tokens.clone(),
            self.config.identity.mode,
        )
    }

    pub fn social(&self) -> SocialService {
        SocialService::new(self.profiles.clone(), self.community.clone())
    }
}
