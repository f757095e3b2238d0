use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable that overrides `auth.jwt_secret` from the config file.
pub const JWT_SECRET_ENV: &str = "WAYPOST_JWT_SECRET";

#[derive(Parser, Debug)]
#[command(name = "waypost", about = "Identity, profile and community services")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Which route groups this instance serves
    #[arg(long, value_enum)]
    pub role: Option<ServiceRole>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    #[default]
    All,
    Identity,
    Social,
}

impl ServiceRole {
    pub fn serves_identity(self) -> bool {
        matches!(self, ServiceRole::All | ServiceRole::Identity)
    }

    pub fn serves_social(self) -> bool {
        matches!(self, ServiceRole::All | ServiceRole::Social)
    }
}

/// Which field keys an account: deployments register either by email
/// address or by username.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    Email,
    #[default]
    Username,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub identity: IdentityConfig,
    pub profile_service: ProfileServiceConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub role: ServiceRole,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HS256 secret. Every service that accepts tokens must use the same value.
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct IdentityConfig {
    pub mode: IdentityMode,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ProfileServiceConfig {
    /// Base URL of the social service. When unset, profiles are written
    /// through the local profile store.
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            role: ServiceRole::All,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_minutes: 60,
            bcrypt_cost: 10,
        }
    }
}

impl Default for ProfileServiceConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 3000,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(role) = cli.role {
            config.server.role = role;
        }

        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.is_empty() {
                config.auth.jwt_secret = secret;
            }
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("waypost.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("uploads"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".waypost")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("waypost.db"))
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("uploads"))
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.auth.token_ttl_minutes)
    }

    pub fn provision_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.profile_service.timeout_ms)
    }
}
