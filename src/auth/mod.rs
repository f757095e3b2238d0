pub mod accounts;
pub mod handlers;
pub mod login;
pub mod password;
pub mod registration;
pub mod tokens;

pub use accounts::{CredentialStore, DynCredentialStore, SqliteCredentialStore};
pub use password::PasswordHasher;
pub use tokens::{Claims, TokenError, TokenService};
