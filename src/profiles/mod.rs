pub mod provisioner;
pub mod repository;

use serde::{Deserialize, Serialize};

use crate::db::models::AccountId;

pub use provisioner::{
    DynProfileProvisioner, HttpProfileProvisioner, LocalProfileProvisioner, ProfileProvisioner,
    ProvisionError,
};
pub use repository::{DynProfileStore, ProfileStore, ProfileUpdate, SqliteProfileStore};

/// Body of the internal profile-creation hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    #[serde(rename = "accountID", alias = "accountId", alias = "userID")]
    pub account_id: Option<AccountId>,
    #[serde(alias = "fullName")]
    pub display_name: Option<String>,
}
