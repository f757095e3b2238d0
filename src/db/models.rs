use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Integer row identifiers, one newtype per table so ownership checks
/// can't compare a profile id against an account id.
macro_rules! row_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map($name)
            }
        }
    };
}

row_id!(AccountId);
row_id!(ProfileId);
row_id!(PostId);
row_id!(CommentId);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub identity: String,
    pub handle: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub profile_id: ProfileId,
    pub account_id: AccountId,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub photo: Option<String>,
    pub created_at: String,
}

/// A community post as seen by one caller: counts plus whether that
/// caller's profile has liked it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub post_id: PostId,
    pub profile_id: ProfileId,
    pub content: String,
    pub image: Option<String>,
    pub created_at: String,
    pub full_name: Option<String>,
    pub profile_photo: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub comment_id: CommentId,
    pub comment: String,
    pub created_at: String,
    pub profile_id: ProfileId,
    pub full_name: Option<String>,
    pub profile_photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExplorePost {
    pub post_id: i64,
    pub caption: Option<String>,
    pub created_at: String,
    pub place_id: Option<i64>,
    pub place_name: Option<String>,
    pub place_description: Option<String>,
    pub place_rating: Option<f64>,
    pub photo_id: Option<i64>,
    pub image_url: Option<String>,
    pub upload_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&PostId(42)).unwrap();
        assert_eq!(json, "42");
        let id: AccountId = serde_json::from_str("7").unwrap();
        assert_eq!(id, AccountId(7));
    }

    #[test]
    fn account_serialization_omits_password_hash() {
        let account = Account {
            id: AccountId(1),
            identity: "alice".into(),
            handle: "alice".into(),
            email: None,
            password_hash: "$2b$10$secret".into(),
            is_active: true,
            created_at: "2025-01-01 00:00:00".into(),
        };
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["identity"], "alice");
    }
}
