//! API request/response models for users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::users::{UserDBResponse, UserUpdateDBRequest};
use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub background: Option<String>,
    pub image: Option<String>,
    pub profile: Option<String>,
    /// Replaces the whole tag list when present
    pub tags: Option<Vec<String>>,
}

impl From<UserUpdate> for UserUpdateDBRequest {
    fn from(update: UserUpdate) -> Self {
        Self {
            name: update.name,
            last_name: update.last_name,
            background: update.background,
            image: update.image,
            profile: update.profile,
            tags: update.tags,
        }
    }
}

/// A user as seen by API clients. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub background: Option<String>,
    pub image: Option<String>,
    pub profile: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            name: db.name,
            last_name: db.last_name,
            background: db.background,
            image: db.image,
            profile: db.profile,
            tags: db.tags,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing users
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// Exact email match
    pub email: Option<String>,
}
