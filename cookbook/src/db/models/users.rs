//! Database models for users.

use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone, Default)]
pub struct UserCreateDBRequest {
    pub email: String,
    /// None for accounts that only sign in through an identity provider
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub background: Option<String>,
    pub image: Option<String>,
    pub profile: Option<String>,
    pub google_id: Option<String>,
    pub tags: Vec<String>,
}

/// Database request for updating a user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub background: Option<String>,
    pub image: Option<String>,
    pub profile: Option<String>,
    /// Replaces the full tag list when present
    pub tags: Option<Vec<String>>,
}

/// Database response for a user
#[derive(Debug, Clone, PartialEq)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub background: Option<String>,
    pub image: Option<String>,
    pub profile: Option<String>,
    pub google_id: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub email: Option<String>,
}
