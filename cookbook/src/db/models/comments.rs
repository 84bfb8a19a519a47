//! Database models for comments.

use crate::types::CommentId;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct CommentCreateDBRequest {
    pub comment: String,
    pub owner: String,
    pub recipe_id: String,
}

#[derive(Debug, Clone)]
pub struct CommentUpdateDBRequest {
    pub comment: String,
}

/// Owner and recipe id are free text, nothing checks they point anywhere.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CommentDBResponse {
    pub id: CommentId,
    pub comment: String,
    pub owner: String,
    pub recipe_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub owner: Option<String>,
    pub recipe_id: Option<String>,
}
