//! API request/response models for comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::comments::{CommentDBResponse, CommentFilter};
use crate::types::CommentId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreate {
    pub comment: String,
    pub recipe_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentUpdate {
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: CommentId,
    pub comment: String,
    pub owner: String,
    pub recipe_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentDBResponse> for CommentResponse {
    fn from(db: CommentDBResponse) -> Self {
        Self {
            id: db.id,
            comment: db.comment,
            owner: db.owner,
            recipe_id: db.recipe_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsQuery {
    pub owner: Option<String>,
    pub recipe_id: Option<String>,
}

impl From<ListCommentsQuery> for CommentFilter {
    fn from(query: ListCommentsQuery) -> Self {
        Self {
            owner: query.owner,
            recipe_id: query.recipe_id,
        }
    }
}
