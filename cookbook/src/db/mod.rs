//! Data persistence and access.
//!
//! Handlers never touch a driver directly. They go through the [`Store`] handle held in
//! [`crate::AppState`], which is built once at startup from configuration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │  Arc<dyn Store>
//!        ↓
//! ┌─────────────┐      ┌──────────────┐
//! │  PgStore    │      │InMemoryStore │
//! └──────┬──────┘      └──────────────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries over a borrowed connection)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Postgres repositories
//! - [`models`]: store request/response records
//! - [`errors`]: store error type
//! - [`postgres`]: [`Store`] over a connection pool
//! - [`in_memory`]: [`Store`] over process-local tables

pub mod errors;
pub mod handlers;
pub mod in_memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

use crate::types::{CommentId, RecipeId, UserId};
use errors::Result;
use models::{
    comments::{CommentCreateDBRequest, CommentDBResponse, CommentFilter, CommentUpdateDBRequest},
    recipes::{RecipeCreateDBRequest, RecipeDBResponse, RecipeFilter, RecipePage, RecipeSearch, RecipeUpdateDBRequest},
    users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest},
};

pub use in_memory::InMemoryStore;
pub use postgres::PgStore;

/// Accounts and their refresh-token lists.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with a unique violation on `users`/`users_email_key` when the email is taken
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;
    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>>;
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserDBResponse>>;
    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<Option<UserDBResponse>>;
    /// Removes the user together with their tag associations and refresh tokens
    async fn delete_user(&self, id: UserId) -> Result<bool>;

    async fn push_refresh_token(&self, user_id: UserId, fingerprint: &str) -> Result<()>;
    /// Atomically remove one fingerprint; false when it was not in the list
    async fn consume_refresh_token(&self, user_id: UserId, fingerprint: &str) -> Result<bool>;
    async fn clear_refresh_tokens(&self, user_id: UserId) -> Result<u64>;
    #[cfg(test)]
    async fn refresh_tokens(&self, user_id: UserId) -> Result<Vec<String>>;
}

/// The recipe aggregate: core rows, ingredients and tag associations.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn create_recipe(&self, request: &RecipeCreateDBRequest) -> Result<RecipeDBResponse>;
    async fn get_recipe(&self, id: RecipeId) -> Result<Option<RecipeDBResponse>>;
    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<RecipePage>;
    async fn update_recipe(&self, id: RecipeId, request: &RecipeUpdateDBRequest) -> Result<Option<RecipeDBResponse>>;
    async fn delete_recipe(&self, id: RecipeId) -> Result<bool>;
    async fn add_like(&self, id: RecipeId) -> Result<Option<i64>>;
    async fn search_recipes(&self, search: &RecipeSearch) -> Result<Vec<RecipeDBResponse>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create_comment(&self, request: &CommentCreateDBRequest) -> Result<CommentDBResponse>;
    async fn get_comment(&self, id: CommentId) -> Result<Option<CommentDBResponse>>;
    async fn list_comments(&self, filter: &CommentFilter) -> Result<Vec<CommentDBResponse>>;
    async fn update_comment(&self, id: CommentId, request: &CommentUpdateDBRequest) -> Result<Option<CommentDBResponse>>;
    async fn delete_comment(&self, id: CommentId) -> Result<bool>;
}

/// Everything the HTTP layer needs from persistence.
pub trait Store: UserStore + RecipeStore + CommentStore {}

impl<T: UserStore + RecipeStore + CommentStore> Store for T {}
