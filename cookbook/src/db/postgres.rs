//! [`Store`](super::Store) backed by a PostgreSQL pool.
//!
//! Every call checks out one connection and hands it to the matching repository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{
    CommentStore, RecipeStore, UserStore,
    errors::Result,
    handlers::{Comments, Recipes, Repository, Users},
    models::{
        comments::{CommentCreateDBRequest, CommentDBResponse, CommentFilter, CommentUpdateDBRequest},
        recipes::{RecipeCreateDBRequest, RecipeDBResponse, RecipeFilter, RecipePage, RecipeSearch, RecipeUpdateDBRequest},
        users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest},
    },
};
use crate::types::{CommentId, RecipeId, UserId};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).create(request).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_by_id(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_user_by_email(email).await
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).list(filter).await
    }

    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).update(id, request).await
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).delete(id).await
    }

    async fn push_refresh_token(&self, user_id: UserId, fingerprint: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).push_refresh_token(user_id, fingerprint).await
    }

    async fn consume_refresh_token(&self, user_id: UserId, fingerprint: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).consume_refresh_token(user_id, fingerprint).await
    }

    async fn clear_refresh_tokens(&self, user_id: UserId) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).clear_refresh_tokens(user_id).await
    }

    #[cfg(test)]
    async fn refresh_tokens(&self, user_id: UserId) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).refresh_tokens(user_id).await
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn create_recipe(&self, request: &RecipeCreateDBRequest) -> Result<RecipeDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Recipes::new(&mut conn).create(request).await
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<RecipeDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Recipes::new(&mut conn).get_by_id(id).await
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<RecipePage> {
        let mut conn = self.pool.acquire().await?;
        let mut repo = Recipes::new(&mut conn);
        let total = repo.count(filter).await?;
        let recipes = repo.list(filter).await?;
        Ok(RecipePage { recipes, total })
    }

    async fn update_recipe(&self, id: RecipeId, request: &RecipeUpdateDBRequest) -> Result<Option<RecipeDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Recipes::new(&mut conn).update(id, request).await
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Recipes::new(&mut conn).delete(id).await
    }

    async fn add_like(&self, id: RecipeId) -> Result<Option<i64>> {
        let mut conn = self.pool.acquire().await?;
        Recipes::new(&mut conn).add_like(id).await
    }

    async fn search_recipes(&self, search: &RecipeSearch) -> Result<Vec<RecipeDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Recipes::new(&mut conn).search(search).await
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn create_comment(&self, request: &CommentCreateDBRequest) -> Result<CommentDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Comments::new(&mut conn).create(request).await
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<CommentDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Comments::new(&mut conn).get_by_id(id).await
    }

    async fn list_comments(&self, filter: &CommentFilter) -> Result<Vec<CommentDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Comments::new(&mut conn).list(filter).await
    }

    async fn update_comment(&self, id: CommentId, request: &CommentUpdateDBRequest) -> Result<Option<CommentDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Comments::new(&mut conn).update(id, request).await
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Comments::new(&mut conn).delete(id).await
    }
}
