//! [`Store`](super::Store) over process-local tables.
//!
//! Used for tests and for running the service without a database (`database.type: in_memory`).
//! The tables mirror the Postgres schema: tags are shared rows referenced by id from users and
//! recipes, and each multi-row write happens under a single write lock so readers never observe
//! a half-built aggregate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    CommentStore, RecipeStore, UserStore,
    errors::{DbError, Result},
    models::{
        comments::{CommentCreateDBRequest, CommentDBResponse, CommentFilter, CommentUpdateDBRequest},
        recipes::{
            RecipeCreateDBRequest, RecipeDBResponse, RecipeFilter, RecipePage, RecipeRow, RecipeSearch, RecipeUpdateDBRequest, assemble,
            unique_names,
        },
        users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest},
    },
};
use crate::types::{CommentId, RecipeId, TagId, UserId, abbrev_uuid};

struct StoredUser {
    user: UserDBResponse,
    tag_ids: Vec<TagId>,
    refresh_tokens: Vec<String>,
}

struct StoredRecipe {
    row: RecipeRow,
    ingredients: Vec<String>,
    tag_ids: Vec<TagId>,
}

#[derive(Default)]
struct Tables {
    users: Vec<StoredUser>,
    tags: Vec<(TagId, String)>,
    recipes: Vec<StoredRecipe>,
    comments: Vec<CommentDBResponse>,
}

impl Tables {
    /// Find-or-create tag rows, returning ids in the order of `names`
    fn resolve_tags(&mut self, names: &[String]) -> Vec<TagId> {
        names
            .iter()
            .map(|name| match self.tags.iter().find(|(_, existing)| existing == name) {
                Some((id, _)) => *id,
                None => {
                    let id = Uuid::new_v4();
                    self.tags.push((id, name.clone()));
                    id
                }
            })
            .collect()
    }

    fn tag_names(&self, ids: &[TagId]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.tags.iter().find(|(tag_id, _)| tag_id == id).map(|(_, name)| name.clone()))
            .collect()
    }

    fn user_view(&self, stored: &StoredUser) -> UserDBResponse {
        UserDBResponse {
            tags: self.tag_names(&stored.tag_ids),
            ..stored.user.clone()
        }
    }

    fn recipe_views<'a>(&self, stored: impl IntoIterator<Item = &'a StoredRecipe>) -> Vec<RecipeDBResponse> {
        let mut rows = Vec::new();
        let mut ingredients = Vec::new();
        let mut tags = Vec::new();
        for recipe in stored {
            rows.push(recipe.row.clone());
            ingredients.extend(recipe.ingredients.iter().map(|name| (recipe.row.id, name.clone())));
            tags.extend(self.tag_names(&recipe.tag_ids).into_iter().map(|name| (recipe.row.id, name)));
        }
        assemble(rows, ingredients, tags)
    }

    fn user_mut(&mut self, id: UserId) -> Option<&mut StoredUser> {
        self.users.iter_mut().find(|stored| stored.user.id == id)
    }

    fn recipe_mut(&mut self, id: RecipeId) -> Option<&mut StoredRecipe> {
        self.recipes.iter_mut().find(|stored| stored.row.id == id)
    }
}

/// In-memory [`Store`](super::Store). Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    #[instrument(skip(self, request), err)]
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut tables = self.tables.write();

        if tables.users.iter().any(|stored| stored.user.email == request.email) {
            return Err(DbError::UniqueViolation {
                constraint: Some("users_email_key".to_string()),
                table: Some("users".to_string()),
                message: "duplicate key value violates unique constraint \"users_email_key\"".to_string(),
                conflicting_value: Some(request.email.clone()),
            });
        }

        let now = Utc::now();
        let tag_ids = tables.resolve_tags(&unique_names(&request.tags));
        let stored = StoredUser {
            user: UserDBResponse {
                id: Uuid::new_v4(),
                email: request.email.clone(),
                password_hash: request.password_hash.clone(),
                name: request.name.clone(),
                last_name: request.last_name.clone(),
                background: request.background.clone(),
                image: request.image.clone(),
                profile: request.profile.clone(),
                google_id: request.google_id.clone(),
                tags: Vec::new(),
                created_at: now,
                updated_at: now,
            },
            tag_ids,
            refresh_tokens: Vec::new(),
        };
        let view = tables.user_view(&stored);
        tables.users.push(stored);
        Ok(view)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        let tables = self.tables.read();
        Ok(tables.users.iter().find(|stored| stored.user.id == id).map(|stored| tables.user_view(stored)))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let tables = self.tables.read();
        Ok(tables
            .users
            .iter()
            .find(|stored| stored.user.email == email)
            .map(|stored| tables.user_view(stored)))
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserDBResponse>> {
        let tables = self.tables.read();
        Ok(tables
            .users
            .iter()
            .filter(|stored| filter.email.as_ref().is_none_or(|email| &stored.user.email == email))
            .map(|stored| tables.user_view(stored))
            .collect())
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<Option<UserDBResponse>> {
        let mut tables = self.tables.write();
        if tables.user_mut(id).is_none() {
            return Ok(None);
        }
        let tag_ids = request.tags.as_ref().map(|tags| tables.resolve_tags(&unique_names(tags)));

        let Some(stored) = tables.user_mut(id) else {
            return Ok(None);
        };

        let user = &mut stored.user;
        if let Some(name) = &request.name {
            user.name = Some(name.clone());
        }
        if let Some(last_name) = &request.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(background) = &request.background {
            user.background = Some(background.clone());
        }
        if let Some(image) = &request.image {
            user.image = Some(image.clone());
        }
        if let Some(profile) = &request.profile {
            user.profile = Some(profile.clone());
        }
        user.updated_at = Utc::now();
        if let Some(tag_ids) = tag_ids {
            stored.tag_ids = tag_ids;
        }

        let tables = &*tables;
        Ok(tables.users.iter().find(|stored| stored.user.id == id).map(|stored| tables.user_view(stored)))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.users.len();
        tables.users.retain(|stored| stored.user.id != id);
        Ok(tables.users.len() < before)
    }

    async fn push_refresh_token(&self, user_id: UserId, fingerprint: &str) -> Result<()> {
        let mut tables = self.tables.write();
        let stored = tables.user_mut(user_id).ok_or(DbError::NotFound)?;
        stored.refresh_tokens.push(fingerprint.to_string());
        Ok(())
    }

    async fn consume_refresh_token(&self, user_id: UserId, fingerprint: &str) -> Result<bool> {
        let mut tables = self.tables.write();
        let Some(stored) = tables.user_mut(user_id) else {
            return Ok(false);
        };
        match stored.refresh_tokens.iter().position(|existing| existing == fingerprint) {
            Some(index) => {
                stored.refresh_tokens.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_refresh_tokens(&self, user_id: UserId) -> Result<u64> {
        let mut tables = self.tables.write();
        let cleared = tables
            .user_mut(user_id)
            .map(|stored| std::mem::take(&mut stored.refresh_tokens).len() as u64)
            .unwrap_or(0);
        debug!(user_id = %abbrev_uuid(&user_id), cleared, "Cleared refresh tokens");
        Ok(cleared)
    }

    #[cfg(test)]
    async fn refresh_tokens(&self, user_id: UserId) -> Result<Vec<String>> {
        let tables = self.tables.read();
        Ok(tables
            .users
            .iter()
            .find(|stored| stored.user.id == user_id)
            .map(|stored| stored.refresh_tokens.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RecipeStore for InMemoryStore {
    #[instrument(skip(self, request), fields(owner = %abbrev_uuid(&request.owner)), err)]
    async fn create_recipe(&self, request: &RecipeCreateDBRequest) -> Result<RecipeDBResponse> {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let tag_ids = tables.resolve_tags(&unique_names(&request.tags));
        let stored = StoredRecipe {
            row: RecipeRow {
                id: Uuid::new_v4(),
                owner: request.owner,
                title: request.title.clone(),
                image: request.image.clone(),
                likes: 0,
                created_at: now,
                updated_at: now,
            },
            ingredients: request.ingredients.clone(),
            tag_ids,
        };
        let view = tables.recipe_views([&stored]).pop().ok_or(DbError::NotFound)?;
        tables.recipes.push(stored);
        Ok(view)
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<RecipeDBResponse>> {
        let tables = self.tables.read();
        Ok(tables.recipe_views(tables.recipes.iter().filter(|stored| stored.row.id == id)).pop())
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<RecipePage> {
        let tables = self.tables.read();
        let matching: Vec<&StoredRecipe> = tables
            .recipes
            .iter()
            .filter(|stored| filter.owner.is_none_or(|owner| stored.row.owner == owner))
            .collect();
        let total = matching.len() as i64;
        let window = matching
            .into_iter()
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize);
        Ok(RecipePage {
            recipes: tables.recipe_views(window),
            total,
        })
    }

    #[instrument(skip(self, request), fields(recipe_id = %abbrev_uuid(&id)), err)]
    async fn update_recipe(&self, id: RecipeId, request: &RecipeUpdateDBRequest) -> Result<Option<RecipeDBResponse>> {
        let mut tables = self.tables.write();
        if tables.recipe_mut(id).is_none() {
            return Ok(None);
        }
        let tag_ids = tables.resolve_tags(&unique_names(&request.tags));

        let Some(stored) = tables.recipe_mut(id) else {
            return Ok(None);
        };
        stored.row.title = request.title.clone();
        stored.row.image = request.image.clone();
        stored.row.updated_at = Utc::now();
        stored.ingredients = request.ingredients.clone();
        stored.tag_ids = tag_ids;

        Ok(tables.recipe_views(tables.recipes.iter().filter(|stored| stored.row.id == id)).pop())
    }

    #[instrument(skip(self), fields(recipe_id = %abbrev_uuid(&id)), err)]
    async fn delete_recipe(&self, id: RecipeId) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.recipes.len();
        tables.recipes.retain(|stored| stored.row.id != id);
        Ok(tables.recipes.len() < before)
    }

    async fn add_like(&self, id: RecipeId) -> Result<Option<i64>> {
        let mut tables = self.tables.write();
        Ok(tables.recipe_mut(id).map(|stored| {
            stored.row.likes += 1;
            stored.row.updated_at = Utc::now();
            stored.row.likes
        }))
    }

    async fn search_recipes(&self, search: &RecipeSearch) -> Result<Vec<RecipeDBResponse>> {
        let tables = self.tables.read();
        let wanted: Vec<TagId> = tables
            .tags
            .iter()
            .filter(|(_, name)| search.tags.contains(name))
            .map(|(id, _)| *id)
            .collect();

        let matching = tables.recipes.iter().filter(|stored| {
            let tags_match = search.tags.is_empty() || stored.tag_ids.iter().any(|id| wanted.contains(id));
            let title_match = search.title.as_ref().is_none_or(|title| &stored.row.title == title);
            tags_match && title_match
        });
        Ok(tables.recipe_views(matching))
    }
}

#[async_trait]
impl CommentStore for InMemoryStore {
    async fn create_comment(&self, request: &CommentCreateDBRequest) -> Result<CommentDBResponse> {
        let now = Utc::now();
        let comment = CommentDBResponse {
            id: Uuid::new_v4(),
            comment: request.comment.clone(),
            owner: request.owner.clone(),
            recipe_id: request.recipe_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables.write().comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<CommentDBResponse>> {
        Ok(self.tables.read().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(&self, filter: &CommentFilter) -> Result<Vec<CommentDBResponse>> {
        Ok(self
            .tables
            .read()
            .comments
            .iter()
            .filter(|c| filter.owner.as_ref().is_none_or(|owner| &c.owner == owner))
            .filter(|c| filter.recipe_id.as_ref().is_none_or(|recipe_id| &c.recipe_id == recipe_id))
            .cloned()
            .collect())
    }

    async fn update_comment(&self, id: CommentId, request: &CommentUpdateDBRequest) -> Result<Option<CommentDBResponse>> {
        let mut tables = self.tables.write();
        Ok(tables.comments.iter_mut().find(|c| c.id == id).map(|c| {
            c.comment = request.comment.clone();
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        Ok(tables.comments.len() < before)
    }
}
