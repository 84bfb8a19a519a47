//! Tag lookups and the recipe/user association tables.
//!
//! Tags are never updated or deleted here; only association rows come and go.

use std::collections::HashMap;

use anyhow::anyhow;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

use crate::db::errors::{DbError, Result};
use crate::types::{RecipeId, TagId, UserId, abbrev_uuid};

pub struct Tags<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Tags<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Find or create a tag per name. Ids come back in the order of `names`, which must not
    /// contain duplicates.
    #[instrument(skip(self, names), fields(count = names.len()), err)]
    pub async fn resolve(&mut self, names: &[String]) -> Result<Vec<TagId>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let candidate_ids: Vec<Uuid> = names.iter().map(|_| Uuid::new_v4()).collect();
        sqlx::query(
            r#"
            INSERT INTO tags (id, name)
            SELECT * FROM UNNEST($1::uuid[], $2::text[])
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(candidate_ids.as_slice())
        .bind(names)
        .execute(&mut *self.db)
        .await?;

        let rows: Vec<(TagId, String)> = sqlx::query_as("SELECT id, name FROM tags WHERE name = ANY($1)")
            .bind(names)
            .fetch_all(&mut *self.db)
            .await?;
        let by_name: HashMap<String, TagId> = rows.into_iter().map(|(id, name)| (name, id)).collect();

        names
            .iter()
            .map(|name| {
                by_name
                    .get(name)
                    .copied()
                    .ok_or_else(|| DbError::Other(anyhow!("tag {name:?} missing after upsert")))
            })
            .collect()
    }

    #[instrument(skip(self, tag_ids), fields(recipe_id = %abbrev_uuid(&recipe_id), count = tag_ids.len()), err)]
    pub async fn attach_to_recipe(&mut self, recipe_id: RecipeId, tag_ids: &[TagId]) -> Result<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }
        let positions: Vec<i32> = (0..tag_ids.len() as i32).collect();

        sqlx::query(
            r#"
            INSERT INTO recipe_tags (recipe_id, tag_id, position)
            SELECT $1, t.tag_id, t.position FROM UNNEST($2::uuid[], $3::int4[]) AS t(tag_id, position)
            "#,
        )
        .bind(recipe_id)
        .bind(tag_ids)
        .bind(positions.as_slice())
        .execute(&mut *self.db)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(recipe_id = %abbrev_uuid(&recipe_id)), err)]
    pub async fn detach_from_recipe(&mut self, recipe_id: RecipeId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// `(recipe id, tag name)` pairs for every recipe in `ids`, in tag position order
    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    pub async fn names_for_recipes(&mut self, ids: &[RecipeId]) -> Result<Vec<(RecipeId, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as(
            r#"
            SELECT rt.recipe_id, t.name
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY rt.recipe_id, rt.position
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self, tag_ids), fields(user_id = %abbrev_uuid(&user_id), count = tag_ids.len()), err)]
    pub async fn attach_to_user(&mut self, user_id: UserId, tag_ids: &[TagId]) -> Result<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }
        let positions: Vec<i32> = (0..tag_ids.len() as i32).collect();

        sqlx::query(
            r#"
            INSERT INTO user_tags (user_id, tag_id, position)
            SELECT $1, t.tag_id, t.position FROM UNNEST($2::uuid[], $3::int4[]) AS t(tag_id, position)
            "#,
        )
        .bind(user_id)
        .bind(tag_ids)
        .bind(positions.as_slice())
        .execute(&mut *self.db)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn detach_from_user(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_tags WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// `(user id, tag name)` pairs for every user in `ids`, in tag position order
    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    pub async fn names_for_users(&mut self, ids: &[UserId]) -> Result<Vec<(UserId, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as(
            r#"
            SELECT ut.user_id, t.name
            FROM user_tags ut
            JOIN tags t ON t.id = ut.tag_id
            WHERE ut.user_id = ANY($1)
            ORDER BY ut.user_id, ut.position
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }
}
