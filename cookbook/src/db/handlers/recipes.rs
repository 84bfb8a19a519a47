//! Database repository for the recipe aggregate.
//!
//! Reads fetch one page of core rows and then hydrate it with one batched query for ingredients
//! and one for tag names. Writes touch the core row, the ingredient rows and the recipe-tag rows
//! inside a single transaction.

use sqlx::{Connection, PgConnection};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    errors::{DbError, Result},
    handlers::{repository::Repository, tags::Tags},
    models::recipes::{
        RecipeCreateDBRequest, RecipeDBResponse, RecipeFilter, RecipeRow, RecipeSearch, RecipeUpdateDBRequest, assemble, unique_names,
    },
};
use crate::types::{RecipeId, abbrev_uuid};

const RECIPE_COLUMNS: &str = "id, owner, title, image, likes, created_at, updated_at";

pub struct Recipes<'c> {
    db: &'c mut PgConnection,
}

async fn insert_ingredients(conn: &mut PgConnection, recipe_id: RecipeId, names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    let positions: Vec<i32> = (0..names.len() as i32).collect();

    sqlx::query(
        r#"
        INSERT INTO ingredients (recipe_id, position, name)
        SELECT $1, t.position, t.name FROM UNNEST($2::int4[], $3::text[]) AS t(position, name)
        "#,
    )
    .bind(recipe_id)
    .bind(positions.as_slice())
    .bind(names)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn delete_ingredients(conn: &mut PgConnection, recipe_id: RecipeId) -> Result<u64> {
    let result = sqlx::query("DELETE FROM ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Write ingredient rows, find-or-create tags and link them. Returns the stored tag names.
async fn write_associations(conn: &mut PgConnection, recipe_id: RecipeId, ingredients: &[String], tags: &[String]) -> Result<Vec<String>> {
    insert_ingredients(&mut *conn, recipe_id, ingredients).await?;

    let tag_names = unique_names(tags);
    let mut tags = Tags::new(conn);
    let tag_ids = tags.resolve(&tag_names).await?;
    tags.attach_to_recipe(recipe_id, &tag_ids).await?;
    Ok(tag_names)
}

impl<'c> Recipes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Batch-load ingredients and tags for a set of core rows
    async fn hydrate(&mut self, rows: Vec<RecipeRow>) -> Result<Vec<RecipeDBResponse>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<RecipeId> = rows.iter().map(|r| r.id).collect();

        let ingredients: Vec<(RecipeId, String)> =
            sqlx::query_as("SELECT recipe_id, name FROM ingredients WHERE recipe_id = ANY($1) ORDER BY recipe_id, position")
                .bind(ids.as_slice())
                .fetch_all(&mut *self.db)
                .await?;
        let tags = Tags::new(&mut *self.db).names_for_recipes(&ids).await?;

        Ok(assemble(rows, ingredients, tags))
    }

    /// Number of recipes matching the filter's owner constraint
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &RecipeFilter) -> Result<i64> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE ($1::uuid IS NULL OR owner = $1)")
            .bind(filter.owner)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(total)
    }

    /// Atomically bump the like counter, returning the new value
    #[instrument(skip(self), fields(recipe_id = %abbrev_uuid(&id)), err)]
    pub async fn add_like(&mut self, id: RecipeId) -> Result<Option<i64>> {
        let likes = sqlx::query_scalar("UPDATE recipes SET likes = likes + 1, updated_at = NOW() WHERE id = $1 RETURNING likes")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(likes)
    }

    /// Recipes carrying any of the tags, narrowed to an exact title when one is given
    #[instrument(skip(self, search), fields(tags = search.tags.len(), title = ?search.title), err)]
    pub async fn search(&mut self, search: &RecipeSearch) -> Result<Vec<RecipeDBResponse>> {
        let tags = (!search.tags.is_empty()).then_some(search.tags.as_slice());

        let rows: Vec<RecipeRow> = sqlx::query_as(&format!(
            r#"
            SELECT {RECIPE_COLUMNS} FROM recipes r
            WHERE ($1::text[] IS NULL OR EXISTS (
                    SELECT 1 FROM recipe_tags rt
                    JOIN tags t ON t.id = rt.tag_id
                    WHERE rt.recipe_id = r.id AND t.name = ANY($1)))
              AND ($2::text IS NULL OR r.title = $2)
            ORDER BY r.seq
            "#
        ))
        .bind(tags)
        .bind(&search.title)
        .fetch_all(&mut *self.db)
        .await?;

        self.hydrate(rows).await
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Recipes<'c> {
    type CreateRequest = RecipeCreateDBRequest;
    type UpdateRequest = RecipeUpdateDBRequest;
    type Response = RecipeDBResponse;
    type Id = RecipeId;
    type Filter = RecipeFilter;

    #[instrument(skip(self, request), fields(owner = %abbrev_uuid(&request.owner)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let recipe_id = Uuid::new_v4();

        let mut tx = self.db.begin().await?;
        let row: RecipeRow = sqlx::query_as(&format!(
            "INSERT INTO recipes (id, owner, title, image) VALUES ($1, $2, $3, $4) RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(recipe_id)
        .bind(request.owner)
        .bind(&request.title)
        .bind(&request.image)
        .fetch_one(&mut *tx)
        .await?;

        let tag_names = write_associations(&mut tx, recipe_id, &request.ingredients, &request.tags).await?;
        tx.commit().await?;

        let ingredients = request.ingredients.iter().map(|name| (recipe_id, name.clone())).collect();
        let tags = tag_names.into_iter().map(|name| (recipe_id, name)).collect();
        assemble(vec![row], ingredients, tags).pop().ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(recipe_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let row: Option<RecipeRow> = sqlx::query_as(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let rows: Vec<RecipeRow> = sqlx::query_as(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE ($1::uuid IS NULL OR owner = $1) ORDER BY seq LIMIT $2 OFFSET $3"
        ))
        .bind(filter.owner)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        self.hydrate(rows).await
    }

    #[instrument(skip(self), fields(recipe_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let exists: Option<RecipeId> = sqlx::query_scalar("SELECT id FROM recipes WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        delete_ingredients(&mut tx, id).await?;
        Tags::new(&mut tx).detach_from_recipe(id).await?;
        sqlx::query("DELETE FROM recipes WHERE id = $1").bind(id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(true)
    }

    #[instrument(skip(self, request), fields(recipe_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let mut tx = self.db.begin().await?;

        let row: Option<RecipeRow> = sqlx::query_as(&format!(
            "UPDATE recipes SET title = $2, image = $3, updated_at = NOW() WHERE id = $1 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(&request.title)
        .bind(&request.image)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        delete_ingredients(&mut tx, id).await?;
        Tags::new(&mut tx).detach_from_recipe(id).await?;
        let tag_names = write_associations(&mut tx, id, &request.ingredients, &request.tags).await?;
        tx.commit().await?;

        let ingredients = request.ingredients.iter().map(|name| (id, name.clone())).collect();
        let tags = tag_names.into_iter().map(|name| (id, name)).collect();
        Ok(assemble(vec![row], ingredients, tags).pop())
    }
}
