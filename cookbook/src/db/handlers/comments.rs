//! Database repository for comments.

use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::comments::{CommentCreateDBRequest, CommentDBResponse, CommentFilter, CommentUpdateDBRequest},
};
use crate::types::{CommentId, abbrev_uuid};

const COMMENT_COLUMNS: &str = "id, comment, owner, recipe_id, created_at, updated_at";

pub struct Comments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Comments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Comments<'c> {
    type CreateRequest = CommentCreateDBRequest;
    type UpdateRequest = CommentUpdateDBRequest;
    type Response = CommentDBResponse;
    type Id = CommentId;
    type Filter = CommentFilter;

    #[instrument(skip(self, request), fields(recipe_id = %request.recipe_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let comment = sqlx::query_as(&format!(
            "INSERT INTO comments (id, comment, owner, recipe_id) VALUES ($1, $2, $3, $4) RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&request.comment)
        .bind(&request.owner)
        .bind(&request.recipe_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(comment)
    }

    #[instrument(skip(self), fields(comment_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let comment = sqlx::query_as(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(comment)
    }

    #[instrument(skip(self, filter), fields(owner = ?filter.owner, recipe_id = ?filter.recipe_id), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let comments = sqlx::query_as(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE ($1::text IS NULL OR owner = $1)
              AND ($2::text IS NULL OR recipe_id = $2)
            ORDER BY seq
            "#
        ))
        .bind(&filter.owner)
        .bind(&filter.recipe_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(comments)
    }

    #[instrument(skip(self), fields(comment_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(comment_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let comment = sqlx::query_as(&format!(
            "UPDATE comments SET comment = $2, updated_at = NOW() WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(&request.comment)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn comment(owner: &str, recipe_id: &str, text: &str) -> CommentCreateDBRequest {
        CommentCreateDBRequest {
            comment: text.to_string(),
            owner: owner.to_string(),
            recipe_id: recipe_id.to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_comment_lifecycle(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Comments::new(&mut conn);

        let first = repo.create(&comment("alice", "r1", "Lovely")).await.unwrap();
        repo.create(&comment("bob", "r1", "Too salty")).await.unwrap();
        repo.create(&comment("alice", "r2", "Great")).await.unwrap();

        let for_recipe = repo
            .list(&CommentFilter {
                recipe_id: Some("r1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(for_recipe.iter().map(|c| c.comment.as_str()).collect::<Vec<_>>(), vec!["Lovely", "Too salty"]);

        let by_alice = repo
            .list(&CommentFilter {
                owner: Some("alice".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_alice.len(), 2);

        let updated = repo
            .update(
                first.id,
                &CommentUpdateDBRequest {
                    comment: "Lovely, again".to_string(),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.comment, "Lovely, again");

        assert!(repo.delete(first.id).await.unwrap());
        assert!(repo.get_by_id(first.id).await.unwrap().is_none());
        assert!(!repo.delete(first.id).await.unwrap());
    }
}
