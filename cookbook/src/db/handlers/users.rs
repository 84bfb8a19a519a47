//! Database repository for users and their refresh tokens.

use std::collections::HashMap;

use crate::types::{UserId, abbrev_uuid};
use crate::db::{
    errors::Result,
    handlers::{repository::Repository, tags::Tags},
    models::{
        recipes::unique_names,
        users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub background: Option<String>,
    pub image: Option<String>,
    pub profile: Option<String>,
    pub google_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, email, password_hash, name, last_name, background, image, profile, google_id, created_at, updated_at";

impl From<(Vec<String>, User)> for UserDBResponse {
    fn from((tags, user): (Vec<String>, User)) -> Self {
        Self {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            last_name: user.last_name,
            background: user.background,
            image: user.image,
            profile: user.profile,
            google_id: user.google_id,
            tags,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Attach tag names to a batch of user rows, preserving row order
    async fn with_tags(&mut self, users: Vec<User>) -> Result<Vec<UserDBResponse>> {
        let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
        let mut tags_by_user: HashMap<UserId, Vec<String>> = HashMap::new();
        for (user_id, name) in Tags::new(&mut *self.db).names_for_users(&ids).await? {
            tags_by_user.entry(user_id).or_default().push(name);
        }

        Ok(users
            .into_iter()
            .map(|user| {
                let tags = tags_by_user.remove(&user.id).unwrap_or_default();
                UserDBResponse::from((tags, user))
            })
            .collect())
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user: Option<User> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        match user {
            Some(user) => Ok(self.with_tags(vec![user]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Append a refresh token fingerprint to the user's list of valid tokens
    #[instrument(skip(self, fingerprint), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn push_refresh_token(&mut self, user_id: UserId, fingerprint: &str) -> Result<()> {
        sqlx::query("INSERT INTO refresh_tokens (user_id, fingerprint) VALUES ($1, $2)")
            .bind(user_id)
            .bind(fingerprint)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// Remove a fingerprint from the list. Returns false if it was not there.
    ///
    /// This is a single conditional delete, so two concurrent refreshes with the same token
    /// cannot both succeed.
    #[instrument(skip(self, fingerprint), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn consume_refresh_token(&mut self, user_id: UserId, fingerprint: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND fingerprint = $2")
            .bind(user_id)
            .bind(fingerprint)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn clear_refresh_tokens(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Stored fingerprints, oldest first
    #[cfg(test)]
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn refresh_tokens(&mut self, user_id: UserId) -> Result<Vec<String>> {
        let fingerprints = sqlx::query_scalar("SELECT fingerprint FROM refresh_tokens WHERE user_id = $1 ORDER BY seq")
            .bind(user_id)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(fingerprints)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user_id = Uuid::new_v4();
        let tag_names = unique_names(&request.tags);

        let mut tx = self.db.begin().await?;
        let user: User = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, last_name, background, image, profile, google_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(&request.name)
        .bind(&request.last_name)
        .bind(&request.background)
        .bind(&request.image)
        .bind(&request.profile)
        .bind(&request.google_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut tags = Tags::new(&mut tx);
        let tag_ids = tags.resolve(&tag_names).await?;
        tags.attach_to_user(user_id, &tag_ids).await?;

        tx.commit().await?;

        Ok(UserDBResponse::from((tag_names, user)))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user: Option<User> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        match user {
            Some(user) => Ok(self.with_tags(vec![user]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users: Vec<User> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE ($1::text IS NULL OR email = $1) ORDER BY created_at, id"
        ))
        .bind(&filter.email)
        .fetch_all(&mut *self.db)
        .await?;

        self.with_tags(users).await
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let exists: Option<UserId> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        Tags::new(&mut tx).detach_from_user(id).await?;
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(true)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let mut tx = self.db.begin().await?;

        let user: Option<User> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                last_name = COALESCE($3, last_name),
                background = COALESCE($4, background),
                image = COALESCE($5, image),
                profile = COALESCE($6, profile),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.name)
        .bind(&request.last_name)
        .bind(&request.background)
        .bind(&request.image)
        .bind(&request.profile)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        if let Some(new_tags) = &request.tags {
            let tag_names = unique_names(new_tags);
            let mut tags = Tags::new(&mut tx);
            tags.detach_from_user(id).await?;
            let tag_ids = tags.resolve(&tag_names).await?;
            tags.attach_to_user(id, &tag_ids).await?;
        }

        let updated = Users::new(&mut tx).with_tags(vec![user]).await?.pop();
        tx.commit().await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use sqlx::PgPool;

    fn create_request(email: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            email: email.to_string(),
            password_hash: Some("hash".to_string()),
            name: Some("Ada".to_string()),
            tags: vec!["Baker".to_string(), "Vegan".to_string()],
            ..Default::default()
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("a@x.com")).await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.tags, vec!["Baker", "Vegan"]);

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched, user);

        let by_email = repo.get_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_is_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("a@x.com")).await.unwrap();
        let err = repo.create(&create_request("a@x.com")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { table: Some(ref t), .. } if t == "users"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_refresh_token_list(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        let user = repo.create(&create_request("a@x.com")).await.unwrap();

        repo.push_refresh_token(user.id, "one").await.unwrap();
        repo.push_refresh_token(user.id, "two").await.unwrap();
        assert_eq!(repo.refresh_tokens(user.id).await.unwrap(), vec!["one", "two"]);

        assert!(repo.consume_refresh_token(user.id, "one").await.unwrap());
        assert!(!repo.consume_refresh_token(user.id, "one").await.unwrap());
        assert_eq!(repo.refresh_tokens(user.id).await.unwrap(), vec!["two"]);

        assert_eq!(repo.clear_refresh_tokens(user.id).await.unwrap(), 1);
        assert!(repo.refresh_tokens(user.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_delete_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        let user = repo.create(&create_request("a@x.com")).await.unwrap();
        repo.push_refresh_token(user.id, "one").await.unwrap();

        let update = UserUpdateDBRequest {
            profile: Some("Loves bread".to_string()),
            tags: Some(vec!["Chef".to_string()]),
            ..Default::default()
        };
        let updated = repo.update(user.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.profile.as_deref(), Some("Loves bread"));
        assert_eq!(updated.name.as_deref(), Some("Ada"));
        assert_eq!(updated.tags, vec!["Chef"]);

        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
        assert!(repo.update(user.id, &update).await.unwrap().is_none());

        let leftover: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_tags").fetch_one(&pool).await.unwrap();
        assert_eq!(leftover, 0);
    }
}
