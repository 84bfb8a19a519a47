//! Postgres repositories.
//!
//! Each repository:
//! - Wraps a borrowed SQLx connection or transaction
//! - Provides strongly-typed CRUD operations
//! - Returns models from [`crate::db::models`]
//! - Opens its own nested transaction for multi-statement writes
//!
//! # Available Repositories
//!
//! - [`Users`]: accounts, user tags and the refresh-token list
//! - [`Recipes`]: the recipe aggregate
//! - [`Tags`]: tag find-or-create and association rows (used by the two above)
//! - [`Comments`]: free standing comments
//!
//! # Common Pattern
//!
//! ```ignore
//! use cookbook::db::handlers::{Recipes, Repository};
//!
//! async fn example(pool: &sqlx::PgPool, id: uuid::Uuid) -> anyhow::Result<()> {
//!     let mut conn = pool.acquire().await?;
//!     let recipe = Recipes::new(&mut conn).get_by_id(id).await?;
//!     Ok(())
//! }
//! ```

pub mod comments;
pub mod recipes;
pub mod repository;
pub mod tags;
pub mod users;

pub use comments::Comments;
pub use recipes::Recipes;
pub use repository::Repository;
pub use tags::Tags;
pub use users::Users;
