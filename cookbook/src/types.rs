//! Identifier aliases shared across the crate.
//!
//! All entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`]: registered account
//! - [`RecipeId`]: recipe core row
//! - [`TagId`]: deduplicated tag label
//! - [`CommentId`]: free standing comment

use uuid::Uuid;

pub type UserId = Uuid;
pub type RecipeId = Uuid;
pub type TagId = Uuid;
pub type CommentId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
