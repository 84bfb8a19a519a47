//! Store record models.
//!
//! These structs are what the store backends accept and return. They are distinct from the API
//! models in [`crate::api::models`] so the wire format and the storage layout can evolve
//! independently.
//!
//! - [`users`]: accounts, profile fields and user tags
//! - [`recipes`]: the recipe aggregate (core row, ingredients, tags)
//! - [`comments`]: free standing comments

pub mod comments;
pub mod recipes;
pub mod users;
