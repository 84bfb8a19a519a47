//! API request and response models.

pub mod auth;
pub mod comments;
pub mod pagination;
pub mod recipes;
pub mod users;
