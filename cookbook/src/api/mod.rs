//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//! - **[`extract`]**: Body, path and query extractors whose rejections use the API error shape
//!
//! # API Structure
//!
//! - **Authentication** (`/auth/*`): register, login, logout, token refresh, Google sign-in
//! - **Recipes** (`/recipes/*`): the recipe aggregate, likes, search and random recipes
//! - **Comments** (`/comments/*`): free standing comments on recipes
//! - **Users** (`/users/*`): profiles and user tags

pub mod extract;
pub mod handlers;
pub mod models;
