//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication checks, through the [`CurrentUser`](crate::auth::current_user::CurrentUser) extractor
//! - Business logic execution via the [`Store`](crate::db::Store)
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Registration, login, logout, token refresh and Google sign-in
//! - [`recipes`]: The recipe aggregate, likes, search and random recipes
//! - [`comments`]: Comment CRUD and per-recipe listings
//! - [`users`]: Profiles, profile updates and user tags
//! - [`health`]: Liveness probe
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and `{"message": ...}` bodies.

pub mod auth;
pub mod comments;
pub mod health;
pub mod recipes;
pub mod users;
