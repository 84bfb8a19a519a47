//! Authentication.
//!
//! Callers authenticate with a bearer token in the `Authorization` header. Two kinds of token are
//! accepted on protected routes:
//!
//! ## 1. Access tokens
//!
//! Short-lived HS256 JWTs minted by `/auth/login`, `/auth/refresh` and `/auth/google`. Verified
//! statelessly against `secret_key`.
//!
//! ## 2. Identity provider ID tokens
//!
//! A Google ID token is accepted as a fallback when the caller already has a local account with
//! the token's email address. The token's signature is checked against Google's published keys.
//!
//! Refresh tokens are never accepted on protected routes. They are single use: each refresh or
//! logout consumes one, and presenting one that was already consumed revokes all of the user's
//! refresh tokens.
//!
//! # Modules
//!
//! - [`current_user`]: the [`CurrentUser`](current_user::CurrentUser) extractor
//! - [`identity`]: identity provider token verification
//! - [`password`]: password hashing and policy using Argon2
//! - [`tokens`]: access/refresh token issuance and rotation
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use cookbook::auth::current_user::CurrentUser;
//!
//! async fn protected_handler(current_user: CurrentUser) -> String {
//!     format!("Hello, {}!", current_user.id)
//! }
//! ```

pub mod current_user;
pub mod identity;
pub mod password;
pub mod tokens;
