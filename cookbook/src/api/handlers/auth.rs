use axum::{extract::State, http::StatusCode};
use tracing::{info, warn};

use crate::{
    AppState,
    api::{
        extract::Json,
        models::{
            auth::{GoogleLoginRequest, LoginRequest, MessageResponse, RefreshRequest, RegisterRequest, TokenResponse},
            users::UserResponse,
        },
    },
    auth::{
        identity::IdentityProvider,
        password::{self, Argon2Params},
        tokens,
    },
    db::{UserStore, models::users::UserCreateDBRequest},
    errors::{Error, Result},
    types::{UserId, abbrev_uuid},
};

/// Mint a token pair and put the refresh token on the user's list
async fn start_session(state: &AppState, user_id: UserId) -> Result<TokenResponse> {
    let pair = tokens::issue_token_pair(user_id, &state.config)?;
    state
        .store
        .push_refresh_token(user_id, &tokens::fingerprint(&pair.refresh_token))
        .await?;
    Ok(TokenResponse::new(user_id, pair))
}

fn wrong_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Wrong email or password".to_string()),
    }
}

/// Register a new user account
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<(StatusCode, Json<UserResponse>)> {
    let email = request.email.trim().to_string();
    if email.is_empty() {
        return Err(Error::BadRequest {
            message: "Email is required".to_string(),
        });
    }
    if request.tags.iter().any(|name| name.trim().is_empty()) {
        return Err(Error::BadRequest {
            message: "Tag names must not be blank".to_string(),
        });
    }

    let password_config = &state.config.auth.password;
    password::validate_password(&request.password, password_config)?;

    // A racing insert still trips the unique constraint and answers 409
    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(Error::BadRequest {
            message: "An account with this email address already exists".to_string(),
        });
    }

    let password_hash = password::hash_password_blocking(request.password, Argon2Params::from(password_config)).await?;

    let user = state
        .store
        .create_user(&UserCreateDBRequest {
            email,
            password_hash: Some(password_hash),
            name: request.name,
            last_name: request.last_name,
            background: request.background,
            image: request.image,
            profile: request.profile,
            google_id: None,
            tags: request.tags,
        })
        .await?;

    info!(user_id = %abbrev_uuid(&user.id), "Registered user");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Log in with email and password
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<TokenResponse>> {
    let user = state
        .store
        .get_user_by_email(request.email.trim())
        .await?
        .ok_or_else(wrong_credentials)?;

    // Accounts created through Google sign-in have no password
    let hash = user.password_hash.clone().ok_or_else(wrong_credentials)?;
    if !password::verify_password_blocking(request.password, hash).await? {
        return Err(wrong_credentials());
    }

    Ok(Json(start_session(&state, user.id).await?))
}

/// Log out, consuming the refresh token
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, Json(request): Json<RefreshRequest>) -> Result<Json<MessageResponse>> {
    let user = tokens::verify_refresh_token(&request.refresh_token, &state.config, state.store.as_ref()).await?;
    info!(user_id = %abbrev_uuid(&user.id), "Logged out");

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// Exchange a refresh token for a new token pair
#[tracing::instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, Json(request): Json<RefreshRequest>) -> Result<Json<TokenResponse>> {
    let user = tokens::verify_refresh_token(&request.refresh_token, &state.config, state.store.as_ref()).await?;
    Ok(Json(start_session(&state, user.id).await?))
}

/// Sign in with a Google ID token, creating the account on first use
#[tracing::instrument(skip_all)]
pub async fn google_login(State(state): State<AppState>, Json(request): Json<GoogleLoginRequest>) -> Result<Json<TokenResponse>> {
    let claims = state.identity.verify(&request.credential).await.map_err(|e| {
        warn!("Google login failed: {e:#}");
        Error::Unauthenticated {
            message: Some("Google login failed".to_string()),
        }
    })?;

    let user = match state.store.get_user_by_email(&claims.email).await? {
        Some(user) => user,
        None => {
            let user = state
                .store
                .create_user(&UserCreateDBRequest {
                    email: claims.email,
                    name: claims.name,
                    image: claims.picture,
                    google_id: Some(claims.subject),
                    ..Default::default()
                })
                .await?;
            info!(user_id = %abbrev_uuid(&user.id), "Created user from Google sign-in");
            user
        }
    };

    Ok(Json(start_session(&state, user.id).await?))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            auth::{MessageResponse, TokenResponse},
            users::UserResponse,
        },
        auth::identity::IdentityClaims,
        db::UserStore,
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[test_log::test(tokio::test)]
    async fn test_register_returns_user_without_credentials() {
        let server = create_test_app();

        let response = server
            .post("/auth/register")
            .json(&json!({
                "email": "cook@example.com",
                "password": TEST_PASSWORD,
                "name": "Ada",
                "lastName": "Cook",
                "tags": ["Vegan", "Quick"],
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["email"], "cook@example.com");
        assert_eq!(body["lastName"], "Cook");
        assert_eq!(body["tags"], json!(["Vegan", "Quick"]));
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("refreshTokens").is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_short_passwords() {
        let server = create_test_app();
        register_user(&server, "cook@example.com", &[]).await;

        let response = server
            .post("/auth/register")
            .json(&json!({ "email": "cook@example.com", "password": TEST_PASSWORD }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<MessageResponse>().message,
            "An account with this email address already exists"
        );

        let response = server
            .post("/auth/register")
            .json(&json!({ "email": "other@example.com", "password": "short" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<MessageResponse>().message, "Password must be at least 8 characters long");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let server = create_test_app();
        let response = server.post("/auth/register").json(&json!({ "password": TEST_PASSWORD })).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["message"].is_string());
    }

    #[tokio::test]
    async fn test_login_success_and_failures() {
        let server = create_test_app();
        let user = register_user(&server, "cook@example.com", &[]).await;

        let tokens = login_user(&server, "cook@example.com").await;
        assert_eq!(tokens.user_id, user.id);
        assert!(!tokens.access_token.is_empty());

        for body in [
            json!({ "email": "cook@example.com", "password": "not-the-password" }),
            json!({ "email": "nobody@example.com", "password": TEST_PASSWORD }),
        ] {
            let response = server.post("/auth/login").json(&body).await;
            response.assert_status(StatusCode::UNAUTHORIZED);
            assert_eq!(response.json::<MessageResponse>().message, "Wrong email or password");
        }
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_reuse_revokes_everything() {
        let state = create_test_state();
        let server = create_test_server(state.clone());
        let first = signed_in_user(&server, "cook@example.com").await;
        let second = login_user(&server, "cook@example.com").await;

        let response = server
            .post("/auth/refresh")
            .json(&json!({ "refreshToken": first.refresh_token }))
            .await;
        response.assert_status_ok();
        let rotated = response.json::<TokenResponse>();
        assert_ne!(rotated.refresh_token, first.refresh_token);
        assert_eq!(state.store.refresh_tokens(first.user_id).await.unwrap().len(), 2);

        // Replaying the consumed token clears every session
        let response = server
            .post("/auth/refresh")
            .json(&json!({ "refreshToken": first.refresh_token }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(state.store.refresh_tokens(first.user_id).await.unwrap().is_empty());

        for token in [second.refresh_token, rotated.refresh_token] {
            server
                .post("/auth/refresh")
                .json(&json!({ "refreshToken": token }))
                .await
                .assert_status(StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_refresh_without_token() {
        let server = create_test_app();
        let response = server.post("/auth/refresh").json(&json!({})).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<MessageResponse>().message, "Invalid refresh token");
    }

    #[tokio::test]
    async fn test_logout_consumes_refresh_token() {
        let server = create_test_app();
        let tokens = signed_in_user(&server, "cook@example.com").await;

        let response = server
            .post("/auth/logout")
            .json(&json!({ "refreshToken": tokens.refresh_token }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<MessageResponse>().message, "Logged out successfully");

        server
            .post("/auth/logout")
            .json(&json!({ "refreshToken": tokens.refresh_token }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_google_login_creates_then_reuses_account() {
        let mut state = create_test_state();
        state.identity = Arc::new(StubIdentityProvider::accepting(
            "google-id-token",
            IdentityClaims {
                subject: "google-sub".to_string(),
                email: "g@example.com".to_string(),
                name: Some("Grace".to_string()),
                picture: Some("https://img/grace.png".to_string()),
            },
        ));
        let server = create_test_server(state.clone());

        let first = server.post("/auth/google").json(&json!({ "credential": "google-id-token" })).await;
        first.assert_status_ok();
        let first = first.json::<TokenResponse>();

        let user = state.store.get_user(first.user_id).await.unwrap().unwrap();
        assert_eq!(user.google_id.as_deref(), Some("google-sub"));
        assert_eq!(user.image.as_deref(), Some("https://img/grace.png"));
        assert!(user.password_hash.is_none());

        let second = server.post("/auth/google").json(&json!({ "credential": "google-id-token" })).await;
        assert_eq!(second.json::<TokenResponse>().user_id, first.user_id);

        // Passwordless accounts cannot use the password login
        server
            .post("/auth/login")
            .json(&json!({ "email": "g@example.com", "password": TEST_PASSWORD }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let fetched = server.get(&format!("/users/{}", first.user_id)).await.json::<UserResponse>();
        assert_eq!(fetched.name.as_deref(), Some("Grace"));
    }

    #[tokio::test]
    async fn test_google_login_rejected() {
        let server = create_test_app();
        let response = server.post("/auth/google").json(&json!({ "credential": "forged" })).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<MessageResponse>().message, "Google login failed");
    }
}
