//! Test utilities for integration testing
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{Value, json};

use crate::{
    AppState, build_router,
    api::models::{auth::TokenResponse, recipes::RecipePayload, users::UserResponse},
    auth::identity::{IdentityClaims, IdentityProvider},
    config::{Config, DatabaseConfig, PasswordConfig},
    db::InMemoryStore,
    random_recipe::RecipeSource,
};

pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub fn create_test_config() -> Config {
    Config {
        database: DatabaseConfig::InMemory,
        secret_key: Some("test-secret-key-for-jwt".to_string()),
        auth: crate::config::AuthConfig {
            password: PasswordConfig {
                min_length: 8,
                max_length: 64,
                // Cheap hashing keeps the HTTP tests fast
                argon2_memory_kib: 128,
                argon2_iterations: 1,
                argon2_parallelism: 1,
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Identity provider that accepts a single known token
#[derive(Default)]
pub struct StubIdentityProvider {
    accepted: Option<(String, IdentityClaims)>,
}

impl StubIdentityProvider {
    pub fn rejecting() -> Self {
        Self::default()
    }

    pub fn accepting(token: &str, claims: IdentityClaims) -> Self {
        Self {
            accepted: Some((token.to_string(), claims)),
        }
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn verify(&self, token: &str) -> anyhow::Result<IdentityClaims> {
        match &self.accepted {
            Some((accepted, claims)) if accepted == token => Ok(claims.clone()),
            _ => anyhow::bail!("token rejected by stub identity provider"),
        }
    }
}

/// Recipe source returning a fixed payload, or failing when there is none
#[derive(Default)]
pub struct StubRecipeSource {
    payload: Option<RecipePayload>,
}

impl StubRecipeSource {
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn returning(payload: RecipePayload) -> Self {
        Self { payload: Some(payload) }
    }
}

#[async_trait]
impl RecipeSource for StubRecipeSource {
    async fn fetch(&self) -> anyhow::Result<RecipePayload> {
        self.payload
            .clone()
            .ok_or_else(|| anyhow::anyhow!("stub recipe source is down"))
    }
}

pub fn create_test_state() -> AppState {
    AppState::builder()
        .store(Arc::new(InMemoryStore::new()))
        .config(create_test_config())
        .identity(Arc::new(StubIdentityProvider::rejecting()))
        .recipe_source(Arc::new(StubRecipeSource::failing()))
        .build()
}

pub fn create_test_server(state: AppState) -> TestServer {
    TestServer::new(build_router(state)).expect("Failed to create test server")
}

pub fn create_test_app() -> TestServer {
    create_test_server(create_test_state())
}

/// `Authorization` header name and value for a bearer token
pub fn bearer(token: &str) -> (String, String) {
    ("authorization".to_string(), format!("Bearer {token}"))
}

pub async fn register_user(server: &TestServer, email: &str, tags: &[&str]) -> UserResponse {
    let response = server
        .post("/auth/register")
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "name": "Test",
            "tags": tags,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<UserResponse>()
}

pub async fn login_user(server: &TestServer, email: &str) -> TokenResponse {
    let response = server
        .post("/auth/login")
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .await;
    response.assert_status_ok();
    response.json::<TokenResponse>()
}

/// Register then log in, returning the fresh tokens
pub async fn signed_in_user(server: &TestServer, email: &str) -> TokenResponse {
    register_user(server, email, &[]).await;
    login_user(server, email).await
}

pub fn recipe_body(title: &str, ingredients: &[&str], tags: &[&str]) -> Value {
    json!({ "title": title, "ingredients": ingredients, "tags": tags })
}
