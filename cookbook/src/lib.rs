//! # cookbook: a recipe sharing backend
//!
//! Users register, sign in (password or Google), publish recipes with ingredients and tags, like
//! recipes and comment on them.
//!
//! ## Architecture
//!
//! The HTTP layer is built on [Axum](https://github.com/tokio-rs/axum). Handlers never talk to a
//! database driver; they go through the [`db::Store`] held in [`AppState`], which is either
//! PostgreSQL (the bundled migrations are applied on startup) or a process-local in-memory store.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) exposes `/auth`, `/recipes`, `/comments` and `/users`. JSON bodies
//! use camelCase, and every error answers `{"message": ...}` (see [`errors`]).
//!
//! The **authentication layer** ([`auth`]) issues access/refresh token pairs, rotates refresh tokens
//! with revoke-all-on-reuse, verifies Google ID tokens and provides the
//! [`CurrentUser`](auth::current_user::CurrentUser) extractor for protected routes.
//!
//! The **database layer** ([`db`]) stores a recipe as a core row plus ingredient and tag
//! association rows, and reassembles the denormalized view on every read.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use cookbook::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     cookbook::install_crypto_provider();
//!     let args = cookbook::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     cookbook::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config).await?.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod random_recipe;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};

use crate::{
    auth::identity::{GoogleIdentityProvider, IdentityProvider},
    config::DatabaseConfig,
    db::{InMemoryStore, PgStore, Store},
    random_recipe::{MealDbClient, RecipeSource},
};

pub use config::Config;
pub use types::{CommentId, RecipeId, TagId, UserId};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .store(Arc::new(InMemoryStore::new()))
///     .config(config)
///     .identity(Arc::new(GoogleIdentityProvider::new(&config.auth.google)?))
///     .recipe_source(Arc::new(MealDbClient::new(&config.random_recipe)?))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub identity: Arc<dyn IdentityProvider>,
    pub recipe_source: Arc<dyn RecipeSource>,
}

/// Get the cookbook database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Install the process-wide rustls crypto provider. Safe to call more than once.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Build the configured store. The pool is returned too so it can be closed on shutdown.
#[instrument(skip_all)]
async fn setup_store(config: &Config) -> anyhow::Result<(Arc<dyn Store>, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::InMemory => {
            info!("Using in-memory store; data will be lost on shutdown");
            Ok((Arc::new(InMemoryStore::new()), None))
        }
        DatabaseConfig::Postgres { pool, .. } => {
            let url = config
                .database_url()
                .ok_or_else(|| anyhow::anyhow!("database.type is postgres but no connection string is configured"))?;

            info!("Using PostgreSQL store");
            let pg_pool = PgPoolOptions::new()
                .max_connections(pool.max_connections)
                .min_connections(pool.min_connections)
                .acquire_timeout(pool.acquire_timeout)
                .connect(url)
                .await?;
            migrator().run(&pg_pool).await?;

            Ok((Arc::new(PgStore::new(pg_pool.clone())), Some(pg_pool)))
        }
    }
}

/// Build the application router with every route and the request tracing layer.
pub fn build_router(state: AppState) -> Router {
    use api::handlers::{auth, comments, health, recipes, users};

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
        .route("/google", post(auth::google_login));

    let recipe_routes = Router::new()
        .route("/", get(recipes::list_recipes).post(recipes::create_recipe))
        .route("/search", get(recipes::search_recipes))
        .route("/random", post(recipes::create_random_recipe))
        .route("/user/{user_id}", get(recipes::list_user_recipes))
        .route(
            "/{id}",
            get(recipes::get_recipe).put(recipes::update_recipe).delete(recipes::delete_recipe),
        )
        .route("/{id}/like", post(recipes::like_recipe));

    let comment_routes = Router::new()
        .route("/", get(comments::list_comments).post(comments::create_comment))
        .route("/recipe/{recipe_id}", get(comments::list_recipe_comments))
        .route(
            "/{id}",
            get(comments::get_comment).put(comments::update_comment).delete(comments::delete_comment),
        );

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/{id}", get(users::get_user).put(users::update_user).delete(users::delete_user))
        .route("/{id}/tags", get(users::get_user_tags));

    Router::new()
        .route("/healthz", get(health::healthz))
        .nest("/auth", auth_routes)
        .nest("/recipes", recipe_routes)
        .nest("/comments", comment_routes)
        .nest("/users", user_routes)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting cookbook with configuration: {:#?}", config);

        let (store, pool) = setup_store(&config).await?;
        let identity = GoogleIdentityProvider::new(&config.auth.google)?;
        let recipe_source = MealDbClient::new(&config.random_recipe)?;

        let app_state = AppState::builder()
            .store(store)
            .config(config.clone())
            .identity(Arc::new(identity))
            .recipe_source(Arc::new(recipe_source))
            .build();

        Ok(Self {
            router: build_router(app_state),
            config,
            pool,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Cookbook listening on http://{}, available at http://localhost:{}", bind_addr, self.config.port);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
