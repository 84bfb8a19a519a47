//! Third-party identity tokens (Google sign-in).
//!
//! An ID token is accepted when its RS256 signature checks out against a key from the provider's
//! published key set, its audience is our client id and its issuer is one we trust.
//!
//! The key set is cached for `auth.google.jwks_cache_ttl`. A token whose key id is missing from
//! the cached set is rejected without another download; rotated keys are picked up once the
//! entry expires.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, jwk::JwkSet};
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::GoogleConfig;

/// Who the provider says the token holder is
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityClaims {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> anyhow::Result<IdentityClaims>;
}

#[derive(Debug, Deserialize)]
struct GoogleIdClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// The concrete implementation of [`IdentityProvider`]
pub struct GoogleIdentityProvider {
    client: Client,
    client_id: Option<String>,
    jwks_url: Url,
    issuers: Vec<String>,
    /// Keyed by key set URL
    key_sets: Cache<String, Arc<JwkSet>>,
}

impl GoogleIdentityProvider {
    pub fn new(config: &GoogleConfig) -> anyhow::Result<Self> {
        crate::install_crypto_provider();
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            jwks_url: config.jwks_url.clone(),
            issuers: config.issuers.clone(),
            key_sets: Cache::builder().max_capacity(1).time_to_live(config.jwks_cache_ttl).build(),
        })
    }

    /// The cached key set, downloading it when absent or expired. Concurrent misses share one request.
    async fn key_set(&self) -> anyhow::Result<Arc<JwkSet>> {
        self.key_sets
            .try_get_with(self.jwks_url.to_string(), async { self.fetch_key_set().await.map(Arc::new) })
            .await
            .map_err(|e| anyhow::anyhow!("{e:#}"))
    }

    async fn fetch_key_set(&self) -> anyhow::Result<JwkSet> {
        debug!(url = %self.jwks_url, "Fetching identity provider key set");
        let response = self.client.get(self.jwks_url.clone()).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Key set request to {} failed with {status}", self.jwks_url);
        }

        Ok(response.json::<JwkSet>().await?)
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    #[instrument(skip_all, err)]
    async fn verify(&self, token: &str) -> anyhow::Result<IdentityClaims> {
        let Some(client_id) = &self.client_id else {
            anyhow::bail!("Google sign-in is not configured (auth.google.client_id)");
        };

        let header = decode_header(token)?;
        let kid = header.kid.ok_or_else(|| anyhow::anyhow!("ID token has no key id"))?;

        let key_set = self.key_set().await?;
        let jwk = key_set
            .find(&kid)
            .ok_or_else(|| anyhow::anyhow!("No published key matches key id {kid}"))?;
        let key = DecodingKey::from_jwk(jwk)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[client_id]);
        validation.set_issuer(&self.issuers);

        let claims = decode::<GoogleIdClaims>(token, &key, &validation)?.claims;
        let email = claims.email.ok_or_else(|| anyhow::anyhow!("ID token carries no email"))?;
        debug!(subject = %claims.sub, "Verified identity provider token");

        Ok(IdentityClaims {
            subject: claims.sub,
            email,
            name: claims.name,
            picture: claims.picture,
        })
    }
}
