//! Access and refresh token issuance, verification and rotation.
//!
//! Both token kinds are HS256 JWTs signed with `secret_key`. They differ in lifetime and in the
//! `typ` claim, which is checked on every verification so neither kind can stand in for the other.
//! Refresh tokens are additionally tracked per user as SHA-256 fingerprints: each one can be
//! consumed exactly once, and presenting one that is not on file revokes every session the user
//! holds.

use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use rand::prelude::RngExt;
use rand::rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{instrument, warn};

use crate::{
    config::Config,
    db::{UserStore, models::users::UserDBResponse},
    errors::Error,
    types::{UserId, abbrev_uuid},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims shared by both token kinds
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,  // Subject (user ID)
    pub jti: String,  // Per-issuance nonce
    pub typ: TokenKind,
    pub iat: i64,     // Issued at
    pub exp: i64,     // Expiration time
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn secret_key(config: &Config) -> Result<&str, Error> {
    config.secret_key.as_deref().ok_or_else(|| Error::Internal {
        operation: "JWT sessions: secret_key is required".to_string(),
    })
}

/// Random per-issuance nonce, so two tokens minted in the same second still differ
fn nonce() -> String {
    let mut bytes = [0u8; 16];
    rng().fill(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// The form a refresh token is stored in
pub fn fingerprint(token: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

fn sign(user_id: UserId, typ: TokenKind, lifetime: std::time::Duration, key: &EncodingKey) -> Result<String, Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        jti: nonce(),
        typ,
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
    };
    encode(&Header::default(), &claims, key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

/// Mint an access/refresh pair for a user. Persisting the refresh token is up to the caller.
pub fn issue_token_pair(user_id: UserId, config: &Config) -> Result<TokenPair, Error> {
    let key = EncodingKey::from_secret(secret_key(config)?.as_bytes());
    Ok(TokenPair {
        access_token: sign(user_id, TokenKind::Access, config.auth.access_token_expiry, &key)?,
        refresh_token: sign(user_id, TokenKind::Refresh, config.auth.refresh_token_expiry, &key)?,
    })
}

fn decode_claims(token: &str, expected: TokenKind, config: &Config) -> Result<Claims, Error> {
    let key = DecodingKey::from_secret(secret_key(config)?.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        // Client errors (401) - malformed tokens, invalid claims, expired tokens
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::ExpiredSignature
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::InvalidAlgorithm => Error::Unauthenticated { message: None },

        // Server errors (500) - key issues, internal failures
        ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::RsaFailedSigning
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::MissingAlgorithm
        | ErrorKind::Crypto(_) => Error::Internal {
            operation: format!("JWT verification: {e}"),
        },

        _ => Error::Internal {
            operation: format!("JWT verification (unknown error): {e}"),
        },
    })?;

    if token_data.claims.typ != expected {
        return Err(Error::Unauthenticated { message: None });
    }
    Ok(token_data.claims)
}

/// Stateless check of an access token
pub fn verify_access_token(token: &str, config: &Config) -> Result<UserId, Error> {
    decode_claims(token, TokenKind::Access, config).map(|claims| claims.sub)
}

/// Verify a refresh token and consume it from the owner's list.
///
/// A well-signed refresh token that is not on file means it was already used or revoked; the
/// owner's whole list is cleared before rejecting.
#[instrument(skip_all, err)]
pub async fn verify_refresh_token<S>(token: &str, config: &Config, store: &S) -> Result<UserDBResponse, Error>
where
    S: UserStore + ?Sized,
{
    let invalid = || Error::Unauthenticated {
        message: Some("Invalid refresh token".to_string()),
    };

    if token.is_empty() {
        return Err(invalid());
    }

    let claims = decode_claims(token, TokenKind::Refresh, config).map_err(|e| match e {
        Error::Unauthenticated { .. } => invalid(),
        other => other,
    })?;

    let user = store.get_user(claims.sub).await?.ok_or_else(invalid)?;

    if !store.consume_refresh_token(user.id, &fingerprint(token)).await? {
        let cleared = store.clear_refresh_tokens(user.id).await?;
        warn!(user_id = %abbrev_uuid(&user.id), cleared, "Refresh token reuse detected, revoked all sessions");
        return Err(invalid());
    }

    Ok(user)
}
