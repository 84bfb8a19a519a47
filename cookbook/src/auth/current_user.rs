use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, instrument, trace, warn};

use crate::{
    AppState,
    auth::{identity::IdentityProvider, tokens},
    db::UserStore,
    errors::{Error, Result},
    types::UserId,
};

/// The authenticated caller of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
}

/// Pull the token out of `Authorization: <Bearer|JWT> <token>`
fn bearer_token(parts: &Parts) -> Result<&str> {
    let no_token = || Error::Unauthenticated {
        message: Some("No token provided".to_string()),
    };

    let header = parts.headers.get(AUTHORIZATION).ok_or_else(no_token)?;
    let value = header.to_str().map_err(|_| Error::Unauthenticated {
        message: Some("Invalid token".to_string()),
    })?;

    let (scheme, token) = value.trim().split_once(' ').ok_or_else(no_token)?;
    if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("jwt") {
        return Err(no_token());
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(no_token());
    }
    Ok(token)
}

/// Resolve an identity provider ID token to the local account with the same email
async fn try_identity_provider_auth(token: &str, state: &AppState) -> Option<UserId> {
    let claims = match state.identity.verify(token).await {
        Ok(claims) => claims,
        Err(e) => {
            trace!("Identity provider token rejected: {e:#}");
            return None;
        }
    };

    match state.store.get_user_by_email(&claims.email).await {
        Ok(Some(user)) => Some(user.id),
        Ok(None) => {
            debug!("Identity provider token for an email with no local account");
            None
        }
        Err(e) => {
            warn!("User lookup during identity provider auth failed: {e}");
            None
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts)?;

        match tokens::verify_access_token(token, &state.config) {
            Ok(id) => {
                trace!("Authenticated with access token");
                return Ok(CurrentUser { id });
            }
            Err(e @ Error::Internal { .. }) => return Err(e),
            Err(_) => {}
        }

        if let Some(id) = try_identity_provider_auth(token, state).await {
            debug!("Authenticated with identity provider token");
            return Ok(CurrentUser { id });
        }

        Err(Error::Unauthenticated {
            message: Some("Invalid token".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::identity::IdentityClaims,
        db::models::users::UserCreateDBRequest,
        test_utils::{StubIdentityProvider, create_test_state},
    };
    use axum::http::{HeaderValue, Request, StatusCode};
    use std::sync::Arc;

    fn parts_with(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/recipes");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn message(result: Result<CurrentUser>) -> String {
        result.unwrap_err().user_message()
    }

    #[tokio::test]
    async fn test_missing_or_empty_token() {
        let state = create_test_state();

        let mut parts = parts_with(None);
        assert_eq!(message(CurrentUser::from_request_parts(&mut parts, &state).await), "No token provided");

        let mut parts = parts_with(Some("Bearer "));
        assert_eq!(message(CurrentUser::from_request_parts(&mut parts, &state).await), "No token provided");

        let mut parts = parts_with(Some("Basic abc"));
        assert_eq!(message(CurrentUser::from_request_parts(&mut parts, &state).await), "No token provided");
    }

    #[tokio::test]
    async fn test_non_ascii_header_is_unauthenticated() {
        let state = create_test_state();
        let mut parts = parts_with(None);
        parts
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap());

        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), "Invalid token");
    }

    #[tokio::test]
    async fn test_access_token_with_either_scheme() {
        let state = create_test_state();
        let user_id = uuid::Uuid::new_v4();
        let pair = tokens::issue_token_pair(user_id, &state.config).unwrap();

        for scheme in ["Bearer", "bearer", "JWT", "jwt"] {
            let mut parts = parts_with(Some(&format!("{scheme} {}", pair.access_token)));
            let user = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
            assert_eq!(user.id, user_id);
        }
    }

    #[tokio::test]
    async fn test_refresh_token_is_invalid_here() {
        let state = create_test_state();
        let pair = tokens::issue_token_pair(uuid::Uuid::new_v4(), &state.config).unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {}", pair.refresh_token)));
        assert_eq!(message(CurrentUser::from_request_parts(&mut parts, &state).await), "Invalid token");
    }

    #[tokio::test]
    async fn test_identity_provider_fallback_resolves_by_email() {
        let identity = StubIdentityProvider::accepting(
            "google-id-token",
            IdentityClaims {
                subject: "sub-1".to_string(),
                email: "g@x.com".to_string(),
                name: None,
                picture: None,
            },
        );
        let mut state = create_test_state();
        state.identity = Arc::new(identity);

        // No local account yet
        let mut parts = parts_with(Some("Bearer google-id-token"));
        assert_eq!(message(CurrentUser::from_request_parts(&mut parts, &state).await), "Invalid token");

        let user = state
            .store
            .create_user(&UserCreateDBRequest {
                email: "g@x.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut parts = parts_with(Some("Bearer google-id-token"));
        assert_eq!(CurrentUser::from_request_parts(&mut parts, &state).await.unwrap().id, user.id);
    }
}
