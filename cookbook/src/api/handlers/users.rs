use axum::{extract::State, http::StatusCode};
use tracing::info;

use crate::{
    AppState,
    api::{
        extract::{Json, Path, Query},
        models::users::{ListUsersQuery, UserResponse, UserUpdate},
    },
    auth::current_user::CurrentUser,
    db::{UserStore, models::users::UserFilter},
    errors::{Error, Result},
    types::{UserId, abbrev_uuid},
};

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// Users may only change their own account
fn ensure_self(current_user: &CurrentUser, id: UserId) -> Result<()> {
    if current_user.id != id {
        return Err(Error::Forbidden {
            message: "You can only modify your own account".to_string(),
        });
    }
    Ok(())
}

#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, Query(query): Query<ListUsersQuery>) -> Result<Json<Vec<UserResponse>>> {
    let users = state.store.list_users(&UserFilter { email: query.email }).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[tracing::instrument(skip_all)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Json<UserResponse>> {
    let user = state.store.get_user(id).await?.ok_or_else(|| user_not_found(id))?;
    Ok(Json(user.into()))
}

#[tracing::instrument(skip_all)]
pub async fn get_user_tags(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Json<Vec<String>>> {
    let user = state.store.get_user(id).await?.ok_or_else(|| user_not_found(id))?;
    Ok(Json(user.tags))
}

/// Update profile fields; `tags`, when present, replaces the whole list
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<UserId>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    ensure_self(&current_user, id)?;

    if update.tags.iter().flatten().any(|name| name.trim().is_empty()) {
        return Err(Error::BadRequest {
            message: "Tag names must not be blank".to_string(),
        });
    }

    let user = state
        .store
        .update_user(id, &update.into())
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(user.into()))
}

#[tracing::instrument(skip_all)]
pub async fn delete_user(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<UserId>) -> Result<StatusCode> {
    ensure_self(&current_user, id)?;

    if !state.store.delete_user(id).await? {
        return Err(user_not_found(id));
    }

    info!(user_id = %abbrev_uuid(&id), "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{auth::MessageResponse, users::UserResponse},
        db::UserStore,
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_list_and_get_users() {
        let server = create_test_app();
        let alice = register_user(&server, "alice@x.com", &["Vegan"]).await;
        register_user(&server, "bob@x.com", &[]).await;

        assert_eq!(server.get("/users").await.json::<Vec<UserResponse>>().len(), 2);

        let found = server.get("/users?email=alice@x.com").await.json::<Vec<UserResponse>>();
        assert_eq!(found, vec![alice.clone()]);

        assert_eq!(server.get(&format!("/users/{}", alice.id)).await.json::<UserResponse>(), alice);
        assert_eq!(
            server.get(&format!("/users/{}/tags", alice.id)).await.json::<Vec<String>>(),
            vec!["Vegan"]
        );

        server
            .get(&format!("/users/{}", Uuid::new_v4()))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_self_only() {
        let server = create_test_app();
        let alice = signed_in_user(&server, "alice@x.com").await;
        let bob = signed_in_user(&server, "bob@x.com").await;
        let (name, value) = bearer(&alice.access_token);

        let response = server
            .put(&format!("/users/{}", alice.user_id))
            .add_header(&name, &value)
            .json(&json!({ "lastName": "Lovelace", "tags": ["Baking", "Quick"] }))
            .await;
        response.assert_status_ok();
        let updated = response.json::<UserResponse>();
        assert_eq!(updated.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(updated.name.as_deref(), Some("Test"));
        assert_eq!(updated.tags, vec!["Baking", "Quick"]);

        let response = server
            .put(&format!("/users/{}", bob.user_id))
            .add_header(&name, &value)
            .json(&json!({ "name": "Mallory" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<MessageResponse>().message, "You can only modify your own account");
    }

    #[tokio::test]
    async fn test_delete_removes_tokens_and_account() {
        let state = create_test_state();
        let server = create_test_server(state.clone());
        let alice = signed_in_user(&server, "alice@x.com").await;
        let bob = signed_in_user(&server, "bob@x.com").await;
        let (name, value) = bearer(&alice.access_token);

        server
            .delete(&format!("/users/{}", bob.user_id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .delete(&format!("/users/{}", alice.user_id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        assert!(state.store.get_user(alice.user_id).await.unwrap().is_none());
        assert!(state.store.refresh_tokens(alice.user_id).await.unwrap().is_empty());

        // The account is gone, so the refresh token no longer resolves
        server
            .post("/auth/refresh")
            .json(&json!({ "refreshToken": alice.refresh_token }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        // Second delete with a still-valid access token
        server
            .delete(&format!("/users/{}", alice.user_id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
