use axum::{extract::State, http::StatusCode};

use crate::{
    AppState,
    api::{
        extract::{Json, Path, Query},
        models::comments::{CommentCreate, CommentResponse, CommentUpdate, ListCommentsQuery},
    },
    auth::current_user::CurrentUser,
    db::{
        CommentStore,
        models::comments::{CommentCreateDBRequest, CommentFilter, CommentUpdateDBRequest},
    },
    errors::{Error, Result},
    types::CommentId,
};

fn comment_not_found(id: CommentId) -> Error {
    Error::NotFound {
        resource: "Comment".to_string(),
        id: id.to_string(),
    }
}

fn require_text(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::BadRequest {
            message: format!("{field} must not be blank"),
        });
    }
    Ok(value.to_string())
}

#[tracing::instrument(skip_all)]
pub async fn list_comments(State(state): State<AppState>, Query(query): Query<ListCommentsQuery>) -> Result<Json<Vec<CommentResponse>>> {
    let comments = state.store.list_comments(&query.into()).await?;
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

#[tracing::instrument(skip_all)]
pub async fn get_comment(State(state): State<AppState>, Path(id): Path<CommentId>) -> Result<Json<CommentResponse>> {
    let comment = state.store.get_comment(id).await?.ok_or_else(|| comment_not_found(id))?;
    Ok(Json(comment.into()))
}

/// Comments on one recipe. Unlike the general listing, an empty result is a 404.
#[tracing::instrument(skip_all)]
pub async fn list_recipe_comments(State(state): State<AppState>, Path(recipe_id): Path<String>) -> Result<Json<Vec<CommentResponse>>> {
    let filter = CommentFilter {
        recipe_id: Some(recipe_id),
        ..Default::default()
    };
    let comments = state.store.list_comments(&filter).await?;

    if comments.is_empty() {
        return Err(Error::NoResults {
            message: "No comments found for this recipe".to_string(),
        });
    }
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

/// Comment as the caller
#[tracing::instrument(skip_all)]
pub async fn create_comment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<CommentCreate>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    let request = CommentCreateDBRequest {
        comment: require_text(&request.comment, "Comment")?,
        owner: current_user.id.to_string(),
        recipe_id: require_text(&request.recipe_id, "Recipe id")?,
    };

    let comment = state.store.create_comment(&request).await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

#[tracing::instrument(skip_all)]
pub async fn update_comment(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<CommentId>,
    Json(request): Json<CommentUpdate>,
) -> Result<Json<CommentResponse>> {
    let request = CommentUpdateDBRequest {
        comment: require_text(&request.comment, "Comment")?,
    };

    let comment = state
        .store
        .update_comment(id, &request)
        .await?
        .ok_or_else(|| comment_not_found(id))?;
    Ok(Json(comment.into()))
}

#[tracing::instrument(skip_all)]
pub async fn delete_comment(State(state): State<AppState>, _current_user: CurrentUser, Path(id): Path<CommentId>) -> Result<StatusCode> {
    if !state.store.delete_comment(id).await? {
        return Err(comment_not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{auth::MessageResponse, comments::CommentResponse},
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_comment_lifecycle() {
        let server = create_test_app();
        let tokens = signed_in_user(&server, "u@x.com").await;
        let (name, value) = bearer(&tokens.access_token);

        let response = server
            .post("/comments")
            .add_header(&name, &value)
            .json(&json!({ "comment": "Delicious", "recipeId": "recipe-1" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created = response.json::<CommentResponse>();
        assert_eq!(created.owner, tokens.user_id.to_string());
        assert_eq!(created.recipe_id, "recipe-1");

        let fetched = server.get(&format!("/comments/{}", created.id)).await.json::<CommentResponse>();
        assert_eq!(fetched, created);

        let response = server
            .put(&format!("/comments/{}", created.id))
            .add_header(&name, &value)
            .json(&json!({ "comment": "Even better the next day" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<CommentResponse>().comment, "Even better the next day");

        server
            .delete(&format!("/comments/{}", created.id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/comments/{}", created.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing_filters_and_recipe_not_found() {
        let server = create_test_app();
        let alice = signed_in_user(&server, "alice@x.com").await;
        let bob = signed_in_user(&server, "bob@x.com").await;

        for (tokens, recipe) in [(&alice, "r1"), (&bob, "r1"), (&alice, "r2")] {
            let (name, value) = bearer(&tokens.access_token);
            server
                .post("/comments")
                .add_header(&name, &value)
                .json(&json!({ "comment": "Nice", "recipeId": recipe }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        assert_eq!(server.get("/comments").await.json::<Vec<CommentResponse>>().len(), 3);
        assert_eq!(
            server
                .get(&format!("/comments?owner={}", alice.user_id))
                .await
                .json::<Vec<CommentResponse>>()
                .len(),
            2
        );
        assert_eq!(server.get("/comments/recipe/r1").await.json::<Vec<CommentResponse>>().len(), 2);

        let response = server.get("/comments/recipe/r3").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<MessageResponse>().message, "No comments found for this recipe");
    }

    #[tokio::test]
    async fn test_blank_fields_and_missing_comment() {
        let server = create_test_app();
        let tokens = signed_in_user(&server, "u@x.com").await;
        let (name, value) = bearer(&tokens.access_token);

        for body in [
            json!({ "comment": " ", "recipeId": "r1" }),
            json!({ "comment": "Nice", "recipeId": "" }),
        ] {
            server
                .post("/comments")
                .add_header(&name, &value)
                .json(&body)
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }

        server
            .put(&format!("/comments/{}", Uuid::new_v4()))
            .add_header(&name, &value)
            .json(&json!({ "comment": "Edited" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .post("/comments")
            .json(&json!({ "comment": "Anonymous", "recipeId": "r1" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
