use axum::{extract::State, http::StatusCode};
use tracing::{info, warn};

use crate::{
    AppState,
    api::{
        extract::{Json, Path, Query},
        models::{
            pagination::Pagination,
            recipes::{LikeResponse, RecipeListResponse, RecipePayload, RecipeResponse, SearchQuery},
        },
    },
    auth::current_user::CurrentUser,
    db::{
        RecipeStore,
        models::recipes::{RecipeFilter, RecipeSearch},
    },
    errors::{Error, Result},
    types::{RecipeId, UserId, abbrev_uuid},
};

fn recipe_not_found(id: RecipeId) -> Error {
    Error::NotFound {
        resource: "Recipe".to_string(),
        id: id.to_string(),
    }
}

async fn list_page(state: &AppState, filter: RecipeFilter) -> Result<(Vec<RecipeResponse>, i64)> {
    let page = state.store.list_recipes(&filter).await?;
    let recipes = page.recipes.into_iter().map(RecipeResponse::from).collect();
    Ok((recipes, page.total))
}

/// List all recipes, one page at a time
#[tracing::instrument(skip_all)]
pub async fn list_recipes(State(state): State<AppState>, Query(pagination): Query<Pagination>) -> Result<Json<RecipeListResponse>> {
    let filter = RecipeFilter::new(pagination.skip(), pagination.limit());
    let (recipes, total) = list_page(&state, filter).await?;

    if total == 0 {
        return Err(Error::NoResults {
            message: "No recipes found".to_string(),
        });
    }

    Ok(Json(RecipeListResponse {
        recipes,
        total_pages: pagination.total_pages(total),
    }))
}

/// List one user's recipes. An empty result is not an error here.
#[tracing::instrument(skip_all)]
pub async fn list_user_recipes(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<RecipeListResponse>> {
    let filter = RecipeFilter::new(pagination.skip(), pagination.limit()).with_owner(user_id);
    let (recipes, total) = list_page(&state, filter).await?;

    Ok(Json(RecipeListResponse {
        recipes,
        total_pages: pagination.total_pages(total),
    }))
}

#[tracing::instrument(skip_all)]
pub async fn get_recipe(State(state): State<AppState>, Path(id): Path<RecipeId>) -> Result<Json<RecipeResponse>> {
    let recipe = state.store.get_recipe(id).await?.ok_or_else(|| recipe_not_found(id))?;
    Ok(Json(recipe.into()))
}

/// Create a recipe owned by the caller
#[tracing::instrument(skip_all)]
pub async fn create_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(payload): Json<RecipePayload>,
) -> Result<(StatusCode, Json<RecipeResponse>)> {
    let request = payload.validate()?.into_create(current_user.id);
    let recipe = state.store.create_recipe(&request).await?;

    info!(recipe_id = %abbrev_uuid(&recipe.id), owner = %abbrev_uuid(&recipe.owner), "Created recipe");
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

/// Replace a recipe's title, image, ingredients and tags
#[tracing::instrument(skip_all)]
pub async fn update_recipe(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<RecipeId>,
    Json(payload): Json<RecipePayload>,
) -> Result<Json<RecipeResponse>> {
    let request = payload.validate()?.into_update();
    let recipe = state
        .store
        .update_recipe(id, &request)
        .await?
        .ok_or_else(|| recipe_not_found(id))?;
    Ok(Json(recipe.into()))
}

#[tracing::instrument(skip_all)]
pub async fn delete_recipe(State(state): State<AppState>, _current_user: CurrentUser, Path(id): Path<RecipeId>) -> Result<StatusCode> {
    if !state.store.delete_recipe(id).await? {
        return Err(recipe_not_found(id));
    }

    info!(recipe_id = %abbrev_uuid(&id), "Deleted recipe");
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all)]
pub async fn like_recipe(State(state): State<AppState>, _current_user: CurrentUser, Path(id): Path<RecipeId>) -> Result<Json<LikeResponse>> {
    let likes = state.store.add_like(id).await?.ok_or_else(|| recipe_not_found(id))?;
    Ok(Json(LikeResponse { likes }))
}

/// Recipes carrying any of the given tags, optionally narrowed to an exact title
#[tracing::instrument(skip_all)]
pub async fn search_recipes(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Result<Json<Vec<RecipeResponse>>> {
    let search = RecipeSearch::from(query);
    let recipes = state.store.search_recipes(&search).await?;
    Ok(Json(recipes.into_iter().map(RecipeResponse::from).collect()))
}

/// Fetch a random recipe from the public recipe API and store it for the caller
#[tracing::instrument(skip_all)]
pub async fn create_random_recipe(State(state): State<AppState>, current_user: CurrentUser) -> Result<(StatusCode, Json<RecipeResponse>)> {
    let payload = state.recipe_source.fetch().await.map_err(|e| {
        warn!("Random recipe fetch failed: {e:#}");
        Error::BadGateway {
            message: "Failed to fetch a random recipe".to_string(),
        }
    })?;

    // An upstream meal without a name or ingredients is an upstream problem, not the caller's
    let request = payload
        .validate()
        .map_err(|e| {
            warn!("Random recipe was not usable: {}", e.user_message());
            Error::BadGateway {
                message: "Failed to fetch a random recipe".to_string(),
            }
        })?
        .into_create(current_user.id);

    let recipe = state.store.create_recipe(&request).await?;
    info!(recipe_id = %abbrev_uuid(&recipe.id), "Created random recipe");
    Ok((StatusCode::CREATED, Json(recipe.into())))
}
