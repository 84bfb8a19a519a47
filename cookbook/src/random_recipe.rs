//! Random recipes from a TheMealDB compatible API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::{api::models::recipes::RecipePayload, config::RandomRecipeConfig};

/// Number of ingredient slots in a meal record
const INGREDIENT_SLOTS: usize = 20;

/// Source of recipes for `POST /recipes/random`
#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<RecipePayload>;
}

#[derive(Debug, Deserialize)]
struct MealsResponse {
    meals: Option<Vec<Map<String, Value>>>,
}

fn text<'a>(meal: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    meal.get(field).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// Map one meal record onto a recipe payload.
///
/// `strCategory` becomes the first tag, followed by the comma separated `strTags`.
fn meal_to_payload(meal: &Map<String, Value>) -> RecipePayload {
    let ingredients = (1..=INGREDIENT_SLOTS)
        .filter_map(|slot| text(meal, &format!("strIngredient{slot}")))
        .map(str::to_string)
        .collect();

    let mut tags: Vec<String> = text(meal, "strCategory").map(str::to_string).into_iter().collect();
    if let Some(extra) = text(meal, "strTags") {
        tags.extend(extra.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string));
    }

    RecipePayload {
        title: text(meal, "strMeal").map(str::to_string),
        image: text(meal, "strMealThumb").map(str::to_string),
        ingredients: Some(ingredients),
        tags,
    }
}

/// Makes sure a url has a trailing slash so `join` appends instead of replacing the last segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let path = format!("{}/", new_url.path());
        new_url.set_path(&path);
        new_url
    }
}

pub struct MealDbClient {
    client: Client,
    base_url: Url,
}

impl MealDbClient {
    pub fn new(config: &RandomRecipeConfig) -> anyhow::Result<Self> {
        crate::install_crypto_provider();
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl RecipeSource for MealDbClient {
    async fn fetch(&self) -> anyhow::Result<RecipePayload> {
        let url = ensure_slash(&self.base_url)
            .join("random.php")
            .map_err(|e| anyhow::anyhow!("Failed to construct random recipe URL: {e}"))?;
        debug!("Fetching random recipe from {url}");

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Random recipe API error: {status} from {url}");
        }

        let body: MealsResponse = response.json().await?;
        let meal = body
            .meals
            .and_then(|meals| meals.into_iter().next())
            .ok_or_else(|| anyhow::anyhow!("Random recipe API returned no meals"))?;

        Ok(meal_to_payload(&meal))
    }
}
