//! API request/response models for recipes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::recipes::{RecipeCreateDBRequest, RecipeDBResponse, RecipeSearch, RecipeUpdateDBRequest},
    errors::Error,
    types::{RecipeId, UserId},
};

/// Body of recipe create and update. Update is a full replacement, so both take the same shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipePayload {
    pub title: Option<String>,
    pub image: Option<String>,
    pub ingredients: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A payload that passed [`RecipePayload::validate`]
#[derive(Debug, Clone)]
pub struct ValidRecipe {
    pub title: String,
    pub image: Option<String>,
    pub ingredients: Vec<String>,
    pub tags: Vec<String>,
}

fn invalid(message: &str) -> Error {
    Error::BadRequest {
        message: message.to_string(),
    }
}

impl RecipePayload {
    pub fn validate(self) -> Result<ValidRecipe, Error> {
        let title = self.title.map(|t| t.trim().to_string()).unwrap_or_default();
        if title.is_empty() {
            return Err(invalid("Recipe title is required"));
        }

        let ingredients = self.ingredients.unwrap_or_default();
        if ingredients.is_empty() {
            return Err(invalid("Ingredients must be a non-empty list"));
        }
        if ingredients.iter().any(|name| name.trim().is_empty()) {
            return Err(invalid("Ingredient names must not be blank"));
        }
        if self.tags.iter().any(|name| name.trim().is_empty()) {
            return Err(invalid("Tag names must not be blank"));
        }

        Ok(ValidRecipe {
            title,
            image: self.image,
            ingredients,
            tags: self.tags,
        })
    }
}

impl ValidRecipe {
    pub fn into_create(self, owner: UserId) -> RecipeCreateDBRequest {
        RecipeCreateDBRequest {
            owner,
            title: self.title,
            image: self.image,
            ingredients: self.ingredients,
            tags: self.tags,
        }
    }

    pub fn into_update(self) -> RecipeUpdateDBRequest {
        RecipeUpdateDBRequest {
            title: self.title,
            image: self.image,
            ingredients: self.ingredients,
            tags: self.tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeResponse {
    pub id: RecipeId,
    pub owner: UserId,
    pub title: String,
    pub image: Option<String>,
    pub likes: i64,
    pub ingredients: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RecipeDBResponse> for RecipeResponse {
    fn from(db: RecipeDBResponse) -> Self {
        Self {
            id: db.id,
            owner: db.owner,
            title: db.title,
            image: db.image,
            likes: db.likes,
            ingredients: db.ingredients,
            tags: db.tags,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeListResponse {
    pub recipes: Vec<RecipeResponse>,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub likes: i64,
}

/// `GET /recipes/search?tags=Vegan,Quick&title=Soup`
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Comma separated tag names
    pub tags: Option<String>,
    pub title: Option<String>,
}

impl From<SearchQuery> for RecipeSearch {
    fn from(query: SearchQuery) -> Self {
        let tags = query
            .tags
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            tags,
            title: query.title.filter(|title| !title.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: Option<&str>, ingredients: Option<Vec<&str>>, tags: Vec<&str>) -> RecipePayload {
        RecipePayload {
            title: title.map(str::to_string),
            image: None,
            ingredients: ingredients.map(|names| names.into_iter().map(str::to_string).collect()),
            tags: tags.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_payload() {
        let valid = payload(Some(" Soup "), Some(vec!["Water", "Salt"]), vec!["Vegan"]).validate().unwrap();
        assert_eq!(valid.title, "Soup");
        assert_eq!(valid.ingredients, vec!["Water", "Salt"]);
        assert_eq!(valid.tags, vec!["Vegan"]);
    }

    #[test]
    fn test_validate_rejects_missing_or_empty_ingredients() {
        for ingredients in [None, Some(vec![]), Some(vec!["Water", " "])] {
            let err = payload(Some("Soup"), ingredients, vec![]).validate().unwrap_err();
            assert!(matches!(err, Error::BadRequest { .. }));
        }
    }

    #[test]
    fn test_validate_rejects_blank_title_or_tag() {
        assert!(payload(None, Some(vec!["Water"]), vec![]).validate().is_err());
        assert!(payload(Some("  "), Some(vec!["Water"]), vec![]).validate().is_err());
        assert!(payload(Some("Soup"), Some(vec!["Water"]), vec![""]).validate().is_err());
    }

    #[test]
    fn test_non_list_ingredients_fail_to_deserialize() {
        let result = serde_json::from_str::<RecipePayload>(r#"{"title": "Soup", "ingredients": "Water"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_search_query_splits_tags() {
        let search = RecipeSearch::from(SearchQuery {
            tags: Some("Vegan, Quick,,".to_string()),
            title: Some(String::new()),
        });
        assert_eq!(search.tags, vec!["Vegan", "Quick"]);
        assert_eq!(search.title, None);
    }
}
