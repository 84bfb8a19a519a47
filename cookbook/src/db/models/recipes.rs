//! Database models for the recipe aggregate.
//!
//! A recipe is stored as one core row plus ingredient rows and recipe-tag association rows.
//! [`assemble`] stitches those back together into [`RecipeDBResponse`] values; both store
//! backends use it so the grouping rules live in one place.

use crate::types::{RecipeId, UserId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct RecipeCreateDBRequest {
    pub owner: UserId,
    pub title: String,
    pub image: Option<String>,
    pub ingredients: Vec<String>,
    pub tags: Vec<String>,
}

/// Full replacement of a recipe's core fields and associations
#[derive(Debug, Clone)]
pub struct RecipeUpdateDBRequest {
    pub title: String,
    pub image: Option<String>,
    pub ingredients: Vec<String>,
    pub tags: Vec<String>,
}

/// A recipe core row, without ingredients or tags
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RecipeRow {
    pub id: RecipeId,
    pub owner: UserId,
    pub title: String,
    pub image: Option<String>,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The denormalized recipe view
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDBResponse {
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

/// Filter and window for listing recipes in insertion order
#[derive(Debug, Clone)]
pub struct RecipeFilter {
    pub owner: Option<UserId>,
    pub skip: i64,
    pub limit: i64,
}

impl RecipeFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { owner: None, skip, limit }
    }

    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// One page of recipes plus the number of rows matching the filter
#[derive(Debug, Clone)]
pub struct RecipePage {
    pub recipes: Vec<RecipeDBResponse>,
    pub total: i64,
}

/// Tag names match if a recipe carries any of them; title must match exactly.
#[derive(Debug, Clone, Default)]
pub struct RecipeSearch {
    pub tags: Vec<String>,
    pub title: Option<String>,
}

/// Drop repeated names, keeping the first occurrence of each.
pub fn unique_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names.iter().filter(|name| seen.insert(name.as_str())).cloned().collect()
}

/// Group ingredient and tag rows onto their recipes.
///
/// `ingredients` and `tags` are `(recipe id, name)` pairs already in display order. Output keeps
/// the order of `rows`.
pub fn assemble(rows: Vec<RecipeRow>, ingredients: Vec<(RecipeId, String)>, tags: Vec<(RecipeId, String)>) -> Vec<RecipeDBResponse> {
    let mut ingredients_by_recipe: HashMap<RecipeId, Vec<String>> = HashMap::new();
    for (recipe_id, name) in ingredients {
        ingredients_by_recipe.entry(recipe_id).or_default().push(name);
    }

    let mut tags_by_recipe: HashMap<RecipeId, Vec<String>> = HashMap::new();
    for (recipe_id, name) in tags {
        tags_by_recipe.entry(recipe_id).or_default().push(name);
    }

    rows.into_iter()
        .map(|row| RecipeDBResponse {
            ingredients: ingredients_by_recipe.remove(&row.id).unwrap_or_default(),
            tags: tags_by_recipe.remove(&row.id).unwrap_or_default(),
            id: row.id,
            owner: row.owner,
            title: row.title,
            image: row.image,
            likes: row.likes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect()
}
