use serde::{Deserialize, Serialize};

use super::repo_types::{FavoriteRecipe, Review};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFavoriteRequest {
    pub recipe_id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub title: String,
    pub rating: i16,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 10 }

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: default_limit(), offset: 0 }
    }
}

/// Entry of the favorites and reviews listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub recipe_id: String,
    pub title: String,
}

impl From<FavoriteRecipe> for RecipeSummary {
    fn from(f: FavoriteRecipe) -> Self {
        Self { recipe_id: f.recipe_id, title: f.title }
    }
}

impl From<Review> for RecipeSummary {
    fn from(r: Review) -> Self {
        Self { recipe_id: r.recipe_id, title: r.title }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
