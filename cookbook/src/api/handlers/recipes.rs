use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use cookbook_core::recipes::RecipeSummary;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::AppError;
use crate::app_state::SharedAppState;
use crate::services::recipes::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Requested limit clamped to `1..=MAX_SEARCH_LIMIT`
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT)
    }
}

#[debug_handler]
pub async fn list_recipes_handler(State(state): State<SharedAppState>) -> impl IntoResponse {
    let recipes = state.recipes.list().await;
    Json(serde_json::json!({ "recipes": recipes }))
}

#[debug_handler]
pub async fn recipe_detail_handler(
    State(state): State<SharedAppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeSummary>, AppError> {
    let recipe = state
        .recipes
        .get(id)
        .await
        .ok_or(AppError::RecipeNotFound(id))?;
    Ok(Json(recipe))
}

#[debug_handler]
pub async fn search_handler(
    State(state): State<SharedAppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let recipes = state.recipes.search(&query.q, query.limit()).await;
    Json(serde_json::json!({
        "query": query.q,
        "count": recipes.len(),
        "recipes": recipes,
    }))
}
