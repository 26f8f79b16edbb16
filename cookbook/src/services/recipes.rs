use std::fmt;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use cookbook_core::recipes::{parse_recipe_list, RecipeSummary};
use cookbook_core::settings::catalog::CatalogSettings;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Read access to the recipes served by the API
#[async_trait]
pub trait RecipeCatalog: Send + Sync + fmt::Debug {
    async fn list(&self) -> Vec<RecipeSummary>;

    async fn get(&self, id: Uuid) -> Option<RecipeSummary>;

    /// Case-insensitive substring search over titles and tags.
    /// An empty query matches everything.
    async fn search(&self, query: &str, limit: usize) -> Vec<RecipeSummary>;
}

#[derive(Default)]
pub struct InMemoryRecipeCatalog {
    recipes: RwLock<Vec<RecipeSummary>>,
}

impl InMemoryRecipeCatalog {
    pub fn new(recipes: Vec<RecipeSummary>) -> Self {
        Self {
            recipes: RwLock::new(recipes),
        }
    }

    pub async fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read recipe seed file {}", path.display()))?;
        let recipes = parse_recipe_list(&content)
            .with_context(|| format!("Failed to parse recipe seed file {}", path.display()))?;

        info!("Loaded {} recipes from {}", recipes.len(), path.display());
        Ok(Self::new(recipes))
    }

    pub async fn from_settings(settings: &CatalogSettings) -> anyhow::Result<Self> {
        match &settings.seed_file {
            Some(path) => Self::from_file(path).await,
            None => Ok(Self::default()),
        }
    }

    pub async fn insert(&self, recipe: RecipeSummary) {
        self.recipes.write().await.push(recipe);
    }
}

impl fmt::Debug for InMemoryRecipeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRecipeCatalog").finish_non_exhaustive()
    }
}

#[async_trait]
impl RecipeCatalog for InMemoryRecipeCatalog {
    async fn list(&self) -> Vec<RecipeSummary> {
        self.recipes.read().await.clone()
    }

    async fn get(&self, id: Uuid) -> Option<RecipeSummary> {
        self.recipes
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<RecipeSummary> {
        let needle = query.trim().to_lowercase();
        self.recipes
            .read()
            .await
            .iter()
            .filter(|r| needle.is_empty() || r.matches(&needle))
            .take(limit)
            .cloned()
            .collect()
    }
}
