use std::sync::Arc;

use tracing::info;

use crate::api::rate_limiting::SecurityManager;
use crate::services::{InMemoryRecipeCatalog, InMemoryUserDirectory, RecipeCatalog, UserDirectory};
use crate::settings::config::Settings;
use crate::stop_flag;

#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub stop_flag: stop_flag::StopFlag,
    /// `None` when rate limiting is disabled
    pub security: Option<Arc<SecurityManager>>,
    pub users: Arc<dyn UserDirectory>,
    pub recipes: Arc<dyn RecipeCatalog>,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    pub async fn new() -> anyhow::Result<SharedAppState> {
        let settings = Settings::new()?;

        let stop_flag = stop_flag::StopFlag::new();
        stop_flag::register_signal_handler(&stop_flag);

        Self::from_settings(settings, stop_flag).await
    }

    pub async fn from_settings(
        settings: Settings,
        stop_flag: stop_flag::StopFlag,
    ) -> anyhow::Result<SharedAppState> {
        let security = if settings.rate_limiting.enabled {
            Some(Arc::new(SecurityManager::new(&settings.rate_limiting)?))
        } else {
            info!("Rate limiting is disabled");
            None
        };

        let users = Arc::new(InMemoryUserDirectory::new(
            settings.api.users.clone(),
            settings.api.password_hash_cost,
        ));
        let recipes = Arc::new(InMemoryRecipeCatalog::from_settings(&settings.catalog).await?);

        Ok(Arc::new(AppState {
            settings,
            stop_flag,
            security,
            users,
            recipes,
        }))
    }
}
