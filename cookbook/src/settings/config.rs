use config::{Config, ConfigError, Environment, File};
use cookbook_core::settings::{
    api_server::ApiServer, catalog::CatalogSettings, rate_limiting::RateLimitingConfig,
};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
#[allow(unused)]
pub struct Settings {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub api: ApiServer,
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
    #[serde(default)]
    pub catalog: CatalogSettings,
}

impl Settings {
    pub fn get_environment() -> Environment {
        Environment::default()
            .prefix("COOKBOOK")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("COOKBOOK_RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("api.bind_address", "0.0.0.0:8080")?
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Self::get_environment());

        Self::from_config(builder.build()?)
    }

    /// Deserialize and validate, invalid rate limits fail the startup
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings
            .rate_limiting
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(settings)
    }
}
