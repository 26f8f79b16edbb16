use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[allow(unused)]
#[readonly::make]
pub struct CatalogSettings {
    /// YAML file with recipes to load on startup
    pub seed_file: Option<String>,
}
