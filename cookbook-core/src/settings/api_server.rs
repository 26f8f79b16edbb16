use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default bcrypt cost for newly registered accounts.
pub const DEFAULT_PASSWORD_HASH_COST: u32 = 12;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
#[readonly::make]
pub struct ApiServer {
    pub bind_address: String,
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
    /// Seeded accounts, username -> bcrypt hash
    #[serde(default)]
    pub users: HashMap<String, String>,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_password_hash_cost() -> u32 {
    DEFAULT_PASSWORD_HASH_COST
}

impl Default for ApiServer {
    fn default() -> Self {
        ApiServer {
            bind_address: "0.0.0.0:8080".to_string(),
            password_hash_cost: default_password_hash_cost(),
            users: HashMap::new(),
            log_format: LogFormat::default(),
        }
    }
}
