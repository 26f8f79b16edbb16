//! Shared helpers for router level tests

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use config::Config;

use crate::app_state::{AppState, SharedAppState};
use crate::http::create_app;
use crate::settings::config::Settings;
use crate::stop_flag::StopFlag;

pub const TEST_CONFIG: &str = "tests/test_config.yaml";
pub const TEST_RECIPES: &str = "tests/recipes.yaml";

/// Build an AppState from the test config with `overrides` applied on top
pub async fn create_test_app_state(overrides: &[(&str, &str)]) -> SharedAppState {
    let mut builder = Config::builder()
        .add_source(config::File::with_name(TEST_CONFIG))
        .set_override("catalog.seed_file", TEST_RECIPES)
        .unwrap();
    for (key, value) in overrides {
        builder = builder.set_override(*key, *value).unwrap();
    }

    let settings = Settings::from_config(builder.build().unwrap()).unwrap();
    AppState::from_settings(settings, StopFlag::new())
        .await
        .unwrap()
}

pub async fn create_test_server(overrides: &[(&str, &str)]) -> TestServer {
    let state = create_test_app_state(overrides).await;
    TestServer::new(create_app(state)).unwrap()
}

pub fn forwarded_for() -> HeaderName {
    HeaderName::from_static("x-forwarded-for")
}

pub fn ip(value: &'static str) -> HeaderValue {
    HeaderValue::from_static(value)
}
