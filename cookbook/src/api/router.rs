use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers::auth::{login_handler, register_handler};
use crate::api::handlers::health::health_checker_handler;
use crate::api::handlers::recipes::{
    list_recipes_handler, recipe_detail_handler, search_handler,
};
use crate::api::middleware::with_security_headers;
use crate::api::rate_limiting::{Policy, RateLimitLayer, SecurityManager};
use crate::app_state::SharedAppState;

pub struct ApiRoutes;

impl ApiRoutes {
    pub fn create(state: SharedAppState) -> Router {
        let security = state.security.clone();

        let login_router = guard(
            Router::new().route("/login", post(login_handler)),
            &security,
            Policy::Login,
        );

        let register_router = guard(
            Router::new().route("/register", post(register_handler)),
            &security,
            Policy::Register,
        );

        let search_router = guard(
            Router::new().route("/api/search", get(search_handler)),
            &security,
            Policy::Search,
        );

        let recipes_router = guard(
            Router::new()
                .route("/api/recipes", get(list_recipes_handler))
                .route("/api/recipes/{id}", get(recipe_detail_handler)),
            &security,
            Policy::General,
        );

        let public_router =
            Router::new().route("/api/health", get(health_checker_handler));

        let router = Router::new()
            .merge(login_router)
            .merge(register_router)
            .merge(search_router)
            .merge(recipes_router)
            .merge(public_router)
            .with_state(state);

        with_security_headers(router)
    }
}

/// Wrap every route of `router` in the wrapper for `policy`
fn guard(
    router: Router<SharedAppState>,
    security: &Option<Arc<SecurityManager>>,
    policy: Policy,
) -> Router<SharedAppState> {
    match security {
        Some(manager) => {
            router.route_layer(RateLimitLayer::with_default_formatter(manager.clone(), policy))
        }
        None => router,
    }
}
