use std::net::SocketAddr;

use anyhow::Context;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::middleware::with_request_logging;
use crate::{api::router::ApiRoutes, app_state::SharedAppState};

/// Router with all global middleware, CORS outermost
pub fn create_app(app_state: SharedAppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    with_request_logging(ApiRoutes::create(app_state)).layer(cors)
}

pub async fn setup_http_server(
    app_state: SharedAppState,
    bind_address: &str,
) -> anyhow::Result<tokio::task::JoinHandle<anyhow::Result<()>>> {
    let app = create_app(app_state.clone());

    println!("🚀 Cookbook API starting at {}", &bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {bind_address}"))?;

    let stop_flag = app_state.stop_flag.clone();
    let handle = tokio::spawn(async move {
        info!("Starting HTTP server");
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            stop_flag.wait().await;
            info!("Stop flag was set, shutting down HTTP server gracefully");
        })
        .await?;
        info!("HTTP server is down");
        Ok::<(), anyhow::Error>(())
    });

    Ok(handle)
}
