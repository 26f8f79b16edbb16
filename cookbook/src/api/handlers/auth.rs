use axum::{debug_handler, extract::State, http::StatusCode, Json};
use cookbook_core::auth::Credentials;
use tracing::{debug, info};

use crate::api::error::AppError;
use crate::app_state::SharedAppState;

#[debug_handler]
pub async fn login_handler(
    State(state): State<SharedAppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<serde_json::Value>, AppError> {
    debug!("Login attempt for {}", credentials.username);

    let user = state
        .users
        .authenticate(&credentials)
        .await
        .ok_or(AppError::InvalidCredentials)?;

    info!(username = %user.username, "User logged in");
    Ok(Json(serde_json::json!({
        "status": "success",
        "username": user.username,
    })))
}

#[debug_handler]
pub async fn register_handler(
    State(state): State<SharedAppState>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let user = state.users.register(&credentials).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "username": user.username,
        })),
    ))
}
