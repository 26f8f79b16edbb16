use axum::http::StatusCode;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::services::RegistrationError;

#[derive(Clone, Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Recipe not found: {0}")]
    RecipeNotFound(Uuid),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    fn get_error_msg(&self) -> (StatusCode, String) {
        let status = match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::UserAlreadyExists(_) => StatusCode::CONFLICT,
            AppError::RecipeNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        if let Some(app_error) = e.downcast_ref::<AppError>() {
            return app_error.clone();
        }
        AppError::InternalServerError(e.to_string())
    }
}

impl From<RegistrationError> for AppError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::UserAlreadyExists(username) => AppError::UserAlreadyExists(username),
            RegistrationError::Hashing(msg) => AppError::InternalServerError(msg),
            other => AppError::InvalidInput(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.get_error_msg();
        let body = serde_json::json!({ "error": true, "message": body });
        (status, Json(body)).into_response()
    }
}
