//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use cardroom_types::error::GameError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Game(GameError),
    /// Request rejected before reaching the service.
    Validation(String),
}

impl From<GameError> for AppError {
    fn from(e: GameError) -> Self {
        AppError::Game(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Game(GameError::NotFound) => {
                (StatusCode::NOT_FOUND, "GAME_NOT_FOUND", "Game not found".to_string())
            }
            AppError::Game(e @ GameError::UserNotSeated(_)) => {
                (StatusCode::NOT_FOUND, "USER_NOT_SEATED", e.to_string())
            }
            AppError::Game(e @ GameError::TableFull(_)) => {
                (StatusCode::CONFLICT, "TABLE_FULL", e.to_string())
            }
            AppError::Game(e @ GameError::DuplicateUser(_)) => {
                (StatusCode::CONFLICT, "DUPLICATE_USER", e.to_string())
            }
            AppError::Game(
                e @ (GameError::InvalidBlinds { .. }
                | GameError::InvalidSeats(_)
                | GameError::InvalidName(_)
                | GameError::EmptyMessage
                | GameError::MessageTooLong(_)),
            ) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            AppError::Game(e @ GameError::Storage(_)) => {
                tracing::error!(error = %e, "storage failure while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (status, Json(ApiResponse::error(code, &message))).into_response()
    }
}
