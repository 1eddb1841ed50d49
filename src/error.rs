use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

use crate::store::StoreError;
use crate::tokens::TokenError;

pub type AppResult<T> = Result<T, AppError>;

/// API-facing error. `code` is a stable machine-readable discriminator so the
/// UI can show distinct messaging (an expired link and an already-used link
/// must not look the same to a signer).
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", "resource not found")
    }

    pub fn token_expired() -> Self {
        Self::new(
            StatusCode::GONE,
            "token_expired",
            "this signing link has expired",
        )
    }

    pub fn token_used() -> Self {
        Self::new(
            StatusCode::CONFLICT,
            "token_used",
            "this document has already been signed with this link",
        )
    }

    pub fn document_expired() -> Self {
        Self::new(
            StatusCode::GONE,
            "document_expired",
            "this document is past its signing deadline",
        )
    }

    pub fn persistence<E: Display>(error: E) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "persistence_error",
            error.to_string(),
        )
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            error.to_string(),
        )
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => AppError::not_found(),
            StoreError::TokenUsed => AppError::token_used(),
            StoreError::Conflict(message) => AppError::validation(message),
            StoreError::Database(err) => AppError::persistence(err),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::NotFound => AppError::not_found(),
            TokenError::Expired => AppError::token_expired(),
            TokenError::AlreadyUsed => AppError::token_used(),
            TokenError::DocumentExpired => AppError::document_expired(),
            TokenError::Store(err) => AppError::from(err),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}
