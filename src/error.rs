//!
//! # Custom Error Handling
//!
//! This module defines `AppError`, the error type every HTTP handler returns.
//! Domain errors (`IdentityError`, `AuthError`, `StoreError`) and validation
//! failures convert into it with `?`, and `AppError` implements
//! `actix_web::error::ResponseError` so it renders as a JSON body of the form
//! `{"error": "<message>"}` with the matching status code.
//!
//! Internal detail (database messages, signing failures) is logged when the
//! conversion happens and never echoed to the client.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use log::error;
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::auth::{AuthError, IdentityError};
use crate::models::UnknownVariant;
use crate::repository::StoreError;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failed or is required but missing (HTTP 401).
    Unauthorized(String),
    /// Malformed or rejected request (HTTP 400).
    BadRequest(String),
    NotFound(String),
    /// Unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// The store failed (HTTP 500). The message is logged, not returned.
    DatabaseError(String),
    /// Input validation failed (HTTP 422 Unprocessable Entity).
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl AppError {
    /// The message placed in the response body.
    fn public_message(&self) -> &str {
        match self {
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg) => msg,
            AppError::InternalServerError(_) => "Internal server error",
            AppError::DatabaseError(_) => "Database error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.public_message()
        }))
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::Conflict(_) | StoreError::InvalidReference(_) => {
                AppError::BadRequest(error.to_string())
            }
            StoreError::Database(msg) => {
                error!("Store failure: {}", msg);
                AppError::DatabaseError(msg)
            }
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(error: IdentityError) -> AppError {
        match error {
            IdentityError::UsernameTaken | IdentityError::EmailTaken => {
                AppError::BadRequest(error.to_string())
            }
            IdentityError::InvalidCredentials => AppError::Unauthorized(error.to_string()),
            IdentityError::PasswordTooLong => AppError::ValidationError(error.to_string()),
            IdentityError::Store(e) => AppError::from(e),
            IdentityError::Internal(msg) => {
                error!("Identity service failure: {}", msg);
                AppError::InternalServerError(msg)
            }
        }
    }
}

/// Every token failure looks the same to the client.
impl From<AuthError> for AppError {
    fn from(_: AuthError) -> AppError {
        AppError::Unauthorized("Invalid or expired token".into())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<UnknownVariant> for AppError {
    fn from(error: UnknownVariant) -> AppError {
        AppError::BadRequest(error.to_string())
    }
}
