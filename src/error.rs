use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::validation::FieldError;

/// ApiError
///
/// The application's error type. Handlers and repositories propagate this with
/// `?`; the `IntoResponse` implementation is the single place where errors are
/// translated into HTTP outcomes, so no internal detail ever leaks to a client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A database error. Surfaced as a correlated, generic 500.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A filesystem error from the image store. Surfaced as a correlated 500.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A token signing/validation error. Surfaced as a correlated 500; invalid
    /// *inbound* tokens are rejected with 401 by the extractor, not here.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// A password hashing failure. Argon2 errors carry no sensitive material
    /// but are still only logged, never returned.
    #[error("password hashing error: {0}")]
    PasswordHash(String),

    /// Malformed or out-of-bound input, reported with field-level messages.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// The requested id has no matching record.
    #[error("resource not found")]
    NotFound,

    /// Bad credentials. Deliberately indistinguishable between "unknown user"
    /// and "wrong password" to avoid user enumeration.
    #[error("incorrect credentials")]
    BadCredentials,

    /// Registration failed. Generic by design: the caller learns nothing about
    /// which step (identity creation, role attachment) went wrong.
    #[error("registration failed")]
    Registration,

    /// No valid bearer token was presented.
    #[error("unauthorized")]
    Unauthorized,

    /// A valid token lacked the required role.
    #[error("forbidden")]
    Forbidden,
}

/// ErrorResponse
///
/// Body returned for infrastructure failures: a correlation id the caller can
/// quote back, and a non-sensitive message. Full detail stays in server logs.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub id: Uuid,
    pub error_message: String,
}

/// ValidationResponse
///
/// Body returned for validation failures: one entry per offending field.
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub errors: Vec<FieldError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(ValidationResponse { errors })).into_response()
            }
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::BadCredentials => {
                (StatusCode::BAD_REQUEST, "Username or password incorrect").into_response()
            }
            ApiError::Registration => {
                (StatusCode::BAD_REQUEST, "Something went wrong").into_response()
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            ApiError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            // Everything else is an infrastructure failure: log the full error
            // under a fresh correlation id and return only that id.
            err => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = %error_id, error = %err, "unhandled failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        id: error_id,
                        error_message: "Something went wrong, we are looking into resolving this."
                            .to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
