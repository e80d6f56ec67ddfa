use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::Display;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use serde::Serialize;
use validator::ValidationErrors;

use crate::storage::uploads::StorageError;

/// One rejected field, echoed back under `details`.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError { field: field.into(), message: message.into() }
    }

    fn join(errors: &[FieldError]) -> String {
        errors
            .iter()
            .map(|e| format!("{} {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Failures of the content API. Every variant renders as
/// `{ "success": false, "message": ... }`.
#[derive(Debug, Display)]
pub enum AppError {
    #[display("Validation failed: {}", FieldError::join(_0))]
    Validation(Vec<FieldError>),

    #[display("{_0}")]
    BadRequest(String),

    #[display("Not found: {_0}")]
    NotFound(String),

    #[display("Payload too large: {_0}")]
    PayloadTooLarge(String),

    #[display("Unsupported media type: {_0}")]
    UnsupportedMediaType(String),

    #[display("Authentication required")]
    Unauthorized,

    #[display("Internal server error")]
    Internal(String),
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(errors) => serde_json::json!({
                "success": false,
                "message": self.to_string(),
                "details": errors,
            }),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                serde_json::json!({ "success": false, "message": self.to_string() })
            }
            _ => serde_json::json!({ "success": false, "message": self.to_string() }),
        };

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut rejected: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, problems)| {
                problems.iter().map(move |problem| {
                    let message = problem
                        .message
                        .as_deref()
                        .unwrap_or("is invalid")
                        .to_string();
                    FieldError::new(field.to_string(), message)
                })
            })
            .collect();
        rejected.sort_by(|a, b| a.field.cmp(&b.field));

        AppError::Validation(rejected)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Document not found".into()),
            other => AppError::Internal(format!("Database error: {}", other)),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("Malformed document: {}", err))
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        match err {
            actix_multipart::MultipartError::ContentTypeIncompatible => {
                AppError::UnsupportedMediaType("Expected multipart/form-data".into())
            }
            other => AppError::BadRequest(format!("Multipart error: {}", other)),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            StorageError::RejectedType(_) => AppError::UnsupportedMediaType(err.to_string()),
            StorageError::InvalidPath(_) => AppError::BadRequest(err.to_string()),
            StorageError::NotFound(path) => AppError::NotFound(path),
            StorageError::Io(e) => AppError::Internal(format!("Upload storage error: {}", e)),
        }
    }
}

/// Bearer token failures raised by the auth middleware and extractors.
#[derive(Debug, Display)]
pub enum AuthError {
    #[display("Invalid token")]
    InvalidToken,

    #[display("Token creation failed")]
    TokenCreation,

    #[display("Token has expired")]
    TokenExpired,

    #[display("Missing bearer token")]
    MissingCredentials,

    #[display("Application state unavailable")]
    MissingState,

    #[display("Forbidden: {_0}")]
    Forbidden(String),
}

impl std::error::Error for AuthError {}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "success": false, "message": self.to_string() }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidToken | AuthError::TokenExpired | AuthError::MissingCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::TokenCreation | AuthError::MissingState => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}
