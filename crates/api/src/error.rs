use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use npuwatch_core::error::CoreError;
use npuwatch_db::error::QueryError;
use serde_json::json;

use crate::llm::client::LlmError;
use crate::llm::settings::SettingsError;

/// Application-level error type for HTTP handlers.
///
/// Every variant renders as the `{code, message}` envelope with `code` equal
/// to the HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database error annotated with the gateway operation that failed.
    #[error("Database error: {0}")]
    Query(#[from] QueryError),

    #[error("AI analysis failed: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => {
                    (StatusCode::NOT_FOUND, format!("{entity} not found: {id}"))
                }
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
                // Self-deletion and similar refusals are reported as 400.
                CoreError::Forbidden(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
                }
            },

            AppError::Database(err) => classify_sqlx_error(err, &self),
            AppError::Query(err) => classify_sqlx_error(&err.source, &self),

            AppError::Llm(err) => match err {
                LlmError::UnknownModel(_) | LlmError::ModelDisabled(_) => {
                    (StatusCode::BAD_REQUEST, self.to_string())
                }
                LlmError::Disabled => {
                    tracing::warn!("Analysis requested while LLM is disabled");
                    (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
                }
                _ => {
                    tracing::error!(error = %err, "LLM analysis failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
                }
            },

            AppError::Settings(err) => match err {
                SettingsError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                SettingsError::Client(_) | SettingsError::Persist(_) => {
                    tracing::error!(error = %err, "LLM settings update failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = json!({
            "code": status.as_u16(),
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Unique constraint on `users.username`.
pub const USERNAME_CONSTRAINT: &str = "uq_users_username";

/// Map a database error to an HTTP status and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map
///   to 400.
/// - Everything else maps to 500 carrying the low-level text.
fn classify_sqlx_error(err: &sqlx::Error, wrapper: &AppError) -> (StatusCode, String) {
    match err {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            match db_err.constraint() {
                Some(USERNAME_CONSTRAINT) => (
                    StatusCode::BAD_REQUEST,
                    "username already exists".to_string(),
                ),
                Some(constraint) if constraint.starts_with("uq_") => (
                    StatusCode::BAD_REQUEST,
                    format!("Duplicate value violates unique constraint: {constraint}"),
                ),
                _ => {
                    tracing::error!(error = %db_err, "Database error");
                    (StatusCode::INTERNAL_SERVER_ERROR, wrapper.to_string())
                }
            }
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (StatusCode::INTERNAL_SERVER_ERROR, wrapper.to_string())
        }
    }
}
