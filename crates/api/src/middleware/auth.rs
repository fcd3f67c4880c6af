//! Bearer-token extractor guarding every protected handler.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use npuwatch_core::error::CoreError;
use npuwatch_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller, taken from `Authorization: Bearer <token>`.
///
/// Add it as a handler parameter to require authentication:
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| unauthorized("authorization header is missing"))?;

        let token = bearer_token(header).ok_or_else(|| {
            unauthorized("authorization header format must be Bearer {token}")
        })?;

        let claims = validate_token(token, &state.jwt)
            .map_err(|_| unauthorized("invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.username,
        })
    }
}

/// The token of a `Bearer <token>` header: exactly two whitespace-separated
/// parts, the first being `Bearer`.
fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token),
        _ => None,
    }
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.to_string()))
}
