//! Handlers for the `/users` resource.

use axum::extract::{Path, State};
use axum::Json;
use npuwatch_core::error::CoreError;
use npuwatch_core::types::DbId;
use npuwatch_db::models::user::{CreateUser, UserResponse};
use npuwatch_db::repositories::UserRepo;
use serde::Deserialize;

use crate::auth::password::{check_password_length, hash_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

pub const MAX_USERNAME_LENGTH: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
    )))
}

/// POST /api/v1/users
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let username = input.username.trim();
    let len = username.chars().count();
    if len == 0 || len > MAX_USERNAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "username must be 1 to {MAX_USERNAME_LENGTH} characters"
        ))
        .into());
    }
    check_password_length(&input.password).map_err(CoreError::Validation)?;

    if UserRepo::find_by_username(&state.pool, username)
        .await?
        .is_some()
    {
        return Err(CoreError::Validation("username already exists".into()).into());
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {e}")))?;
    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: username.to_string(),
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, created_by = auth.user_id, "User created");
    Ok(Json(ApiResponse::ok(user.into())))
}

/// PUT /api/v1/users/{id}/password
pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdatePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let id = parse_user_id(&id)?;
    check_password_length(&input.password).map_err(CoreError::Validation)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {e}")))?;
    if !UserRepo::update_password(&state.pool, id, &password_hash).await? {
        return Err(CoreError::not_found("User", id).into());
    }

    tracing::info!(user_id = id, updated_by = auth.user_id, "Password updated");
    Ok(Json(ApiResponse::ok(())))
}

/// DELETE /api/v1/users/{id}
///
/// The caller's own account cannot be deleted; that check runs before any
/// database access.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let id = parse_user_id(&id)?;
    if id == auth.user_id {
        return Err(CoreError::Forbidden("cannot delete current user".into()).into());
    }

    if !UserRepo::delete(&state.pool, id).await? {
        return Err(CoreError::not_found("User", id).into());
    }

    tracing::info!(user_id = id, deleted_by = auth.user_id, "User deleted");
    Ok(Json(ApiResponse::ok(())))
}

fn parse_user_id(raw: &str) -> AppResult<DbId> {
    raw.trim()
        .parse::<DbId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(format!("invalid user id: {raw}")))
}
