//! Handlers for `/config/llm`.

use axum::extract::State;
use axum::Json;

use crate::config::LlmConfig;
use crate::error::AppResult;
use crate::llm::settings::LlmConfigPatch;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/config/llm
///
/// The API key is always masked.
pub async fn get_llm(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<ApiResponse<LlmConfig>>> {
    Ok(Json(ApiResponse::ok(state.llm.get().await)))
}

/// PUT /api/v1/config/llm
///
/// Partial update. A masked or empty `api_key` keeps the stored key.
pub async fn update_llm(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(patch): Json<LlmConfigPatch>,
) -> AppResult<Json<ApiResponse<LlmConfig>>> {
    tracing::info!(user_id = auth.user_id, username = %auth.username, "Updating LLM configuration");
    let updated = state.llm.update(patch).await?;
    Ok(Json(ApiResponse::ok(updated)))
}
