use std::sync::Arc;

use crate::auth::jwt::JwtConfig;
use crate::llm::settings::LlmSettings;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: the pool is reference counted and the rest sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: npuwatch_db::DbPool,
    pub jwt: Arc<JwtConfig>,
    /// Runtime LLM configuration, also the owner of the config document.
    pub llm: Arc<LlmSettings>,
}
