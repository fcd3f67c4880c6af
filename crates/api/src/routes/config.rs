use axum::routing::get;
use axum::Router;

use crate::handlers::config;
use crate::state::AppState;

/// Routes mounted at `/config`.
pub fn router() -> Router<AppState> {
    Router::new().route("/llm", get(config::get_llm).put(config::update_llm))
}
