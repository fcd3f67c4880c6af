use axum::routing::get;
use axum::Router;

use crate::handlers::nodes;
use crate::state::AppState;

/// Routes mounted at `/nodes`. `/stats` is static and wins over `/{node_id}`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(nodes::list))
        .route("/stats", get(nodes::stats))
        .route("/{node_id}", get(nodes::get))
}
