//! Handlers for the `/nodes` resource.

use axum::extract::{Path, Query, State};
use axum::Json;
use npuwatch_core::error::CoreError;
use npuwatch_core::stats::NodeStats;
use npuwatch_db::models::node::Node;
use npuwatch_db::repositories::NodeRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::NodeListParams;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/nodes?status=
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<NodeListParams>,
) -> AppResult<Json<ApiResponse<Vec<Node>>>> {
    let nodes = match params.status.as_deref().map(str::trim) {
        Some(status) if !status.is_empty() => NodeRepo::list_by_status(&state.pool, status).await?,
        _ => NodeRepo::list(&state.pool).await?,
    };
    Ok(Json(ApiResponse::ok(nodes)))
}

/// GET /api/v1/nodes/stats
pub async fn stats(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<ApiResponse<NodeStats>>> {
    let nodes = NodeRepo::list(&state.pool).await?;
    let stats = NodeStats::tally(nodes.iter().map(|n| n.status.as_deref()));
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/v1/nodes/{node_id}
pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(node_id): Path<String>,
) -> AppResult<Json<ApiResponse<Node>>> {
    let node = NodeRepo::find_by_id(&state.pool, &node_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Node", &node_id))?;
    Ok(Json(ApiResponse::ok(node)))
}
