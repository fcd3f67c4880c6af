//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{analysis, jobs};
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET  /                            -> list
/// GET  /grouped                     -> grouped
/// GET  /grouped/card-counts         -> distinct_card_counts
/// GET  /distinct-card-counts        -> distinct_card_counts
/// GET  /stats                       -> stats
/// GET  /{job_id}                    -> get
/// GET  /{job_id}/parameters         -> parameters
/// GET  /{job_id}/code               -> code
/// GET  /{job_id}/detail             -> detail
/// POST /{job_id}/analyze            -> analysis::analyze
/// GET  /{job_id}/analysis           -> analysis::get_analysis
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list))
        .route("/grouped", get(jobs::grouped))
        .route("/grouped/card-counts", get(jobs::distinct_card_counts))
        .route("/distinct-card-counts", get(jobs::distinct_card_counts))
        .route("/stats", get(jobs::stats))
        .route("/{job_id}", get(jobs::get))
        .route("/{job_id}/parameters", get(jobs::parameters))
        .route("/{job_id}/code", get(jobs::code))
        .route("/{job_id}/detail", get(jobs::detail))
        .route("/{job_id}/analyze", post(analysis::analyze))
        .route("/{job_id}/analysis", get(analysis::get_analysis))
}
