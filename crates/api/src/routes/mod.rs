pub mod auth;
pub mod config;
pub mod health;
pub mod jobs;
pub mod nodes;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /health                           liveness (public)
/// /auth/login                       login (public)
/// /auth/me                          current user
/// /users                            list, create
/// /users/{id}/password              change password
/// /users/{id}                       delete
/// /nodes                            list (?status=)
/// /nodes/stats                      status tallies
/// /nodes/{node_id}                  get
/// /jobs                             flat list
/// /jobs/grouped                     grouped list (+ cardCounts filter)
/// /jobs/distinct-card-counts        card counts present
/// /jobs/stats                       group tallies
/// /jobs/{job_id}                    get
/// /jobs/{job_id}/parameters         parameter snapshots
/// /jobs/{job_id}/code               code snapshots
/// /jobs/{job_id}/detail             cards + related jobs
/// /jobs/{job_id}/analyze            run LLM analysis (POST)
/// /jobs/{job_id}/analysis           cached analysis
/// /config/llm                       get, update
/// ```
///
/// Everything except `/health` and `/auth/login` requires a Bearer token; handlers enforce
/// it through the `AuthUser` extractor.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/nodes", nodes::router())
        .nest("/jobs", jobs::router())
        .nest("/config", config::router())
}
