//! Handlers for the `/jobs` resource: flat and grouped listings, stats and
//! per-job lookups.

use axum::extract::{Path, Query, State};
use axum::Json;
use npuwatch_core::error::CoreError;
use npuwatch_core::grouping::JobGroup;
use npuwatch_core::stats::JobStats;
use npuwatch_db::models::code::Code;
use npuwatch_db::models::job::{Job, JobDetail};
use npuwatch_db::models::parameter::Parameter;
use npuwatch_db::repositories::{CodeRepo, JobGroupRepo, JobRepo, ParameterRepo};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::{DetailParams, JobListParams};
use crate::response::{ApiResponse, Paginated};
use crate::state::AppState;

/// GET /api/v1/jobs
///
/// Flat, paginated job rows. Card-count filters do not apply here.
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<ApiResponse<Paginated<Job>>>> {
    let params = JobListParams::from_pairs(&pairs)?;
    let total = JobRepo::count(&state.pool, &params.filter).await?;
    let items = JobRepo::find(
        &state.pool,
        &params.filter,
        &params.sort,
        params.page.limit(),
        params.page.offset(),
    )
    .await?;

    Ok(Json(ApiResponse::ok(Paginated {
        items,
        pagination: params.page.info(total),
    })))
}

/// GET /api/v1/jobs/grouped
///
/// Job trees with their card counts, filtered by card count and paged in
/// memory after grouping.
pub async fn grouped(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<ApiResponse<Paginated<JobGroup<Job>>>>> {
    let params = JobListParams::from_pairs(&pairs)?;
    let (items, total) = JobGroupRepo::page(
        &state.pool,
        &params.filter,
        &params.sort,
        &params.card_counts,
        params.page,
    )
    .await?;

    Ok(Json(ApiResponse::ok(Paginated {
        items,
        pagination: params.page.info(total),
    })))
}

/// GET /api/v1/jobs/distinct-card-counts
pub async fn distinct_card_counts(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<i64>>>> {
    let counts = JobGroupRepo::distinct_card_counts(&state.pool).await?;
    Ok(Json(ApiResponse::ok(counts)))
}

/// GET /api/v1/jobs/stats
pub async fn stats(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<ApiResponse<JobStats>>> {
    let stats = JobGroupRepo::stats(&state.pool).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/v1/jobs/{job_id}
pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<Json<ApiResponse<Job>>> {
    let job = JobRepo::find_by_id(&state.pool, &job_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Job", &job_id))?;
    Ok(Json(ApiResponse::ok(job)))
}

/// GET /api/v1/jobs/{job_id}/parameters
///
/// Newest snapshot first; empty when the collector captured none.
pub async fn parameters(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<Parameter>>>> {
    let rows = ParameterRepo::by_job(&state.pool, &job_id).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /api/v1/jobs/{job_id}/code
pub async fn code(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<Code>>>> {
    let rows = CodeRepo::by_job(&state.pool, &job_id).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /api/v1/jobs/{job_id}/detail?aggregate=false
///
/// By default the cards and related jobs cover the whole process tree;
/// `aggregate=false` limits them to the job's own process.
pub async fn detail(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(job_id): Path<String>,
    Query(params): Query<DetailParams>,
) -> AppResult<Json<ApiResponse<JobDetail>>> {
    let detail = JobGroupRepo::detail(&state.pool, &job_id, params.aggregate())
        .await?
        .ok_or_else(|| CoreError::not_found("Job", &job_id))?;
    Ok(Json(ApiResponse::ok(detail)))
}
